//! Show graph statistics.

use anyhow::Result;
use chemkg::prelude::*;
use colored::Colorize;

use crate::commands::{print_json, score, Workspace};

pub fn run(top: usize, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let graph = &ws.graph;

    let kind_count = |kind: NodeKind| graph.nodes_of_kind(kind).count();
    let edges = graph.edges();
    let relation_count = |rel: Relation| edges.iter().filter(|e| e.relation == rel).count();
    let mutual = graph.mutual_index();
    let mean = mean_degree(graph);
    let method = recommend_method(graph);
    let top_nodes: Vec<(&str, f64)> = ws
        .scores
        .by_reverse_rank()
        .into_iter()
        .take(top)
        .map(|id| (id, ws.scores.reverse_rank(id)))
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "nodes": graph.node_count(),
            "edges": graph.edge_count(),
            "topics": kind_count(NodeKind::Topic),
            "concepts": kind_count(NodeKind::Concept),
            "prerequisites": kind_count(NodeKind::Prerequisite),
            "contains_edges": relation_count(Relation::Contains),
            "prerequisite_edges": relation_count(Relation::PrerequisiteFor),
            "leads_to_edges": relation_count(Relation::LeadsTo),
            "indexed_chunks": mutual.indexed_chunks(),
            "mean_chunks_per_node": mutual.mean_chunks_per_node(),
            "mean_degree": mean,
            "recommended_method": method,
            "metadata": graph.metadata(),
            "top_by_reverse_rank": top_nodes
                .iter()
                .map(|(id, rank)| serde_json::json!({ "id": id, "reverse_rank": rank }))
                .collect::<Vec<_>>(),
        }));
    }

    println!("{}", "ChemKG Graph Statistics".white().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();

    println!("{}", "Graph Structure".blue().bold());
    println!("  Total nodes:       {}", graph.node_count().to_string().cyan());
    println!("  Total edges:       {}", graph.edge_count().to_string().cyan());
    println!("  Mean degree:       {:.2}", mean);
    println!("  Classify with:     {}", method.as_str().cyan());
    println!();

    println!("{}", "Node Kinds".blue().bold());
    println!("  Topics:            {}", kind_count(NodeKind::Topic).to_string().cyan());
    println!("  Concepts:          {}", kind_count(NodeKind::Concept).to_string().cyan());
    println!("  Prerequisites:     {}", kind_count(NodeKind::Prerequisite).to_string().cyan());
    println!();

    println!("{}", "Relations".blue().bold());
    println!("  contains:          {}", relation_count(Relation::Contains));
    println!("  prerequisite_for:  {}", relation_count(Relation::PrerequisiteFor));
    println!("  leads_to:          {}", relation_count(Relation::LeadsTo));
    println!();

    println!("{}", "Source Passages".blue().bold());
    println!("  Indexed chunks:    {}", mutual.indexed_chunks().to_string().cyan());
    println!("  Chunks per node:   {:.2} (max {})", mutual.mean_chunks_per_node(), mutual.max_chunks_per_node());
    println!();

    if !top_nodes.is_empty() {
        println!("{}", "Most Fundamental".blue().bold());
        for (i, (id, rank)) in top_nodes.iter().enumerate() {
            println!("  {} {} {}", format!("{}.", i + 1).blue(), id.white(), score(*rank));
        }
        println!();
    }

    let meta = graph.metadata();
    if let Some(generated) = &meta.generated {
        println!("  Generated {}", generated.dimmed());
    }
    println!("{}", "═".repeat(40).dimmed());

    Ok(())
}
