//! End-to-end scenarios over small hand-built graphs.

use chemkg_core::record::ExtractionRecord;
use chemkg_core::types::{Edge, Node, NodeKind, Relation};
use chemkg_graph::prelude::*;

fn graph(nodes: &[(&str, u64)], edges: &[(&str, &str)]) -> KnowledgeGraph {
    let nodes = nodes
        .iter()
        .map(|(id, m)| Node::new(*id, NodeKind::Topic).with_mentions(*m))
        .collect();
    let edges = edges
        .iter()
        .map(|(s, t)| Edge::new(*s, *t, Relation::PrerequisiteFor, 2))
        .collect();
    KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap()
}

#[test]
fn chain_orders_topologically_and_classifies_ends() {
    // A has two extra low-mention successors so its out-degree is 3.
    let g = graph(
        &[("A", 20), ("B", 20), ("C", 20), ("D", 1), ("E", 1)],
        &[("A", "B"), ("B", "C"), ("A", "D"), ("A", "E")],
    );

    let engine = CentralityEngine {
        degree: DegreeThresholds::pure(),
        ..Default::default()
    };
    let scores = engine.scores(&g);
    assert_eq!(scores.get("A").map(|s| (s.in_degree, s.out_degree)), Some((0, 3)));

    let sequencer = CurriculumSequencer::new(&g, &scores, SequencerConfig::default());
    assert_eq!(sequencer.sequence(Strategy::Topological).order, vec!["A", "B", "C"]);

    let roles = engine.degree_roles(&scores);
    assert_eq!(roles["A"], DegreeRole::Foundation);
    assert_eq!(roles["C"], DegreeRole::Capstone);
}

#[test]
fn two_node_forward_rank_favors_target() {
    let g = graph(&[("X", 1), ("Y", 1)], &[("X", "Y")]);
    let scores = CentralityEngine::default().scores(&g);
    assert!(scores.forward_rank("Y") > scores.forward_rank("X"));
}

#[test]
fn single_record_populates_mutual_index() {
    let records = vec![ExtractionRecord::new("c1")
        .with_topic("T1")
        .with_concepts(["K1"])];
    let (g, _) = GraphBuilder::default().build(&records).unwrap();
    let index = g.mutual_index();
    assert!(index.chunks_for("T1").contains(&"c1"));
    let nodes = index.nodes_for("c1");
    assert!(nodes.contains(&"T1"));
    assert!(nodes.contains(&"K1"));
    assert!(index.chunks_for("K1").contains(&"c1"));
}

#[test]
fn disjoint_triangles_form_two_communities() {
    let g = graph(
        &[("A", 1), ("B", 1), ("C", 1), ("D", 1), ("E", 1), ("F", 1)],
        &[("A", "B"), ("B", "C"), ("C", "A"), ("D", "E"), ("E", "F"), ("F", "D")],
    );
    let result = detect_communities(&g, &CommunityConfig::default());
    assert!(result.converged);
    assert_eq!(result.num_communities, 2);
    assert_eq!(result.communities[0].size, 3);
    assert_eq!(result.communities[1].size, 3);
    assert_ne!(result.assignments["A"], result.assignments["D"]);
}

#[test]
fn learning_path_skips_known_prerequisite() {
    let g = graph(
        &[("Atomic Structure", 5), ("Orbital Overlap", 5), ("CFT", 5)],
        &[("Atomic Structure", "Orbital Overlap"), ("Orbital Overlap", "CFT")],
    );
    let scores = CentralityEngine::default().scores(&g);
    let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
    let path = tracer.learning_path("CFT", &["Atomic Structure"]).unwrap();

    assert!(path.steps.iter().all(|s| s.concept != "Atomic Structure"));
    let last = path.steps.last().unwrap();
    assert_eq!(last.concept, "CFT");
    assert_eq!(last.status, StepStatus::Target);
    assert_eq!(path.steps[0].concept, "Orbital Overlap");
}

#[test]
fn persisted_graph_round_trips_after_enhance() {
    let records = vec![
        ExtractionRecord::new("c1").with_topic("Crystal Field Theory").with_prerequisites(["Atomic Structure"]),
        ExtractionRecord::new("c2").with_topic("Crystal Field Theory").with_prerequisites(["Atomic Structure"]),
    ];
    let (g, _) = GraphBuilder::default().build(&records).unwrap();
    let scores = CentralityEngine::default().scores(&g);
    let enhanced = g.enhance(&scores);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("graph.json");
    enhanced.save(&path).unwrap();
    let loaded = KnowledgeGraph::load(&path).unwrap();

    let (before, after) = (enhanced.to_parts().0, loaded.to_parts().0);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!((&a.id, a.kind, a.mention_count, a.scale), (&b.id, b.kind, b.mention_count, b.scale));
        assert_eq!(a.source_chunk_ids, b.source_chunk_ids);
        let (ra, rb) = (a.scores.unwrap().reverse_rank, b.scores.unwrap().reverse_rank);
        assert!((ra - rb).abs() < 1e-12);
    }
    assert_eq!(loaded.edges(), enhanced.edges());
    assert!(loaded.is_enhanced());
    assert_eq!(loaded.mutual_index(), enhanced.mutual_index());

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let node = &raw["nodes"][0];
    assert!(node.get("pagerank").is_some());
    assert!(node.get("chunk_ids").is_some());
}

#[test]
fn unenhanced_file_has_no_scores_or_chunks() {
    let g = graph(&[("A", 1)], &[]);
    let file = GraphFile::from_graph(&g);
    let json = serde_json::to_value(&file).unwrap();
    assert!(json["nodes"][0].get("pagerank").is_none());
    assert!(json["nodes"][0].get("chunk_ids").is_none());
    assert_eq!(json["nodes"][0]["group"], "DESCRIPTIVE");
}
