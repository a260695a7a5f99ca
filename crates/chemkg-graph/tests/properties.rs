//! Structural properties that must hold for any input graph.
//!
//! Record batches are generated by proptest and shrink on failure.

use chemkg_core::record::ExtractionRecord;
use chemkg_core::types::{NodeKind, Relation};
use chemkg_graph::prelude::*;
use proptest::prelude::{prop, prop_assert, prop_assert_eq, prop_assert_ne, proptest, ProptestConfig};
use proptest::strategy::Strategy as Gen;
use std::collections::{HashMap, HashSet};

const TOPICS: &[&str] = &[
    "Atomic Structure",
    "Periodic Trends",
    "Ionic Bonding",
    "Covalent Bonding",
    "Molecular Orbital Theory",
    "Crystal Field Theory",
    "Coordination Chemistry",
    "Redox Chemistry",
    "Acid-Base Chemistry",
    "Solid State Chemistry",
    "Thermodynamics",
    "Kinetics",
];

/// Topic index, prerequisite topic indices, concept index.
type RecordSpec = (usize, Vec<usize>, usize);

fn record_specs(max: usize) -> impl Gen<Value = Vec<RecordSpec>> {
    prop::collection::vec(
        (
            0..TOPICS.len(),
            prop::collection::vec(0..TOPICS.len(), 0..3),
            0..20usize,
        ),
        1..max,
    )
}

fn records(specs: &[RecordSpec], acyclic: bool) -> Vec<ExtractionRecord> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (t, prereqs, concept))| {
            // Acyclic inputs only point from lower to higher index.
            let prereqs: Vec<&str> = prereqs
                .iter()
                .filter(|&&p| !acyclic || p < *t)
                .map(|&p| TOPICS[p])
                .collect();
            ExtractionRecord::new(format!("c{i}"))
                .with_topic(TOPICS[*t])
                .with_concepts([format!("concept {concept}")])
                .with_prerequisites(prereqs)
        })
        .collect()
}

fn build(specs: &[RecordSpec], acyclic: bool) -> KnowledgeGraph {
    let config = BuildConfig::default().with_noise_threshold(1);
    GraphBuilder::new(config)
        .build(&records(specs, acyclic))
        .unwrap()
        .0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mutual_index_is_symmetric(specs in record_specs(120)) {
        let g = build(&specs, false);
        let index = g.mutual_index();
        prop_assert!(index.is_symmetric());
        for node in g.nodes() {
            for chunk in &node.source_chunk_ids {
                prop_assert!(index.nodes_for(chunk).contains(&node.id.as_str()));
            }
        }
    }

    #[test]
    fn ranks_are_normalized(specs in record_specs(120)) {
        let g = build(&specs, false);
        let scores = CentralityEngine::default().scores(&g);
        let forward: f64 = scores.iter().map(|(_, s)| s.forward_rank).sum();
        let reverse: f64 = scores.iter().map(|(_, s)| s.reverse_rank).sum();
        prop_assert!((forward - 1.0).abs() < 1e-4, "forward {}", forward);
        prop_assert!((reverse - 1.0).abs() < 1e-4, "reverse {}", reverse);
    }

    #[test]
    fn topological_order_respects_edges_when_acyclic(specs in record_specs(200)) {
        let g = build(&specs, true);
        let scores = CentralityEngine::default().scores(&g);
        let config = SequencerConfig::default().with_min_count(3);
        let curriculum =
            CurriculumSequencer::new(&g, &scores, config).sequence(Strategy::Topological);
        prop_assert!(curriculum.cycle.is_empty());

        let pos: HashMap<&str, usize> = curriculum
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        for edge in g.edges().iter().filter(|e| e.relation.is_enabling()) {
            if let (Some(a), Some(b)) = (pos.get(edge.source.as_str()), pos.get(edge.target.as_str())) {
                prop_assert!(a < b, "{} must precede {}", edge.source, edge.target);
            }
        }
    }

    #[test]
    fn degree_classes_are_consistent(specs in record_specs(120)) {
        let g = build(&specs, false);
        for thresholds in [DegreeThresholds::default(), DegreeThresholds::pure()] {
            let engine = CentralityEngine::new(RankConfig::default(), thresholds);
            let report = engine.analyze(&g);
            for class in &report.classes {
                match class.degree_role {
                    DegreeRole::Foundation => prop_assert_eq!(class.in_degree, 0),
                    DegreeRole::Capstone => prop_assert_eq!(class.out_degree, 0),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn trace_visits_once_within_depth(specs in record_specs(120), depth in 0..4usize) {
        let g = build(&specs, false);
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        for target in TOPICS.iter().filter(|t| g.contains(t)) {
            let trace = tracer.trace_depth(target, depth).unwrap();
            let unique: HashSet<&str> = trace.nodes.iter().map(|n| n.id.as_str()).collect();
            prop_assert_eq!(unique.len(), trace.nodes.len());
            prop_assert!(trace.nodes.iter().all(|n| n.depth <= depth));
            prop_assert_eq!(trace.nodes[0].id.as_str(), *target);
            let funnel_total: usize = trace.funnel.iter().map(|l| l.count).sum();
            prop_assert_eq!(funnel_total, trace.nodes.len());
        }
    }

    #[test]
    fn learning_path_excludes_known_and_ends_at_target(specs in record_specs(120)) {
        let g = build(&specs, false);
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let known = ["Atomic Structure", "Periodic Trends"];
        for target in TOPICS.iter().filter(|t| g.contains(t) && !known.contains(t)) {
            let path = tracer.learning_path(target, &known).unwrap();
            let (last, rest) = path.steps.split_last().unwrap();
            prop_assert_eq!(last.concept.as_str(), *target);
            prop_assert!(rest.iter().all(|s| !known.contains(&s.concept.as_str())));
            prop_assert!(rest.iter().all(|s| s.status == StepStatus::ToLearn));
        }
    }

    #[test]
    fn rebuild_is_idempotent(specs in record_specs(150)) {
        let input = records(&specs, false);
        let builder = GraphBuilder::default();
        let (a, _) = builder.build(&input).unwrap();
        let (b, _) = builder.build(&input).unwrap();
        prop_assert_eq!(a.to_parts().0, b.to_parts().0);
        prop_assert_eq!(a.edges(), b.edges());
        prop_assert_ne!(&a.metadata().build_id, &b.metadata().build_id);
    }

    #[test]
    fn prerequisite_edges_point_into_topics(specs in record_specs(120)) {
        let g = build(&specs, false);
        for edge in g.edges().iter().filter(|e| e.relation == Relation::PrerequisiteFor) {
            prop_assert_eq!(g.node(&edge.target).map(|n| n.kind), Some(NodeKind::Topic));
        }
    }
}
