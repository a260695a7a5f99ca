//! Cross-source coverage and synthesis.

use chemkg_core::record::ExtractionRecord;
use chemkg_graph::prelude::*;
use chemkg_rag::prelude::*;
use std::sync::Arc;

fn setup() -> (KnowledgeGraph, Arc<InMemoryPassageStore>) {
    let records: Vec<ExtractionRecord> = ["c1", "c2", "c3", "c4"]
        .iter()
        .map(|c| ExtractionRecord::new(*c).with_topic("Crystal Field Theory"))
        .chain([ExtractionRecord::new("c5").with_topic("Acid-Base Chemistry")])
        .collect();
    let (g, _) = GraphBuilder::default().build(&records).unwrap();
    let store = InMemoryPassageStore::from_passages([
        Passage::new("c1", "Housecroft", "Octahedral splitting."),
        Passage::new("c2", "Housecroft", "Tetrahedral splitting."),
        Passage::new("c3", "Housecroft", "Spectrochemical series."),
        Passage::new("c4", "Miessler", format!("Ligand field {}", "y".repeat(1000))),
    ]);
    (g, Arc::new(store))
}

#[tokio::test]
async fn coverage_groups_passages_by_source() {
    let (g, store) = setup();
    let scores = CentralityEngine::default().scores(&g);
    let pipeline = QuestionPipeline::new(&g, &scores, store, Arc::new(MockBackend::new()), PipelineConfig::default());

    let coverage = pipeline.coverage("crystal field theory").await.unwrap();
    assert_eq!(coverage.topic, "Crystal Field Theory");
    assert_eq!(coverage.total_chunks, 4);
    assert_eq!(coverage.num_sources, 2);
    assert_eq!(coverage.sources["Housecroft"].count, 3);
    assert_eq!(coverage.sources["Miessler"].chunk_ids, vec!["c4"]);

    // Indexed chunk without a stored passage.
    let sparse = pipeline.coverage("Acid-Base Chemistry").await.unwrap();
    assert_eq!(sparse.total_chunks, 0);
}

#[tokio::test]
async fn coverage_of_unknown_topic_suggests_names() {
    let (g, store) = setup();
    let scores = CentralityEngine::default().scores(&g);
    let pipeline = QuestionPipeline::new(&g, &scores, store, Arc::new(MockBackend::new()), PipelineConfig::default());

    let err = pipeline.coverage("Crystal Field").await.unwrap_err();
    assert!(err.is_unknown_concept());
    assert!(err.suggestions().iter().any(|s| s == "Crystal Field Theory"));
}

#[tokio::test]
async fn synthesize_caps_excerpts_per_source() {
    let (g, store) = setup();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(MockBackend::new().with_response("Synthesize these textbook explanations", "SUMMARY"));
    let pipeline = QuestionPipeline::new(&g, &scores, store, llm.clone(), PipelineConfig::default());

    assert_eq!(pipeline.synthesize("Crystal Field Theory", 2).await, "SUMMARY");

    let prompt = llm.prompts().pop().unwrap();
    assert_eq!(prompt.matches("[Housecroft]:").count(), 2);
    assert_eq!(prompt.matches("[Miessler]:").count(), 1);
    assert!(!prompt.contains("Spectrochemical"));
    assert!(!prompt.contains(&"y".repeat(800)));
}

#[tokio::test]
async fn synthesize_degrades_to_messages() {
    let (g, store) = setup();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(MockBackend::new().fail_on("Synthesize these textbook explanations"));
    let pipeline = QuestionPipeline::new(&g, &scores, store, llm, PipelineConfig::default());

    assert!(pipeline.synthesize("Crystal Field Theory", 2).await.starts_with("Error:"));
    assert_eq!(
        pipeline.synthesize("Acid-Base Chemistry", 2).await,
        "No content found for topic: Acid-Base Chemistry"
    );
    assert_eq!(
        pipeline.synthesize("Organometallics", 2).await,
        "No content found for topic: Organometallics"
    );
}
