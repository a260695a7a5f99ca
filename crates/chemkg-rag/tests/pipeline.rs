//! Question pipeline runs against the mock backend and an in-memory store.

use async_trait::async_trait;
use chemkg_core::record::ExtractionRecord;
use chemkg_graph::prelude::*;
use chemkg_rag::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DECOMPOSITION: &str = r#"{
    "sub_questions": [
        {"id": 1, "question": "What is the d-electron count of Cu2+?", "depends_on": []},
        {"id": 2, "question": "How does the ligand field split the d orbitals?", "depends_on": [1]},
        {"id": 3, "question": "Which transition absorbs red light?", "depends_on": [2]}
    ],
    "final_synthesis": "explain the colour"
}"#;

fn graph() -> KnowledgeGraph {
    let records = vec![
        ExtractionRecord::new("c1")
            .with_topic("Crystal Field Theory")
            .with_concepts(["d-orbital splitting", "ligand field"])
            .with_prerequisites(["Atomic Structure"]),
        ExtractionRecord::new("c2")
            .with_topic("Crystal Field Theory")
            .with_concepts(["d-orbital splitting"]),
        ExtractionRecord::new("c3").with_topic("Acid-Base Chemistry"),
    ];
    let config = BuildConfig::default().with_noise_threshold(1);
    GraphBuilder::new(config).build(&records).unwrap().0
}

fn passages() -> Arc<InMemoryPassageStore> {
    Arc::new(InMemoryPassageStore::from_passages([
        Passage::new("c1", "Housecroft", format!("Ligand field splitting of d orbitals. {}", "x".repeat(900))),
        Passage::new("c2", "Miessler", "Octahedral ligand field splitting energy."),
        Passage::new("c3", "Atkins", "Bronsted acids donate protons."),
    ]))
}

fn mock() -> MockBackend {
    MockBackend::new()
        .with_response("Synthesize these partial answers", "FINAL")
        .with_response("Decompose this chemistry question", DECOMPOSITION)
        .with_response("QUESTION: What is the d-electron count", "Cu2+ is d9")
        .with_response("QUESTION: How does the ligand field", "Octahedral splitting into t2g and eg")
        .with_response("QUESTION: Which transition", "The t2g to eg transition")
}

#[test]
fn chain_of_sub_questions_orders_linearly() {
    let subs = vec![
        SubQuestion::new(3, "c").depends_on([2]),
        SubQuestion::new(1, "a"),
        SubQuestion::new(2, "b").depends_on([1]),
    ];
    let ordered = order(&subs);
    let ids: Vec<u32> = ordered.order.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(ordered.cycle.is_empty());
}

#[tokio::test]
async fn answers_each_sub_question_with_dependency_context_only() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(mock());
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm.clone(), PipelineConfig::sequential());

    let answer = pipeline.answer("Why is [Cu(H2O)6]2+ blue?").await;

    let ids: Vec<u32> = answer.sub_questions.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(answer.sub_answers[&1], "Cu2+ is d9");
    assert_eq!(answer.final_answer, "FINAL");
    assert!(answer.diagnostics.is_clean());

    let third = &answer.context_used[2];
    assert_eq!(third.previous_answers.keys().copied().collect::<Vec<_>>(), vec![2]);
    let first = &answer.context_used[0];
    assert!(first.previous_answers.is_empty());

    let second = &answer.context_used[1];
    assert_eq!(second.topics.first().map(String::as_str), Some("Crystal Field Theory"));
    assert_eq!(second.prerequisites, vec!["Atomic Structure"]);
    assert!(second.passages.iter().all(|p| p.chars().count() <= 500));

    // The third prompt never sees the first sub-answer.
    let prompts = llm.prompts();
    let third_prompt = prompts
        .iter()
        .find(|p| p.contains("QUESTION: Which transition"))
        .unwrap();
    assert!(third_prompt.contains("Q2: Octahedral splitting"));
    assert!(!third_prompt.contains("Cu2+ is d9"));
}

#[tokio::test]
async fn failed_sub_answer_degrades_and_run_continues() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(mock().fail_on("QUESTION: How does the ligand field"));
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm, PipelineConfig::sequential());

    let answer = pipeline.answer("Why is [Cu(H2O)6]2+ blue?").await;

    assert!(answer.sub_answers[&2].starts_with("Error:"));
    assert_eq!(answer.sub_answers[&3], "The t2g to eg transition");
    let failed: Vec<_> = answer.diagnostics.for_stage(Stage::Answer).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].sub_question, Some(2));
    assert_eq!(answer.final_answer, "FINAL");
}

#[tokio::test]
async fn malformed_decomposition_falls_back_to_whole_question() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(
        MockBackend::new()
            .with_response("Decompose this chemistry question", "I would split it into three parts.")
            .with_fallback("an answer"),
    );
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm, PipelineConfig::default());

    let subs = pipeline.decompose("Why is it blue?").await;
    assert_eq!(subs, vec![SubQuestion::new(1, "Why is it blue?")]);

    let answer = pipeline.answer("Why is it blue?").await;
    assert_eq!(answer.sub_questions.len(), 1);
    let malformed: Vec<_> = answer.diagnostics.malformed().collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].raw.as_deref(), Some("I would split it into three parts."));
}

#[tokio::test]
async fn synthesis_failure_concatenates_parts() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let llm = Arc::new(mock().fail_on("Synthesize these partial answers"));
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm, PipelineConfig::sequential());

    let answer = pipeline.answer("Why is [Cu(H2O)6]2+ blue?").await;
    assert!(answer.final_answer.starts_with("Part 1: Cu2+ is d9\n\nPart 2: "));
    assert_eq!(answer.diagnostics.for_stage(Stage::Synthesize).count(), 1);
}

#[tokio::test]
async fn cyclic_dependencies_are_reported_not_fatal() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let cyclic = r#"{"sub_questions": [
        {"id": 1, "question": "alpha part", "depends_on": [2]},
        {"id": 2, "question": "beta part", "depends_on": [1]}
    ]}"#;
    let llm = Arc::new(
        MockBackend::new()
            .with_response("Decompose this chemistry question", cyclic)
            .with_response("QUESTION: alpha part", "A")
            .with_response("QUESTION: beta part", "B"),
    );
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm, PipelineConfig::default());

    let answer = pipeline.answer("loop").await;
    assert_eq!(answer.diagnostics.cycle, vec![1, 2]);
    assert_eq!(answer.sub_answers.len(), 2);
    assert!(answer.context_used[0].previous_answers.is_empty());
    assert_eq!(answer.context_used[1].previous_answers.get(&1).map(String::as_str), Some("A"));
}

struct StalledRetriever;

#[async_trait]
impl PassageRetriever for StalledRetriever {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn search(&self, _query: &str, _limit: usize) -> RetrievalResult<Vec<PassageHit>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn fetch(&self, _chunk_ids: &[String]) -> RetrievalResult<Vec<Passage>> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn retrieval_timeout_degrades_to_empty_context() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let config = PipelineConfig {
        retrieval_timeout_secs: 1,
        ..PipelineConfig::sequential()
    };
    let pipeline = QuestionPipeline::new(&g, &scores, Arc::new(StalledRetriever), Arc::new(mock()), config);

    let answer = pipeline.answer("Why is [Cu(H2O)6]2+ blue?").await;
    assert_eq!(answer.sub_answers.len(), 3);
    assert!(answer.context_used.iter().all(|c| c.topics.is_empty() && c.passages.is_empty()));
    let timeouts = answer.diagnostics.for_stage(Stage::Retrieve).filter(|d| d.is_timeout()).count();
    assert_eq!(timeouts, 3);
}

/// Tracks how many completions run at once and when each starts and ends.
struct RecordingBackend {
    config: LlmConfig,
    decomposition: String,
    active: AtomicUsize,
    peak: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn new(decomposition: &str) -> Self {
        Self {
            config: LlmConfig::default(),
            decomposition: decomposition.to_string(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        if prompt.contains("Decompose this chemistry question") {
            return Ok(self.decomposition.clone());
        }
        let tag = prompt
            .lines()
            .find_map(|l| l.strip_prefix("QUESTION: "))
            .unwrap_or("synthesis")
            .to_string();
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start {tag}"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.events.lock().unwrap().push(format!("end {tag}"));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("answer to {tag}"))
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_mode_caps_in_flight_calls_and_respects_dependencies() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let decomposition = r#"{"sub_questions": [
        {"id": 1, "question": "s1", "depends_on": []},
        {"id": 2, "question": "s2", "depends_on": []},
        {"id": 3, "question": "s3", "depends_on": []},
        {"id": 4, "question": "s4", "depends_on": []},
        {"id": 5, "question": "s5", "depends_on": [1]}
    ]}"#;
    let llm = Arc::new(RecordingBackend::new(decomposition));
    let config = PipelineConfig::default().with_mode(PipelineMode::Concurrent { cap: 3 });
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm.clone(), config);

    let answer = pipeline.answer("five parts").await;
    assert_eq!(answer.sub_answers.len(), 5);
    assert_eq!(llm.peak.load(Ordering::SeqCst), 3);

    let events = llm.events();
    let pos = |e: &str| events.iter().position(|x| x == e).unwrap();
    assert!(pos("end s1") < pos("start s5"));
    assert_eq!(answer.context_used[4].previous_answers.get(&1).map(String::as_str), Some("answer to s1"));
}

#[tokio::test(start_paused = true)]
async fn sequential_mode_runs_one_call_at_a_time() {
    let g = graph();
    let scores = CentralityEngine::default().scores(&g);
    let decomposition = r#"{"sub_questions": [
        {"id": 1, "question": "s1", "depends_on": []},
        {"id": 2, "question": "s2", "depends_on": []}
    ]}"#;
    let llm = Arc::new(RecordingBackend::new(decomposition));
    let pipeline = QuestionPipeline::new(&g, &scores, passages(), llm.clone(), PipelineConfig::sequential());

    pipeline.answer("two parts").await;
    assert_eq!(llm.peak.load(Ordering::SeqCst), 1);
    assert_eq!(llm.events()[..4], ["start s1", "end s1", "start s2", "end s2"]);
}
