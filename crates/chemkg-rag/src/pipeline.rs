//! Decompose, order, answer and synthesize a question.
//!
//! Each sub-question gets its own retrieval, prerequisite lookup and
//! generation call. A sub-question starts only after the dependencies
//! placed before it have answered, and it sees only those answers.
//! `Concurrent` mode keeps up to `cap` sub-questions in flight.

use crate::decompose::{order, sanitize, OrderedQuestions};
use crate::diagnostics::{from_llm, from_retrieval, Degradation, Diagnostics, Stage};
use crate::dual::{dual_level, DualRetrieval};
use crate::retrieval::{Passage, PassageHit, PassageRetriever};
use chemkg_core::error::{DependencyError, ExternalError};
use chemkg_graph::centrality::ScoreTable;
use chemkg_graph::store::KnowledgeGraph;
use chemkg_graph::tracer::{PathTracer, TracerConfig};
use chemkg_llm::prompt::{truncate_chars, PromptTemplate};
use chemkg_llm::{
    AnswerPrompt, Decomposition, DecompositionPrompt, LlmBackend, SubQuestion, SynthesisPrompt,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How sub-questions are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// One call at a time, in order.
    Sequential,
    /// Up to `cap` sub-questions in flight.
    Concurrent { cap: usize },
}

impl PipelineMode {
    pub fn cap(&self) -> usize {
        match self {
            PipelineMode::Sequential => 1,
            PipelineMode::Concurrent { cap } => (*cap).max(1),
        }
    }
}

impl Default for PipelineMode {
    fn default() -> Self {
        PipelineMode::Concurrent { cap: 3 }
    }
}

/// Limits and timeouts for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    pub max_sub_questions: usize,
    /// Topics kept per retrieval; passages searched is twice this.
    pub top_k: usize,
    pub concept_limit: usize,
    pub prerequisite_limit: usize,
    pub prerequisite_depth: usize,
    /// Topics whose chunks feed the context.
    pub passage_topics: usize,
    pub passage_limit: usize,
    pub passage_chars: usize,
    pub previous_answer_chars: usize,
    pub retrieval_timeout_secs: u64,
    pub generation_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            max_sub_questions: 5,
            top_k: 5,
            concept_limit: 5,
            prerequisite_limit: 5,
            prerequisite_depth: 2,
            passage_topics: 3,
            passage_limit: 5,
            passage_chars: 500,
            previous_answer_chars: 200,
            retrieval_timeout_secs: 30,
            generation_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    pub fn sequential() -> Self {
        Self {
            mode: PipelineMode::Sequential,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }
}

/// What one sub-question was answered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBundle {
    pub sub_question_id: u32,
    pub sub_question: String,
    pub topics: Vec<String>,
    pub concepts: Vec<String>,
    pub prerequisites: Vec<String>,
    pub passages: Vec<String>,
    /// Answers of declared dependencies only.
    pub previous_answers: BTreeMap<u32, String>,
}

/// Result of [`QuestionPipeline::answer`].
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    /// Sub-questions in answering order.
    pub sub_questions: Vec<SubQuestion>,
    pub sub_answers: BTreeMap<u32, String>,
    pub final_answer: String,
    /// One bundle per sub-question, in answering order.
    pub context_used: Vec<ContextBundle>,
    pub diagnostics: Diagnostics,
}

struct SubOutcome {
    index: usize,
    id: u32,
    answer: String,
    context: ContextBundle,
    degraded: Vec<Degradation>,
}

/// Question answering over one graph snapshot.
pub struct QuestionPipeline<'g> {
    graph: &'g KnowledgeGraph,
    tracer: PathTracer<'g>,
    retriever: Arc<dyn PassageRetriever>,
    llm: Arc<dyn LlmBackend>,
    config: PipelineConfig,
}

impl<'g> QuestionPipeline<'g> {
    pub fn new(
        graph: &'g KnowledgeGraph,
        scores: &'g ScoreTable,
        retriever: Arc<dyn PassageRetriever>,
        llm: Arc<dyn LlmBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            graph,
            tracer: PathTracer::new(graph, scores, TracerConfig::default()),
            retriever,
            llm,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &'g KnowledgeGraph {
        self.graph
    }

    pub fn tracer(&self) -> &PathTracer<'g> {
        &self.tracer
    }

    pub fn retriever(&self) -> &dyn PassageRetriever {
        self.retriever.as_ref()
    }

    pub fn llm(&self) -> &dyn LlmBackend {
        self.llm.as_ref()
    }

    /// Split `question` into at most `max_sub_questions` sub-questions.
    /// Falls back to the question itself on any failure.
    pub async fn decompose(&self, question: &str) -> Vec<SubQuestion> {
        let mut diagnostics = Diagnostics::default();
        self.decompose_with(question, &mut diagnostics).await.sub_questions
    }

    async fn decompose_with(&self, question: &str, diagnostics: &mut Diagnostics) -> Decomposition {
        let prompt = DecompositionPrompt::new(question)
            .with_max_sub_questions(self.config.max_sub_questions);
        let raw = match self.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                diagnostics.push(Degradation::new(Stage::Decompose, None, e));
                return Decomposition::single(question);
            }
        };
        match Decomposition::parse(&raw) {
            Ok(d) => sanitize(d, self.config.max_sub_questions),
            Err(e) => {
                diagnostics.push(Degradation::new(Stage::Decompose, None, from_llm(self.llm.name(), &e)));
                Decomposition::single(question)
            }
        }
    }

    /// Dependency order with the cycle fallback applied.
    pub fn order(&self, sub_questions: &[SubQuestion]) -> OrderedQuestions {
        order(sub_questions)
    }

    /// Full decompose, order, answer and synthesize run.
    pub async fn answer(&self, question: &str) -> Answer {
        let mut diagnostics = Diagnostics::default();
        let decomposition = self.decompose_with(question, &mut diagnostics).await;
        let ordered = order(&decomposition.sub_questions);
        if !ordered.cycle.is_empty() {
            let err = DependencyError::Cycle {
                members: ordered.cycle.iter().map(|id| id.to_string()).collect(),
            };
            warn!(error = %err, "sub-question dependencies are cyclic, using declared order for the rest");
            diagnostics.cycle = ordered.cycle.clone();
        }
        info!(
            sub_questions = ordered.order.len(),
            mode = ?self.config.mode,
            "answering question"
        );

        let outcomes = self.run(&ordered.order).await;

        let mut sub_answers = BTreeMap::new();
        let mut context_used = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            sub_answers.insert(outcome.id, outcome.answer);
            context_used.push(outcome.context);
            for d in outcome.degraded {
                diagnostics.push(d);
            }
        }

        let final_answer = self.synthesize_answers(question, &sub_answers, &mut diagnostics).await;

        Answer {
            question: question.to_string(),
            sub_questions: ordered.order,
            sub_answers,
            final_answer,
            context_used,
            diagnostics,
        }
    }

    async fn run(&self, order: &[SubQuestion]) -> Vec<SubOutcome> {
        let cap = self.config.mode.cap();
        let position: HashMap<u32, usize> = order.iter().enumerate().map(|(i, sq)| (sq.id, i)).collect();
        // Dependencies placed before a sub-question; later ones are cycle
        // leftovers and never visible.
        let visible_deps = |i: usize| -> Vec<u32> {
            order[i]
                .depends_on
                .iter()
                .copied()
                .filter(|d| position.get(d).map(|&p| p < i).unwrap_or(false))
                .collect()
        };

        let mut answers: BTreeMap<u32, String> = BTreeMap::new();
        let mut outcomes: Vec<Option<SubOutcome>> = (0..order.len()).map(|_| None).collect();
        let mut started = vec![false; order.len()];
        let mut in_flight = FuturesUnordered::new();

        loop {
            for i in 0..order.len() {
                if in_flight.len() >= cap {
                    break;
                }
                if started[i] {
                    continue;
                }
                let deps = visible_deps(i);
                if !deps.iter().all(|d| answers.contains_key(d)) {
                    continue;
                }
                let previous: BTreeMap<u32, String> = deps
                    .iter()
                    .filter_map(|d| {
                        answers
                            .get(d)
                            .map(|a| (*d, truncate_chars(a, self.config.previous_answer_chars).to_string()))
                    })
                    .collect();
                started[i] = true;
                in_flight.push(self.answer_one(i, &order[i], previous));
            }

            match in_flight.next().await {
                Some(outcome) => {
                    debug!(sub_question = outcome.id, "sub-question answered");
                    answers.insert(outcome.id, outcome.answer.clone());
                    let index = outcome.index;
                    outcomes[index] = Some(outcome);
                }
                None => break,
            }
        }

        outcomes.into_iter().flatten().collect()
    }

    async fn answer_one(&self, index: usize, sq: &SubQuestion, previous: BTreeMap<u32, String>) -> SubOutcome {
        let mut degraded = Vec::new();

        let retrieval = match self.search(&sq.question).await {
            Ok(hits) => dual_level(self.graph, &sq.question, &hits, self.config.top_k),
            Err(e) => {
                degraded.push(Degradation::new(Stage::Retrieve, Some(sq.id), e));
                DualRetrieval::empty(&sq.question)
            }
        };

        let prerequisites: Vec<String> = retrieval
            .top_topic()
            .and_then(|topic| {
                self.tracer
                    .ranked_prerequisites(topic, self.config.prerequisite_depth)
                    .ok()
            })
            .unwrap_or_default()
            .into_iter()
            .take(self.config.prerequisite_limit)
            .map(|p| p.id)
            .collect();

        let chunk_ids = retrieval.chunk_ids(self.config.passage_topics, self.config.passage_limit);
        let passages = if chunk_ids.is_empty() {
            Vec::new()
        } else {
            match self.fetch(&chunk_ids).await {
                Ok(passages) => passages,
                Err(e) => {
                    degraded.push(Degradation::new(Stage::Fetch, Some(sq.id), e));
                    Vec::new()
                }
            }
        };

        let context = ContextBundle {
            sub_question_id: sq.id,
            sub_question: sq.question.clone(),
            topics: retrieval.topics.iter().map(|t| t.topic.clone()).collect(),
            concepts: retrieval
                .concepts
                .iter()
                .take(self.config.concept_limit)
                .map(|c| c.concept.clone())
                .collect(),
            prerequisites,
            passages: passages
                .iter()
                .map(|p| truncate_chars(&p.text, self.config.passage_chars).to_string())
                .collect(),
            previous_answers: previous,
        };

        let prompt = AnswerPrompt {
            question: sq.question.clone(),
            topics: context.topics.clone(),
            concepts: context.concepts.clone(),
            prerequisites: context.prerequisites.clone(),
            excerpts: context.passages.clone(),
            previous_answers: context.previous_answers.iter().map(|(k, v)| (*k, v.clone())).collect(),
            ..AnswerPrompt::new(sq.question.clone())
        };

        let answer = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                let answer = format!("Error: {}", e);
                degraded.push(Degradation::new(Stage::Answer, Some(sq.id), e));
                answer
            }
        };

        SubOutcome {
            index,
            id: sq.id,
            answer,
            context,
            degraded,
        }
    }

    async fn synthesize_answers(
        &self,
        question: &str,
        answers: &BTreeMap<u32, String>,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let prompt = SynthesisPrompt::new(
            question,
            answers.iter().map(|(k, v)| (*k, v.clone())).collect(),
        );
        match self.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => prompt.concatenated(),
            Err(e) => {
                diagnostics.push(Degradation::new(Stage::Synthesize, None, e));
                prompt.concatenated()
            }
        }
    }

    pub(crate) async fn generate<P: PromptTemplate>(&self, prompt: &P) -> Result<String, ExternalError> {
        self.generate_text(prompt.generate(), prompt.wants_json()).await
    }

    async fn generate_text(&self, text: String, json: bool) -> Result<String, ExternalError> {
        let service = self.llm.name();
        let call = async {
            if json {
                self.llm.complete_json(&text).await
            } else {
                self.llm.complete(&text).await
            }
        };
        bounded(service, self.config.generation_timeout_secs, call)
            .await?
            .map_err(|e| from_llm(service, &e))
    }

    async fn search(&self, query: &str) -> Result<Vec<PassageHit>, ExternalError> {
        let service = self.retriever.name();
        bounded(
            service,
            self.config.retrieval_timeout_secs,
            self.retriever.search(query, self.config.top_k * 2),
        )
        .await?
        .map_err(|e| from_retrieval(service, &e))
    }

    pub(crate) async fn fetch(&self, chunk_ids: &[String]) -> Result<Vec<Passage>, ExternalError> {
        let service = self.retriever.name();
        bounded(service, self.config.retrieval_timeout_secs, self.retriever.fetch(chunk_ids))
            .await?
            .map_err(|e| from_retrieval(service, &e))
    }
}

/// Run `fut` under a timeout; elapsed time becomes `TimedOut`.
pub(crate) async fn bounded<T, F>(service: &str, secs: u64, fut: F) -> Result<T, ExternalError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(secs), fut)
        .await
        .map_err(|_| ExternalError::TimedOut {
            service: service.to_string(),
            secs,
        })
}
