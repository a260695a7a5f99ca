//! Prerequisite path tracing.
//!
//! Walks "enables" edges backward from a target, bounded by depth, and
//! groups what it finds into a funnel ordered by semantic scale. Learning
//! paths are topological orders over the traced nodes a learner does not
//! know yet.

use crate::centrality::ScoreTable;
use crate::store::KnowledgeGraph;
use chemkg_core::error::{ChemkgError, Result};
use chemkg_core::types::{Relation, Scale};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Question keywords and the concept each one points at, checked in order.
const QUESTION_KEYWORDS: &[(&str, &str)] = &[
    ("color", "Color And Magnetism Of Coordination Compounds"),
    ("blue", "Crystal Field Theory"),
    ("magnetic", "Magnetic Properties Of Transition Metals"),
    ("crystal field", "Crystal Field Theory"),
    ("splitting", "Crystal Field Theory"),
    ("orbital", "Molecular Orbital Theory"),
    ("symmetry", "Molecular Symmetry And Group Theory"),
    ("point group", "Symmetry And Point Groups"),
    ("solid", "Solid State Chemistry"),
    ("lattice", "Crystal Structures"),
    ("acid", "Acid-Base Chemistry"),
    ("redox", "Redox Chemistry"),
    ("periodic", "Periodic Trends"),
];

/// Tracer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracerConfig {
    /// Hops walked back from the target.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Hops for [`PathTracer::ranked_prerequisites`].
    #[serde(default = "default_ranked_depth")]
    pub ranked_depth: usize,
    /// Suggestions returned with an unknown concept.
    #[serde(default = "default_suggestions")]
    pub suggestions: usize,
}

fn default_max_depth() -> usize {
    5
}

fn default_ranked_depth() -> usize {
    2
}

fn default_suggestions() -> usize {
    5
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            ranked_depth: default_ranked_depth(),
            suggestions: default_suggestions(),
        }
    }
}

/// A node reached by a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedNode {
    pub id: String,
    pub scale: Scale,
    /// Hops from the target.
    pub depth: usize,
    pub mention_count: u64,
    pub reverse_rank: f64,
    pub is_target: bool,
}

/// An enabling edge between two traced nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedEdge {
    pub source: String,
    pub target: String,
    /// Depth of the source.
    pub depth: usize,
}

/// Traced nodes of one scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelLayer {
    pub scale: Scale,
    /// Ordinal of the scale in the funnel.
    pub depth: usize,
    pub nodes: Vec<String>,
    pub count: usize,
}

/// Result of [`PathTracer::trace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub target: String,
    pub max_depth: usize,
    /// Breadth-first order, target first.
    pub nodes: Vec<TracedNode>,
    pub edges: Vec<TracedEdge>,
    /// Non-empty scales in funnel order.
    pub funnel: Vec<FunnelLayer>,
}

impl Trace {
    pub fn node(&self, id: &str) -> Option<&TracedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Known,
    ToLearn,
    Target,
}

/// One numbered step of a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub step: usize,
    pub concept: String,
    pub scale: Scale,
    pub status: StepStatus,
    pub reverse_rank: f64,
}

/// Result of [`PathTracer::learning_path`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub target: String,
    pub total_steps: usize,
    pub new_concepts: usize,
    /// Traced prerequisites dropped because the learner knows them.
    pub skipped_known: usize,
    /// Target is always last.
    pub steps: Vec<PathStep>,
    /// Steps placed by the cycle fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<String>,
}

/// A prerequisite ranked by reverse rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrerequisite {
    pub id: String,
    pub reverse_rank: f64,
    pub depth: usize,
}

/// Traces prerequisites over an immutable graph.
pub struct PathTracer<'g> {
    graph: &'g KnowledgeGraph,
    scores: &'g ScoreTable,
    config: TracerConfig,
}

impl<'g> PathTracer<'g> {
    pub fn new(graph: &'g KnowledgeGraph, scores: &'g ScoreTable, config: TracerConfig) -> Self {
        Self {
            graph,
            scores,
            config,
        }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Node ids containing `query` or contained in it, shortest first.
    pub fn find_concept(&self, query: &str) -> Vec<&'g str> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<&'g str> = self
            .graph
            .nodes()
            .map(|n| n.id.as_str())
            .filter(|id| {
                let lower = id.to_lowercase();
                lower.contains(&query) || query.contains(&lower)
            })
            .collect();
        matches.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        matches.truncate(self.config.suggestions);
        matches
    }

    /// Exact id, then case-insensitive id; otherwise an unknown-concept
    /// error carrying suggestions.
    pub fn resolve(&self, name: &str) -> Result<&'g str> {
        if name.trim().is_empty() {
            return Err(ChemkgError::empty_query());
        }
        match self.graph.resolve(name) {
            Some(node) => Ok(node.id.as_str()),
            None => {
                let suggestions = self.find_concept(name).into_iter().map(String::from).collect();
                Err(ChemkgError::unknown_concept(name.trim(), suggestions))
            }
        }
    }

    /// Trace with the configured depth.
    pub fn trace(&self, target: &str) -> Result<Trace> {
        self.trace_depth(target, self.config.max_depth)
    }

    /// Breadth-first backward walk, each node visited once, never past
    /// `max_depth` hops.
    pub fn trace_depth(&self, target: &str, max_depth: usize) -> Result<Trace> {
        let target = self.resolve(target)?;

        let mut depth_of: HashMap<&'g str, usize> = HashMap::from([(target, 0)]);
        let mut visit_order: Vec<&'g str> = vec![target];
        let mut edges = Vec::new();
        let mut queue = VecDeque::from([target]);

        while let Some(current) = queue.pop_front() {
            let depth = depth_of[current];
            if depth >= max_depth {
                continue;
            }
            for pred in self.graph.enabling_predecessors(current) {
                edges.push(TracedEdge {
                    source: pred.to_string(),
                    target: current.to_string(),
                    depth: depth + 1,
                });
                if !depth_of.contains_key(pred) {
                    depth_of.insert(pred, depth + 1);
                    visit_order.push(pred);
                    queue.push_back(pred);
                }
            }
        }

        let nodes: Vec<TracedNode> = visit_order
            .iter()
            .filter_map(|id| self.graph.node(id))
            .map(|node| TracedNode {
                id: node.id.clone(),
                scale: node.scale,
                depth: depth_of[node.id.as_str()],
                mention_count: node.mention_count,
                reverse_rank: self.scores.reverse_rank(&node.id),
                is_target: node.id == target,
            })
            .collect();

        let funnel = Scale::ALL
            .iter()
            .filter_map(|scale| {
                let members: Vec<String> = nodes
                    .iter()
                    .filter(|n| n.scale == *scale)
                    .map(|n| n.id.clone())
                    .collect();
                (!members.is_empty()).then(|| FunnelLayer {
                    scale: *scale,
                    depth: scale.ordinal(),
                    count: members.len(),
                    nodes: members,
                })
            })
            .collect();

        tracing::debug!(concept = target, nodes = nodes.len(), edges = edges.len(), "prerequisites traced");
        Ok(Trace {
            target: target.to_string(),
            max_depth,
            nodes,
            edges,
            funnel,
        })
    }

    /// Ordered steps to `target`, skipping concepts in `known`
    /// (matched case-insensitively).
    ///
    /// The target is always the last step. Its status is `Target` unless
    /// the target itself is in `known`, in which case it is `Known`.
    pub fn learning_path<S: AsRef<str>>(&self, target: &str, known: &[S]) -> Result<LearningPath> {
        let trace = self.trace(target)?;
        let known: HashSet<String> = known.iter().map(|k| k.as_ref().trim().to_lowercase()).collect();
        let is_known = |id: &str| known.contains(&id.to_lowercase());

        let traced: HashMap<&str, &TracedNode> =
            trace.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let to_learn: Vec<&TracedNode> = trace
            .nodes
            .iter()
            .filter(|n| !n.is_target && !is_known(&n.id))
            .collect();
        let skipped_known = trace
            .nodes
            .iter()
            .filter(|n| !n.is_target && is_known(&n.id))
            .count();
        let members: HashSet<&str> = to_learn.iter().map(|n| n.id.as_str()).collect();

        // Kahn over enabling edges inside `to_learn`.
        let mut in_degree: HashMap<&str, usize> = members.iter().map(|id| (*id, 0)).collect();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for id in &members {
            for succ in self.graph.enabling_successors(id) {
                if members.contains(succ) {
                    successors.entry(*id).or_default().push(succ);
                    if let Some(d) = in_degree.get_mut(succ) {
                        *d += 1;
                    }
                }
            }
        }

        let key = |id: &str| {
            let node = traced[id];
            (node.scale.ordinal(), Reverse(node.depth), node.id.clone())
        };
        let mut ready: BTreeSet<(usize, Reverse<usize>, String)> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| key(*id))
            .collect();

        let mut order: Vec<String> = Vec::with_capacity(members.len());
        while let Some((_, _, id)) = ready.pop_first() {
            if let Some(next) = successors.get(id.as_str()) {
                for succ in next {
                    if let Some(d) = in_degree.get_mut(succ) {
                        *d -= 1;
                        if *d == 0 {
                            ready.insert(key(*succ));
                        }
                    }
                }
            }
            order.push(id);
        }

        let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut cycle: Vec<&TracedNode> = to_learn
            .iter()
            .copied()
            .filter(|n| !placed.contains(n.id.as_str()))
            .collect();
        cycle.sort_by_key(|n| (n.scale.ordinal(), Reverse(n.depth), n.id.clone()));
        let cycle: Vec<String> = cycle.into_iter().map(|n| n.id.clone()).collect();
        if !cycle.is_empty() {
            tracing::warn!(concept = %trace.target, members = ?cycle, "cycle among prerequisites; appended");
        }
        order.extend(cycle.iter().cloned());

        let mut steps: Vec<PathStep> = order
            .iter()
            .filter_map(|id| traced.get(id.as_str()))
            .map(|n| PathStep {
                step: 0,
                concept: n.id.clone(),
                scale: n.scale,
                status: StepStatus::ToLearn,
                reverse_rank: n.reverse_rank,
            })
            .collect();
        if let Some(target_node) = trace.nodes.iter().find(|n| n.is_target) {
            steps.push(PathStep {
                step: 0,
                concept: target_node.id.clone(),
                scale: target_node.scale,
                status: if is_known(&target_node.id) {
                    StepStatus::Known
                } else {
                    StepStatus::Target
                },
                reverse_rank: target_node.reverse_rank,
            });
        }
        for (i, step) in steps.iter_mut().enumerate() {
            step.step = i + 1;
        }

        Ok(LearningPath {
            target: trace.target.clone(),
            total_steps: steps.len(),
            new_concepts: to_learn.len(),
            skipped_known,
            steps,
            cycle,
        })
    }

    /// Map a free-text question to a concept and trace it.
    pub fn question_to_trace(&self, question: &str) -> Result<Trace> {
        let lower = question.trim().to_lowercase();
        if lower.is_empty() {
            return Err(ChemkgError::empty_query());
        }

        for (keyword, concept) in QUESTION_KEYWORDS {
            if lower.contains(keyword) && self.graph.contains(concept) {
                return self.trace(concept);
            }
        }

        for word in lower.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-');
            if word.chars().count() <= 4 {
                continue;
            }
            if let Some(first) = self.find_concept(word).first() {
                return self.trace(first);
            }
        }

        Err(ChemkgError::unknown_concept(question.trim(), Vec::new()))
    }

    /// Prerequisites reached over incoming `prerequisite_for` edges within
    /// `depth` hops, highest reverse rank first.
    pub fn ranked_prerequisites(&self, topic: &str, depth: usize) -> Result<Vec<RankedPrerequisite>> {
        let topic = self.resolve(topic)?;
        let mut seen: HashSet<&str> = HashSet::from([topic]);
        let mut frontier = vec![topic];
        let mut found = Vec::new();

        for level in 1..=depth {
            let mut next = Vec::new();
            for id in &frontier {
                for pred in self.graph.predecessors(id, Relation::PrerequisiteFor) {
                    if seen.insert(pred) {
                        found.push(RankedPrerequisite {
                            id: pred.to_string(),
                            reverse_rank: self.scores.reverse_rank(pred),
                            depth: level,
                        });
                        next.push(pred);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        found.sort_by(|a, b| {
            b.reverse_rank
                .total_cmp(&a.reverse_rank)
                .then_with(|| a.depth.cmp(&b.depth))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centrality::CentralityEngine;
    use crate::store::GraphMetadata;
    use chemkg_core::types::{Edge, Node, NodeKind};

    fn graph() -> KnowledgeGraph {
        let ids = [
            "Atomic Structure",
            "Electron Configuration",
            "Bonding Basics",
            "Crystal Field Theory",
            "Periodic Trends",
        ];
        let nodes = ids.iter().map(|id| Node::new(*id, NodeKind::Topic).with_mentions(10)).collect();
        let edges = vec![
            Edge::new("Atomic Structure", "Electron Configuration", Relation::PrerequisiteFor, 2),
            Edge::new("Electron Configuration", "Bonding Basics", Relation::PrerequisiteFor, 2),
            Edge::new("Bonding Basics", "Crystal Field Theory", Relation::PrerequisiteFor, 2),
            Edge::new("Periodic Trends", "Crystal Field Theory", Relation::LeadsTo, 2),
        ];
        KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap()
    }

    #[test]
    fn trace_builds_funnel_in_scale_order() {
        let g = graph();
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let trace = tracer.trace("crystal field theory").unwrap();
        assert_eq!(trace.target, "Crystal Field Theory");
        assert_eq!(trace.nodes.len(), 5);
        assert_eq!(trace.node("Atomic Structure").map(|n| n.depth), Some(3));
        let scales: Vec<Scale> = trace.funnel.iter().map(|l| l.scale).collect();
        assert_eq!(scales, vec![Scale::Quantum, Scale::Electronic, Scale::Descriptive]);
        assert_eq!(trace.funnel[0].depth, 0);
    }

    #[test]
    fn depth_bound_is_respected() {
        let g = graph();
        let scores = ScoreTable::default();
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let trace = tracer.trace_depth("Crystal Field Theory", 1).unwrap();
        let ids: Vec<&str> = trace.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Crystal Field Theory", "Bonding Basics", "Periodic Trends"]);
        assert!(trace.nodes.iter().all(|n| n.depth <= 1));
    }

    #[test]
    fn unknown_target_carries_suggestions() {
        let g = graph();
        let scores = ScoreTable::default();
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let err = tracer.trace("Crystal").unwrap_err();
        assert!(err.is_unknown_concept());
        assert_eq!(err.suggestions().to_vec(), vec!["Crystal Field Theory".to_string()]);
    }

    #[test]
    fn learning_path_skips_known_and_ends_at_target() {
        let g = graph();
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let path = tracer.learning_path("Crystal Field Theory", &["atomic structure"]).unwrap();
        let concepts: Vec<&str> = path.steps.iter().map(|s| s.concept.as_str()).collect();
        assert_eq!(
            concepts,
            vec!["Electron Configuration", "Bonding Basics", "Periodic Trends", "Crystal Field Theory"]
        );
        assert_eq!(path.steps.last().map(|s| s.status), Some(StepStatus::Target));
        assert_eq!(path.new_concepts, 3);
        assert_eq!(path.skipped_known, 1);
        assert_eq!(path.total_steps, 4);
    }

    #[test]
    fn known_target_is_marked_known() {
        let g = graph();
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let path = tracer.learning_path("Periodic Trends", &["periodic trends"]).unwrap();
        let last = path.steps.last().unwrap();
        assert_eq!(last.concept, "Periodic Trends");
        assert_eq!(last.status, StepStatus::Known);
    }

    #[test]
    fn question_keywords_then_fuzzy_words() {
        let g = graph();
        let scores = ScoreTable::default();
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let trace = tracer.question_to_trace("Why is this complex blue?").unwrap();
        assert_eq!(trace.target, "Crystal Field Theory");
        let trace = tracer.question_to_trace("explain periodic behaviour").unwrap();
        assert_eq!(trace.target, "Periodic Trends");
        let trace = tracer.question_to_trace("what about electron shells").unwrap();
        assert_eq!(trace.target, "Electron Configuration");
        assert!(tracer.question_to_trace("why so?").unwrap_err().is_unknown_concept());
    }

    #[test]
    fn ranked_prerequisites_follow_prerequisite_edges_only() {
        let g = graph();
        let scores = CentralityEngine::default().scores(&g);
        let tracer = PathTracer::new(&g, &scores, TracerConfig::default());
        let ranked = tracer.ranked_prerequisites("Crystal Field Theory", 2).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"Bonding Basics"));
        assert!(ids.contains(&"Electron Configuration"));
        assert!(!ids.contains(&"Periodic Trends"));
    }
}
