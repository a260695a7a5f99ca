//! Hub checkpoints: annotations on a finished order.

use crate::centrality::ScoreTable;
use serde::{Deserialize, Serialize};

const CURATED_HUBS: &[&str] = &[
    "Acid-Base Chemistry",
    "Crystal Field Theory",
    "Molecular Orbital Theory",
    "Redox Chemistry",
    "Periodic Trends",
    "Coordination Chemistry",
    "Ionic Bonding",
    "Atomic Structure",
    "Thermodynamics",
    "Kinetics",
    "Symmetry And Group Theory",
    "Solid State Chemistry",
    "Organometallic Chemistry",
];

/// When a node in an order becomes a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_hub_score_threshold")]
    pub hub_score_threshold: f64,
    /// Both degrees at least this.
    #[serde(default = "default_min_degree")]
    pub min_degree: usize,
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f64,
    /// Matched case-insensitively.
    #[serde(default = "default_curated_hubs")]
    pub curated_hubs: Vec<String>,
}

fn default_hub_score_threshold() -> f64 {
    0.4
}

fn default_min_degree() -> usize {
    3
}

fn default_mastery_threshold() -> f64 {
    0.75
}

fn default_curated_hubs() -> Vec<String> {
    CURATED_HUBS.iter().map(|s| s.to_string()).collect()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            hub_score_threshold: default_hub_score_threshold(),
            min_degree: default_min_degree(),
            mastery_threshold: default_mastery_threshold(),
            curated_hubs: default_curated_hubs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    HubScore,
    Curated,
    Degree,
}

/// A node learners should master before moving on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 1-based position in the order.
    pub position: usize,
    pub id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub hub_score: f64,
    pub mastery_threshold: f64,
    pub remediation: String,
    pub reasons: Vec<CheckpointReason>,
}

/// `remediation_paths.weak_<slug>`, slug = lowercase id with non-alphanumerics as `_`.
pub fn remediation_pointer(id: &str) -> String {
    let slug: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("remediation_paths.weak_{slug}")
}

/// Flag checkpoints along `order`. The order itself is left untouched.
pub fn find_checkpoints(order: &[String], scores: &ScoreTable, config: &CheckpointConfig) -> Vec<Checkpoint> {
    let curated: Vec<String> = config.curated_hubs.iter().map(|h| h.to_lowercase()).collect();

    order
        .iter()
        .enumerate()
        .filter_map(|(pos, id)| {
            let s = scores.get(id).copied().unwrap_or_default();
            let mut reasons = Vec::new();
            if s.hub_score > config.hub_score_threshold {
                reasons.push(CheckpointReason::HubScore);
            }
            if curated.contains(&id.to_lowercase()) {
                reasons.push(CheckpointReason::Curated);
            }
            if s.in_degree >= config.min_degree && s.out_degree >= config.min_degree {
                reasons.push(CheckpointReason::Degree);
            }
            if reasons.is_empty() {
                return None;
            }
            Some(Checkpoint {
                position: pos + 1,
                id: id.clone(),
                in_degree: s.in_degree,
                out_degree: s.out_degree,
                hub_score: s.hub_score,
                mastery_threshold: config.mastery_threshold,
                remediation: remediation_pointer(id),
                reasons,
            })
        })
        .collect()
}
