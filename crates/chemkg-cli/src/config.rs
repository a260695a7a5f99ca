//! Configuration management for the ChemKG CLI.

use anyhow::{bail, Context, Result};
use chemkg::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "chemkg.toml";
pub const DATA_DIR: &str = ".chemkg";

/// ChemKG project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub rank: RankConfig,
    #[serde(default)]
    pub classification: ClassificationSection,
    #[serde(default)]
    pub curriculum: CurriculumSection,
    #[serde(default)]
    pub tracer: TracerConfig,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub query: QuerySection,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    /// Extraction records, JSON array or JSON Lines.
    pub records: String,
    /// Persisted graph.
    pub path: String,
    /// Passage store used by query, coverage and synthesize.
    pub passages: String,
    pub noise_threshold: u32,
    /// Most concept nodes kept; 0 keeps all.
    pub max_concepts: usize,
    #[serde(skip_serializing)]
    pub normalizer: NormalizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSection {
    pub foundation_min_out: usize,
    pub capstone_min_in: usize,
    pub hub_above: usize,
    pub foundation_above: f64,
    pub capstone_below: f64,
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumSection {
    pub strategy: String,
    pub min_count: u64,
    pub top_n: usize,
    pub seed_count: usize,
    pub hub_score_threshold: f64,
    pub min_degree: usize,
    pub mastery_threshold: f64,
    pub curated_hubs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySection {
    /// "concurrent" or "sequential".
    pub mode: String,
    pub concurrency: usize,
    pub max_sub_questions: usize,
    pub top_k: usize,
    pub retrieval_timeout_secs: u64,
}

impl Default for GraphSection {
    fn default() -> Self {
        let build = BuildConfig::default();
        Self {
            records: format!("{DATA_DIR}/records.json"),
            path: format!("{DATA_DIR}/graph.json"),
            passages: format!("{DATA_DIR}/passages.json"),
            noise_threshold: build.noise_threshold,
            max_concepts: build.max_concepts.unwrap_or(0),
            normalizer: build.normalizer,
        }
    }
}

impl Default for ClassificationSection {
    fn default() -> Self {
        let degree = DegreeThresholds::default();
        let position = PositionThresholds::default();
        Self {
            foundation_min_out: degree.foundation_min_out,
            capstone_min_in: degree.capstone_min_in,
            hub_above: degree.hub_above,
            foundation_above: position.foundation_above,
            capstone_below: position.capstone_below,
            top_n: CentralityEngine::default().top_n,
        }
    }
}

impl Default for CurriculumSection {
    fn default() -> Self {
        let sequencer = SequencerConfig::default();
        let checkpoints = CheckpointConfig::default();
        Self {
            strategy: Strategy::Hybrid.name().to_string(),
            min_count: sequencer.min_count,
            top_n: sequencer.top_n,
            seed_count: sequencer.seed_count,
            hub_score_threshold: checkpoints.hub_score_threshold,
            min_degree: checkpoints.min_degree,
            mastery_threshold: checkpoints.mastery_threshold,
            curated_hubs: checkpoints.curated_hubs,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        let llm = LlmConfig::ollama();
        Self {
            endpoint: llm.endpoint,
            model: llm.model,
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            timeout_secs: llm.timeout_secs,
        }
    }
}

impl Default for QuerySection {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            mode: "concurrent".to_string(),
            concurrency: pipeline.mode.cap(),
            max_sub_questions: pipeline.max_sub_questions,
            top_k: pipeline.top_k,
            retrieval_timeout_secs: pipeline.retrieval_timeout_secs,
        }
    }
}

impl GraphSection {
    pub fn build_config(&self) -> BuildConfig {
        BuildConfig {
            normalizer: self.normalizer.clone(),
            ..BuildConfig::default()
        }
        .with_noise_threshold(self.noise_threshold)
        .with_max_concepts((self.max_concepts > 0).then_some(self.max_concepts))
    }
}

impl CurriculumSection {
    pub fn sequencer(&self) -> SequencerConfig {
        SequencerConfig {
            top_n: self.top_n,
            seed_count: self.seed_count,
            ..SequencerConfig::default()
        }
        .with_min_count(self.min_count)
    }

    pub fn checkpoints(&self) -> CheckpointConfig {
        CheckpointConfig {
            hub_score_threshold: self.hub_score_threshold,
            min_degree: self.min_degree,
            mastery_threshold: self.mastery_threshold,
            curated_hubs: self.curated_hubs.clone(),
        }
    }
}

impl LlmSection {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig::ollama()
            .with_endpoint(self.endpoint.clone())
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout_secs)
    }
}

impl Config {
    /// Load chemkg.toml from the current or parent directories, falling
    /// back to the user config directory, then to defaults.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let (path, root) = match find_config_file(&cwd) {
            Some(path) => {
                let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone());
                (Some(path), root)
            }
            None => (user_config_file().filter(|p| p.exists()), cwd),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };
        config.root = Some(root);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Generate default config as TOML string.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        self.rank.validate()?;
        Strategy::parse(&self.curriculum.strategy)?;
        self.pipeline()?;
        Ok(())
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.resolve(&self.graph.path)
    }

    pub fn records_path(&self) -> PathBuf {
        self.resolve(&self.graph.records)
    }

    pub fn passages_path(&self) -> PathBuf {
        self.resolve(&self.graph.passages)
    }

    pub fn engine(&self) -> CentralityEngine {
        let c = &self.classification;
        CentralityEngine {
            rank: self.rank,
            degree: DegreeThresholds {
                foundation_min_out: c.foundation_min_out,
                capstone_min_in: c.capstone_min_in,
                hub_above: c.hub_above,
            },
            position: PositionThresholds {
                foundation_above: c.foundation_above,
                capstone_below: c.capstone_below,
            },
            top_n: c.top_n,
        }
    }

    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let q = &self.query;
        let mode = match q.mode.trim().to_lowercase().as_str() {
            "sequential" => PipelineMode::Sequential,
            "concurrent" => PipelineMode::Concurrent { cap: q.concurrency },
            other => bail!("Invalid query.mode '{}': expected concurrent or sequential", other),
        };
        Ok(PipelineConfig {
            mode,
            max_sub_questions: q.max_sub_questions,
            top_k: q.top_k,
            retrieval_timeout_secs: q.retrieval_timeout_secs,
            generation_timeout_secs: self.llm.timeout_secs,
            ..PipelineConfig::default()
        })
    }
}

/// Find chemkg.toml in `start` or its parents.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// `~/.config/chemkg/chemkg.toml` or the platform equivalent.
fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chemkg").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back() {
        let text = Config::default_toml().unwrap();
        assert!(text.contains("[curriculum]"));
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.curriculum.min_count, 10);
        assert_eq!(config.curriculum.curated_hubs.len(), 13);
        assert_eq!(config.graph.max_concepts, 200);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            "[query]\nmode = \"sequential\"\n\n[tracer]\nmax_depth = 3\n",
        )
        .unwrap();
        assert_eq!(config.tracer.max_depth, 3);
        assert_eq!(config.pipeline().unwrap().mode, PipelineMode::Sequential);
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.engine().degree.capstone_min_in, 50);
    }

    #[test]
    fn invalid_values_rejected() {
        let config: Config = toml::from_str("[query]\nmode = \"eager\"\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[rank]\ndamping = 1.5\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[curriculum]\nstrategy = \"random\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_concepts_disables_cap() {
        let config: Config = toml::from_str("[graph]\nmax_concepts = 0\n").unwrap();
        assert_eq!(config.graph.build_config().max_concepts, None);
    }

    #[test]
    fn normalizer_min_concept_len_from_file() {
        let config = Config::default();
        assert_eq!(config.graph.build_config().normalizer.min_concept_len, 2);

        let config: Config =
            toml::from_str("[graph.normalizer]\nmin_concept_len = 4\n").unwrap();
        assert_eq!(config.graph.build_config().normalizer.min_concept_len, 4);
    }

    #[test]
    fn find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(find_config_file(&nested), Some(dir.path().join(CONFIG_FILE)));
    }
}
