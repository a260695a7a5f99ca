//! ChemKG Graph Prelude: convenient imports for common usage.
//!
//! ```rust
//! use chemkg_graph::prelude::*;
//! ```

// Store and construction
pub use crate::builder::{BuildConfig, BuildReport, GraphBuilder};
pub use crate::mutual::MutualIndex;
pub use crate::persist::{load_graph, save_graph, GraphFile};
pub use crate::store::{EnablingAdjacency, GraphMetadata, KnowledgeGraph};

// Analytics
pub use crate::centrality::{
    hub_score, mean_degree, propagate_rank, recommend_method, CentralityEngine,
    CentralityReport, DegreeRole, DegreeThresholds, Method, NodeClass, PositionRole,
    PositionThresholds, RankConfig, RankDirection, ScoreTable,
};
pub use crate::community::{detect_communities, Community, CommunityConfig, CommunityResult};

// Sequencing
pub use crate::curriculum::{
    find_checkpoints, Checkpoint, CheckpointConfig, Curriculum, CurriculumEntry,
    CurriculumSequencer, OrderingStrategy, SequencerConfig, Strategy,
};

// Tracing
pub use crate::tracer::{
    LearningPath, PathStep, PathTracer, RankedPrerequisite, StepStatus, Trace, TracerConfig,
};

pub use chemkg_core::prelude::*;
