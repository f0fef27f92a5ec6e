//! Relevance scoring, dropping rules, and boundary retention policy for
//! discovered catalog entries (§4.G), as a pure function over in-memory
//! records — no database or HTTP dependency.

pub mod classify;
pub mod config;
pub mod engine;
pub mod score;
pub mod types;

pub use classify::classify;
pub use config::PruneConfig;
pub use engine::prune;
pub use score::{priority_score, score_components};
pub use types::{
    default_retention_months, Category, DatasetRecord, DroppedRecord, KeptRecord, PruneAnnotation,
    PruneOutput, ScoreComponents,
};
