//! Cache efficiency summary and traffic spike detection over a parsed table.

pub mod cache;
pub mod series;
pub mod traffic;

use thiserror::Error;

pub use cache::{summarize_cache, CacheEfficiency, CacheSummary};
pub use traffic::{detect_spike, TrafficSpike};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("insufficient baseline data: need {needed} periods, have {have}")]
    InsufficientBaseline { needed: usize, have: usize },
}
