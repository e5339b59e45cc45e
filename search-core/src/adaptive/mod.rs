//! Post-query result improvement (spec C7).

pub mod engine;
pub mod metrics;
pub mod strategy_table;

pub use engine::{AdaptiveEngine, ImproveOutcome, Requery};
pub use metrics::{identify_issues, score_metrics, Issue, ResultMetrics};
