//! Application use cases

pub mod aggregator;
pub mod pipeline;
pub mod recorder;
pub mod report;
pub mod retry;
pub mod scoring_service;

pub use aggregator::ScoreAggregator;
pub use pipeline::{Pipeline, PipelineError, PipelineSettings, PipelineStats, Work};
pub use recorder::{RecordOutcome, ViolationRecorder};
pub use report::{
    DriverReport, LeaderboardEntry, LeaderboardOrder, Reports, ViolationBreakdown,
    ViolationHistory,
};
pub use retry::{run_blocking, RetryFailure, RetryPolicy};
pub use scoring_service::ScoringService;
