//! Batch pipelines.
//!
//! Reply pipeline: unread email → card match → classify → route → move.
//! Status pipeline: job card → posting URL → liveness check → move.
//!
//! Both are single-pass and sequential. Per-item failures are logged and
//! counted; only the initial listings can fail a run.

pub mod classifier;
pub mod jobs;
pub mod matcher;
pub mod replies;
pub mod resolver;
pub mod router;
pub mod status;
pub mod types;

pub use classifier::{ReplyClassifier, ReplyLabel};
pub use jobs::{STATUS_CHECK_DELAY, StatusDeps, StatusPipeline, StatusSettings};
pub use replies::{ReplyDeps, ReplyPipeline, ReplySettings};
pub use router::ListRouter;
pub use status::{JobStatus, StatusChecker};
pub use types::{MovedCard, ReplyRunReport, StatusRunReport};
