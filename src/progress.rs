//! Progress-callback trait for pipeline stage and polling events.
//!
//! Inject an [`Arc<dyn AuditProgressCallback>`] via
//! [`crate::config::AuditConfigBuilder::progress_callback`] or
//! [`crate::pipeline::ocr::CloudOcrClient::with_progress`] to observe a run.
//! The CLI uses it to drive a spinner while the OCR job is polled.
//!
//! # Example
//!
//! ```rust
//! use ocr_audit::{AuditProgressCallback, JobStatus};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl AuditProgressCallback for PollCounter {
//!     fn on_poll(&self, _job_id: &str, _attempt: u32, _status: JobStatus) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb: Arc<dyn AuditProgressCallback> = Arc::new(PollCounter(AtomicU32::new(0)));
//! cb.on_poll("job", 1, JobStatus::Pending);
//! ```

use crate::output::JobStatus;
use std::fmt;
use std::sync::Arc;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Render,
    CloudOcr,
    Compare,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fetch => "fetch",
            Stage::Render => "render",
            Stage::CloudOcr => "cloud-ocr",
            Stage::Compare => "compare",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AuditProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the service has accepted the page image.
    fn on_job_submitted(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Called after every status poll.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed poll number
    /// * `status`: status observed on this poll
    fn on_poll(&self, job_id: &str, attempt: u32, status: JobStatus) {
        let _ = (job_id, attempt, status);
    }

    /// Called when a stage completes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AuditProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AuditConfig`].
pub type ProgressCallback = Arc<dyn AuditProgressCallback>;
