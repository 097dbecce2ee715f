//! Recognition job lifecycle as an explicit state machine.
//!
//! ```text
//! Submitted ──▶ Pending ──▶ Finished
//!     │  ▲        │  ▲
//!     │  └────────┘  │
//!     └──────────────┴──▶ Failed
//! ```
//!
//! [`JobTracker`] owns the [`OcrJob`], validates every status it is fed,
//! and decides after each poll whether to keep waiting, return the result
//! location, or fail. It performs no I/O and reads no clock: the caller
//! passes `now` in, which keeps every transition deterministic under test.

use crate::error::AuditError;
use crate::output::{JobStatus, OcrJob};
use std::time::{Duration, Instant};

/// What the poll loop should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Sleep one interval and poll again.
    Wait,
    /// The job finished; download from this URL.
    Download(String),
}

/// Tracks one submitted job until it reaches a terminal state or times out.
#[derive(Debug, Clone)]
pub struct JobTracker {
    job: OcrJob,
    started: Instant,
    timeout: Duration,
    polls: u32,
}

impl JobTracker {
    /// Start tracking a job the service has just accepted.
    pub fn new(job: OcrJob, started: Instant, timeout: Duration) -> Self {
        Self {
            job,
            started,
            timeout,
            polls: 0,
        }
    }

    pub fn job(&self) -> &OcrJob {
        &self.job
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.timeout.saturating_sub(now.saturating_duration_since(self.started))
    }

    /// Record the outcome of one poll.
    ///
    /// `update` is `None` when the poll did not mention this job (e.g. it is
    /// not yet in the finished list); the job is then considered pending.
    /// A `Finished` observation wins even if it arrives exactly at the
    /// deadline; otherwise reaching the deadline yields
    /// [`AuditError::Timeout`].
    pub fn observe(
        &mut self,
        update: Option<OcrJob>,
        now: Instant,
    ) -> Result<PollDecision, AuditError> {
        self.polls += 1;

        let next = match update {
            Some(job) => {
                if job.id != self.job.id {
                    return Err(AuditError::Internal(format!(
                        "status for job '{}' delivered to tracker of '{}'",
                        job.id, self.job.id
                    )));
                }
                job
            }
            None => OcrJob {
                status: JobStatus::Pending,
                ..self.job.clone()
            },
        };

        self.transition(next)?;

        if let Some(outcome) = self.settled() {
            return outcome;
        }

        if self.remaining(now).is_zero() {
            return Err(AuditError::Timeout {
                job_id: self.job.id.clone(),
                waited_ms: now.saturating_duration_since(self.started).as_millis() as u64,
                polls: self.polls,
            });
        }
        Ok(PollDecision::Wait)
    }

    /// The final decision for a job in a terminal state, `None` otherwise.
    ///
    /// The submit response may already be terminal, so the poll loop asks
    /// this before its first sleep.
    pub fn settled(&self) -> Option<Result<PollDecision, AuditError>> {
        match self.job.status {
            JobStatus::Finished => Some(match self.job.result_url.clone() {
                Some(url) => Ok(PollDecision::Download(url)),
                None => Err(AuditError::OcrService {
                    job_id: self.job.id.clone(),
                    reason: "job finished without a result URL".into(),
                }),
            }),
            JobStatus::Failed => Some(Err(AuditError::OcrService {
                job_id: self.job.id.clone(),
                reason: self
                    .job
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "service reported failure".into()),
            })),
            JobStatus::Submitted | JobStatus::Pending => None,
        }
    }

    fn transition(&mut self, next: OcrJob) -> Result<(), AuditError> {
        use JobStatus::*;
        let legal = matches!(
            (self.job.status, next.status),
            (Submitted, Submitted | Pending | Finished | Failed)
                | (Pending, Pending | Finished | Failed)
        );
        if !legal {
            return Err(AuditError::Internal(format!(
                "illegal job transition {} → {} for '{}'",
                self.job.status, next.status, self.job.id
            )));
        }
        self.job = next;
        Ok(())
    }
}
