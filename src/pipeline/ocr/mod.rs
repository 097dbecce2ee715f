//! Cloud OCR Client: submit a page image, poll until done, fetch the text.
//!
//! ## Lifecycle
//!
//! ```text
//! submit ──▶ sleep(interval) ──▶ poll ──▶ JobTracker::observe
//!                  ▲                            │
//!                  └────────── Wait ────────────┤
//!                                               ├─ Download(url) ──▶ download
//!                                               └─ Err(Timeout | OcrService)
//! ```
//!
//! Credentials are validated before anything touches the network. The wait
//! is bounded by `timeout_ms`; a failed job is reported at once and never
//! resubmitted. A job that is already terminal in the submit response is
//! settled before the first sleep. Completion is detected either from the job's own status or
//! by finding *this* job id in the account's finished list, so unrelated
//! jobs on the same account never satisfy the wait.
//!
//! Time and transport are injected ([`Clock`], [`OcrTransport`]), so the
//! whole loop is testable without a network or real sleeps.

pub mod clock;
pub mod job;
pub mod transport;

pub use clock::{Clock, ManualClock, TokioClock};
pub use job::{JobTracker, PollDecision};
pub use transport::{HttpTransport, OcrTransport};

use crate::config::{CloudOcrConfig, CompletionCheck};
use crate::error::AuditError;
use crate::output::{JobStatus, OcrJob, RecognizedText};
use crate::progress::{AuditProgressCallback, NoopProgressCallback, ProgressCallback};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for one cloud OCR account.
pub struct CloudOcrClient {
    config: CloudOcrConfig,
    transport: Arc<dyn OcrTransport>,
    clock: Arc<dyn Clock>,
    progress: ProgressCallback,
}

impl std::fmt::Debug for CloudOcrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudOcrClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CloudOcrClient {
    /// Create a client over an explicit transport and clock.
    ///
    /// Fails with [`AuditError::Configuration`] when credentials are missing
    /// or a bound is zero; no transport call has been made at that point.
    pub fn new(
        config: CloudOcrConfig,
        transport: Arc<dyn OcrTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuditError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            clock,
            progress: Arc::new(NoopProgressCallback),
        })
    }

    /// Create a client that talks HTTP to `config.endpoint` in real time.
    pub fn http(config: CloudOcrConfig) -> Result<Self, AuditError> {
        let transport = HttpTransport::new(&config)?;
        Self::new(config, Arc::new(transport), Arc::new(TokioClock))
    }

    /// Report submission and every poll to `progress`.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CloudOcrConfig {
        &self.config
    }

    /// Upload `png` and wait for its recognised text.
    pub async fn recognize(&self, png: &[u8]) -> Result<RecognizedText, AuditError> {
        self.recognize_with(png, self.progress.as_ref()).await
    }

    /// [`recognize`](Self::recognize), reporting to `progress` instead of
    /// the client's own callback.
    pub async fn recognize_with(
        &self,
        png: &[u8],
        progress: &dyn AuditProgressCallback,
    ) -> Result<RecognizedText, AuditError> {
        let job = self.submit_reporting(png, progress).await?;
        let result_url = self.wait_reporting(job.clone(), progress).await?;
        let text = self.transport.download(&result_url).await?;
        info!(
            "OCR job {} downloaded: {} chars",
            job.id,
            text.chars().count()
        );
        Ok(RecognizedText {
            job_id: job.id,
            text,
        })
    }

    /// Upload `png` and register a recognition job.
    pub async fn submit(&self, png: &[u8]) -> Result<OcrJob, AuditError> {
        self.submit_reporting(png, self.progress.as_ref()).await
    }

    /// Poll `job` until it finishes, fails, or the timeout elapses.
    ///
    /// Returns the result URL of the finished job.
    pub async fn wait_for(&self, job: OcrJob) -> Result<String, AuditError> {
        self.wait_reporting(job, self.progress.as_ref()).await
    }

    async fn submit_reporting(
        &self,
        png: &[u8],
        progress: &dyn AuditProgressCallback,
    ) -> Result<OcrJob, AuditError> {
        let job = self
            .transport
            .submit(png, &self.config.language, self.config.export_format)
            .await?;
        info!(
            "OCR job {} submitted ({} bytes, {}, {})",
            job.id,
            png.len(),
            self.config.language,
            self.config.export_format.as_param()
        );
        progress.on_job_submitted(&job.id);
        Ok(job)
    }

    async fn wait_reporting(
        &self,
        job: OcrJob,
        progress: &dyn AuditProgressCallback,
    ) -> Result<String, AuditError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let job_id = job.id.clone();
        let mut tracker = JobTracker::new(job, self.clock.now(), timeout);

        match tracker.settled() {
            Some(Ok(PollDecision::Download(url))) => {
                info!("OCR job {} finished at submission", job_id);
                return Ok(url);
            }
            Some(Ok(PollDecision::Wait)) | None => {}
            Some(Err(e)) => {
                warn!("OCR job {} stopped at submission: {}", job_id, e);
                return Err(e);
            }
        }

        loop {
            let pause = interval.min(tracker.remaining(self.clock.now()));
            self.clock.sleep(pause).await;

            let update = self.poll(&job_id).await?;
            let observed = update.as_ref().map_or(JobStatus::Pending, |j| j.status);
            progress.on_poll(&job_id, tracker.polls() + 1, observed);
            debug!("OCR job {} poll {}: {}", job_id, tracker.polls() + 1, observed);

            match tracker.observe(update, self.clock.now()) {
                Ok(PollDecision::Wait) => continue,
                Ok(PollDecision::Download(url)) => {
                    info!("OCR job {} finished after {} polls", job_id, tracker.polls());
                    return Ok(url);
                }
                Err(e) => {
                    warn!("OCR job {} stopped: {}", job_id, e);
                    return Err(e);
                }
            }
        }
    }

    async fn poll(&self, job_id: &str) -> Result<Option<OcrJob>, AuditError> {
        match self.config.completion_check {
            CompletionCheck::TaskStatus => self.transport.job_status(job_id).await.map(Some),
            CompletionCheck::FinishedTaskList => {
                let finished = self.transport.list_finished().await?;
                let mut hits: Vec<OcrJob> =
                    finished.into_iter().filter(|j| j.id == job_id).collect();
                match hits.len() {
                    0 | 1 => Ok(hits.pop()),
                    n => Err(AuditError::Parse {
                        url: format!("{}/listFinishedTasks", self.config.endpoint),
                        detail: format!("job '{job_id}' listed {n} times"),
                    }),
                }
            }
        }
    }
}
