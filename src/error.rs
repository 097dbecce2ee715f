//! Error type for the ocr-audit library.
//!
//! Every stage of the pipeline fails fast: nothing is retried and there is no
//! degraded mode. A single [`AuditError`] enum therefore covers the whole
//! taxonomy, and callers see the first failure exactly as it happened.
//! Artifacts written before the failure (a downloaded PDF, a rendered PNG)
//! are left on disk for manual inspection.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the ocr-audit library.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Network ───────────────────────────────────────────────────────────
    /// An HTTP call failed or returned a non-success status.
    #[error("Request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    // ── Page structure ────────────────────────────────────────────────────
    /// The expected structure was not found in a fetched page or response.
    #[error("Unexpected response structure from '{url}': {detail}")]
    Parse { url: String, detail: String },

    // ── Documents ─────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Requested page is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The document is corrupt, not a PDF, or pdfium failed on it.
    #[error("Cannot render '{path}': {detail}")]
    Render { path: PathBuf, detail: String },

    // ── Cloud OCR ─────────────────────────────────────────────────────────
    /// The recognition job did not finish within the configured bound.
    #[error("OCR job '{job_id}' did not finish within {waited_ms}ms ({polls} polls)\nIncrease --timeout-ms or check the service dashboard.")]
    Timeout {
        job_id: String,
        waited_ms: u64,
        polls: u32,
    },

    /// The service reported the job as failed.
    #[error("OCR job '{job_id}' failed: {reason}")]
    OcrService { job_id: String, reason: String },

    // ── Config ────────────────────────────────────────────────────────────
    /// Missing credentials or an invalid option value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not create or write an artifact.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Build a [`AuditError::Network`] from a reqwest error.
    pub(crate) fn network(url: &str, err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            format!("timed out ({err})")
        } else {
            err.to_string()
        };
        AuditError::Network {
            url: url.to_string(),
            reason,
        }
    }
}
