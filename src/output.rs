//! Artifacts produced by each pipeline stage.
//!
//! Every value here is created once by one stage and consumed by the next;
//! only [`OcrJob::status`] changes after creation, and only through
//! [`crate::pipeline::ocr::JobTracker`].

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ── Locator ──────────────────────────────────────────────────────────────

/// One hit on an archive's search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Absolute URL of the matching document.
    pub url: String,
    /// Text snippet shown next to the hit, whitespace-collapsed.
    pub context: String,
}

// ── Renderer ─────────────────────────────────────────────────────────────

/// A single page rasterised and text-extracted from a PDF.
///
/// `image` and `baseline_text` are produced by two independent pdfium calls
/// and routinely disagree; that disagreement is what the audit measures.
#[derive(Clone)]
pub struct RenderedPage {
    pub source: PathBuf,
    /// 1-indexed.
    pub page_number: usize,
    pub image: DynamicImage,
    /// Text layer exactly as pdfium returns it, unknown-glyph markers included.
    pub baseline_text: String,
}

impl fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedPage")
            .field("source", &self.source)
            .field("page_number", &self.page_number)
            .field(
                "image",
                &format_args!("{}x{}", self.image.width(), self.image.height()),
            )
            .field("baseline_text_len", &self.baseline_text.len())
            .finish()
    }
}

/// Document-level metadata read without rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

// ── Cloud OCR ────────────────────────────────────────────────────────────

/// Lifecycle of a remote recognition job.
///
/// `Submitted → Pending* → Finished | Failed`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Pending,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Pending => "pending",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A recognition job as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrJob {
    pub id: String,
    pub status: JobStatus,
    /// Download location of the result; present once `Finished`.
    pub result_url: Option<String>,
    /// Service-reported reason when `Failed`.
    pub failure_reason: Option<String>,
}

impl OcrJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            result_url: None,
            failure_reason: None,
        }
    }

    pub fn with_result_url(mut self, url: impl Into<String>) -> Self {
        self.result_url = Some(url.into());
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Downloaded result of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub job_id: String,
    pub text: String,
}

// ── Comparator ───────────────────────────────────────────────────────────

/// Which backend produced the text being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    Baseline,
    CloudOcr,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Baseline => f.write_str("baseline"),
            TextSource::CloudOcr => f.write_str("cloud-ocr"),
        }
    }
}

/// One literal occurrence of the phrase plus its surrounding characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// Byte offset of the match in the source text.
    pub offset: usize,
    pub preceding_context: String,
    pub matched_phrase: String,
    pub following_context: String,
}

/// Every non-overlapping occurrence of a phrase, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub source: TextSource,
    pub phrase: String,
    pub matches: Vec<TextMatch>,
}

impl MatchReport {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Descriptive statistics of a text source, for side-by-side reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProfile {
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    /// U+FFFD replacement characters left by the extractor.
    pub unknown_markers: usize,
    /// Runs like `M e r e d` where spaces were inserted between letters.
    pub spaced_letter_runs: usize,
}

/// Side-by-side comparison of the two text sources for one phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub phrase: String,
    pub baseline: MatchReport,
    pub cloud_ocr: MatchReport,
    pub baseline_profile: TextProfile,
    pub cloud_ocr_profile: TextProfile,
}

// ── Audit ────────────────────────────────────────────────────────────────

/// Result of [`crate::audit::audit_page`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutput {
    pub document: PathBuf,
    pub page_number: usize,
    pub image_path: PathBuf,
    pub baseline_path: PathBuf,
    pub ocr_result_path: PathBuf,
    pub job_id: String,
    pub comparison: ComparisonReport,
    pub stats: AuditStats,
}

/// Wall-clock timings of an audit run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditStats {
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}
