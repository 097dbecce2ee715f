//! # ocr-audit
//!
//! Measure how badly a digitised newspaper archive's OCR mangles a known
//! phrase, and whether a commercial cloud OCR service does better.
//!
//! ## Why this crate?
//!
//! Archive PDFs carry an embedded text layer produced by the archive's own,
//! often decades-old OCR. Names come out as `M e r e d i t h`, letters become
//! `\u{FFFD}`, and full-text search silently misses them. This crate takes
//! one scanned page, sends its image to a cloud OCR service, and counts
//! exact occurrences of a target phrase in both texts side by side.
//!
//! ## Pipeline Overview
//!
//! ```text
//! archive search form
//!  │
//!  ├─ 1. Locate   submit the form, scrape result links + snippets
//!  ├─ 2. Input    download the chosen PDF into the work dir
//!  ├─ 3. Render   rasterise one page via pdfium (spawn_blocking) + text layer
//!  ├─ 4. Encode   PNG, saved next to the baseline text
//!  ├─ 5. OCR      submit → poll (bounded) → download
//!  └─ 6. Compare  literal phrase matches with fixed-width context
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_audit::{audit_page, AuditConfig, CloudOcrClient, CloudOcrConfig, LocatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from CLOUD_OCR_APPLICATION_ID / CLOUD_OCR_SECRET
//!     let ocr = CloudOcrClient::http(CloudOcrConfig::from_env()?)?;
//!     let config = AuditConfig::builder()
//!         .phrase("James Meredith")
//!         .page(1)
//!         .build()?;
//!     let out = audit_page("scan.pdf", &config, &ocr, &LocatorConfig::default()).await?;
//!     println!(
//!         "baseline: {} match(es), cloud OCR: {} match(es)",
//!         out.comparison.baseline.len(),
//!         out.comparison.cloud_ocr.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-audit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr-audit = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{audit_page, inspect};
pub use config::{
    AuditConfig, AuditConfigBuilder, CloudOcrConfig, CloudOcrConfigBuilder, CloudOcrOption,
    CompletionCheck, ExportFormat, LocatorConfig, SearchQuery,
};
pub use error::AuditError;
pub use output::{
    AuditOutput, AuditStats, ComparisonReport, DocumentMetadata, JobStatus, MatchReport, OcrJob,
    RecognizedText, RenderedPage, SearchResult, TextMatch, TextProfile, TextSource,
};
pub use pipeline::compare::{compare_sources, find_matches};
pub use pipeline::locate::locate;
pub use pipeline::ocr::CloudOcrClient;
pub use progress::{AuditProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
