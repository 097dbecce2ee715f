//! End-to-end audit of a single page.
//!
//! [`audit_page`] runs the forward data flow once:
//!
//! ```text
//! resolve ──▶ render ──▶ save PNG + baseline ──▶ cloud OCR ──▶ save result ──▶ compare
//! ```
//!
//! Every artifact is written into `AuditConfig::work_dir` as soon as it
//! exists, so a run that fails at the OCR step still leaves the downloaded
//! PDF, the page image and the embedded text on disk.

use crate::config::{AuditConfig, ExportFormat, LocatorConfig};
use crate::error::AuditError;
use crate::output::{AuditOutput, AuditStats, DocumentMetadata};
use crate::pipeline::ocr::CloudOcrClient;
use crate::pipeline::{compare, encode, input, render};
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// File names of the artifacts written for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub image: PathBuf,
    pub baseline: PathBuf,
    pub ocr_result: PathBuf,
}

impl ArtifactPaths {
    pub fn new(work_dir: &Path, page: usize, format: ExportFormat) -> Self {
        Self {
            image: work_dir.join(format!("page-{page}.png")),
            baseline: work_dir.join(format!("page-{page}.baseline.txt")),
            ocr_result: work_dir.join(format!("page-{page}.ocr.{}", format.extension())),
        }
    }
}

/// Audit one page of `document` (a local path or a URL).
///
/// # Errors
/// - [`AuditError::Configuration`] if the OCR client is set to export XML;
///   the comparison needs plain text. Checked before any I/O.
/// - Any error of the underlying stages, unchanged.
pub async fn audit_page(
    document: &str,
    config: &AuditConfig,
    ocr: &CloudOcrClient,
    locator: &LocatorConfig,
) -> Result<AuditOutput, AuditError> {
    if ocr.config().export_format != ExportFormat::Txt {
        return Err(AuditError::Configuration(
            "phrase comparison needs plain-text OCR output (export format txt)".into(),
        ));
    }

    let total_start = Instant::now();
    let cb = config.progress_callback.as_ref();
    info!("Auditing page {} of {}", config.page, document);

    // ── Step 1: Resolve document ─────────────────────────────────────────
    let stage_start = Instant::now();
    if let Some(c) = cb {
        c.on_stage_start(Stage::Fetch);
    }
    let download_locator = LocatorConfig {
        request_timeout_secs: config.download_timeout_secs,
        ..locator.clone()
    };
    let pdf_path = input::resolve_document(document, &config.work_dir, &download_locator).await?;
    if let Some(c) = cb {
        c.on_stage_complete(Stage::Fetch, elapsed_ms(stage_start));
    }

    // ── Step 2: Render page and save artifacts ───────────────────────────
    let stage_start = Instant::now();
    if let Some(c) = cb {
        c.on_stage_start(Stage::Render);
    }
    let page = render::render_page(
        &pdf_path,
        config.page,
        config.max_rendered_pixels,
        config.password.as_deref(),
    )
    .await?;

    let paths = ArtifactPaths::new(&config.work_dir, config.page, ocr.config().export_format);
    let png = encode::encode_png(&page.image).map_err(|e| AuditError::Render {
        path: pdf_path.clone(),
        detail: format!("PNG encoding failed: {e}"),
    })?;
    encode::save_png(&png, &paths.image).await?;
    write_text(&paths.baseline, &page.baseline_text).await?;
    let render_duration_ms = elapsed_ms(stage_start);
    if let Some(c) = cb {
        c.on_stage_complete(Stage::Render, render_duration_ms);
    }

    // ── Step 3: Cloud OCR ────────────────────────────────────────────────
    let stage_start = Instant::now();
    if let Some(c) = cb {
        c.on_stage_start(Stage::CloudOcr);
    }
    let recognized = match cb {
        Some(c) => ocr.recognize_with(&png, c.as_ref()).await?,
        None => ocr.recognize(&png).await?,
    };
    write_text(&paths.ocr_result, &recognized.text).await?;
    let ocr_duration_ms = elapsed_ms(stage_start);
    if let Some(c) = cb {
        c.on_stage_complete(Stage::CloudOcr, ocr_duration_ms);
    }

    // ── Step 4: Compare ──────────────────────────────────────────────────
    let stage_start = Instant::now();
    if let Some(c) = cb {
        c.on_stage_start(Stage::Compare);
    }
    let comparison = compare::compare_sources(
        &page.baseline_text,
        &recognized.text,
        &config.phrase,
        config.context_window,
    );
    if let Some(c) = cb {
        c.on_stage_complete(Stage::Compare, elapsed_ms(stage_start));
    }

    info!(
        "'{}': {} baseline match(es), {} cloud OCR match(es)",
        config.phrase,
        comparison.baseline.len(),
        comparison.cloud_ocr.len()
    );

    Ok(AuditOutput {
        document: pdf_path,
        page_number: config.page,
        image_path: paths.image,
        baseline_path: paths.baseline,
        ocr_result_path: paths.ocr_result,
        job_id: recognized.job_id,
        comparison,
        stats: AuditStats {
            render_duration_ms,
            ocr_duration_ms,
            total_duration_ms: elapsed_ms(total_start),
        },
    })
}

/// Read document metadata without rendering or OCR.
///
/// Needs no cloud credentials. URL inputs are downloaded into `work_dir`.
pub async fn inspect(
    document: &str,
    work_dir: &Path,
    locator: &LocatorConfig,
) -> Result<DocumentMetadata, AuditError> {
    let pdf_path = input::resolve_document(document, work_dir, locator).await?;
    render::extract_metadata(&pdf_path, None).await
}

/// Write a text artifact, creating the parent directory.
pub async fn write_text(path: &Path, text: &str) -> Result<(), AuditError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AuditError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| AuditError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
