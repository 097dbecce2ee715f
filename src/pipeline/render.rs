//! Page Renderer: rasterise one PDF page and read its text layer via pdfium.
//!
//! Rendering and text extraction are two separate pdfium calls against the
//! same loaded document. Their outputs are returned side by side and never
//! reconciled: the text layer is whatever the archive's own OCR embedded,
//! unknown-glyph markers and all.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; every call runs on
//! Tokio's blocking pool so the async workers never stall on rendering.

use crate::error::AuditError;
use crate::output::{DocumentMetadata, RenderedPage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Check a 1-indexed page number against the document's page count.
///
/// Returns the 0-indexed page.
pub fn page_index(page_number: usize, total: usize) -> Result<usize, AuditError> {
    if page_number == 0 || page_number > total {
        return Err(AuditError::PageOutOfRange {
            page: page_number,
            total,
        });
    }
    Ok(page_number - 1)
}

/// Render `page_number` (1-indexed) to an image and extract its text layer.
///
/// `max_pixels` caps the longest edge of the rendered image.
pub async fn render_page(
    pdf_path: &Path,
    page_number: usize,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<RenderedPage, AuditError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        render_page_blocking(&path, page_number, max_pixels, pwd.as_deref())
    })
    .await
    .map_err(|e| AuditError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_page_blocking(
    pdf_path: &Path,
    page_number: usize,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<RenderedPage, AuditError> {
    ensure_exists(pdf_path)?;
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let idx = page_index(page_number, total_pages)?;
    info!("PDF loaded: {} pages, rendering page {}", total_pages, page_number);

    let page = pages
        .get(idx as u16)
        .map_err(|e| render_error(pdf_path, page_number, e))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let image = page
        .render_with_config(&render_config)
        .map_err(|e| render_error(pdf_path, page_number, e))?
        .as_image();

    let baseline_text = page
        .text()
        .map_err(|e| render_error(pdf_path, page_number, e))?
        .all();

    debug!(
        "Rendered page {} → {}x{} px, {} chars of embedded text",
        page_number,
        image.width(),
        image.height(),
        baseline_text.chars().count()
    );

    Ok(RenderedPage {
        source: pdf_path.to_path_buf(),
        page_number,
        image,
        baseline_text,
    })
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, AuditError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| AuditError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, AuditError> {
    ensure_exists(pdf_path)?;
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library search path.
fn bind_pdfium() -> Result<Pdfium, AuditError> {
    let explicit = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let bindings = match explicit {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| AuditError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Checked before binding so a missing file never surfaces as a pdfium error.
fn ensure_exists(pdf_path: &Path) -> Result<(), AuditError> {
    if !pdf_path.exists() {
        return Err(AuditError::FileNotFound {
            path: pdf_path.to_path_buf(),
        });
    }
    Ok(())
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, AuditError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| AuditError::Render {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}

fn render_error(path: &Path, page_number: usize, err: PdfiumError) -> AuditError {
    AuditError::Render {
        path: path.to_path_buf(),
        detail: format!("page {page_number}: {err:?}"),
    }
}
