//! Input resolution: turn a document reference into a local PDF path.
//!
//! Located documents are URLs; pdfium needs a file-system path. Downloads
//! land in the caller's work directory and are deliberately *not* cleaned up:
//! when a later stage fails, the PDF stays on disk for inspection.
//! The `%PDF` magic bytes are checked before returning so a search engine's
//! HTML error page surfaces as a clear error rather than a pdfium failure.

use crate::config::LocatorConfig;
use crate::error::AuditError;
use crate::pipeline::locate::build_client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a local PDF.
///
/// URLs are downloaded into `work_dir` with the locator's client identity.
pub async fn resolve_document(
    input: &str,
    work_dir: &Path,
    locator: &LocatorConfig,
) -> Result<PathBuf, AuditError> {
    if is_url(input) {
        download_document(input, work_dir, locator).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<PathBuf, AuditError> {
    let path = PathBuf::from(path_str);

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AuditError::FileNotFound { path });
        }
        Err(e) => {
            return Err(AuditError::Render {
                path,
                detail: format!("cannot open: {e}"),
            });
        }
    };

    use std::io::Read;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(not_a_pdf(path, &magic));
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Download a located document into `work_dir` and return its path.
pub async fn download_document(
    url: &str,
    work_dir: &Path,
    locator: &LocatorConfig,
) -> Result<PathBuf, AuditError> {
    info!("Downloading document from: {}", url);

    let client = build_client(locator)?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuditError::network(url, e))?;

    if !response.status().is_success() {
        return Err(AuditError::Network {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AuditError::network(url, e))?;

    tokio::fs::create_dir_all(work_dir)
        .await
        .map_err(|e| AuditError::OutputWriteFailed {
            path: work_dir.to_path_buf(),
            source: e,
        })?;
    let file_path = work_dir.join(filename_from_url(url));
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| AuditError::OutputWriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    // Kept on disk even when it is not a PDF; it is usually an HTML error page.
    if !bytes.starts_with(b"%PDF") {
        return Err(not_a_pdf(file_path, &bytes[..bytes.len().min(4)]));
    }

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(file_path)
}

fn not_a_pdf(path: PathBuf, magic: &[u8]) -> AuditError {
    AuditError::Render {
        path,
        detail: format!("not a PDF (first bytes: {:?})", String::from_utf8_lossy(magic)),
    }
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
