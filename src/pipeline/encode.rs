//! Image encoding: `DynamicImage` → PNG bytes for upload and for the work dir.
//!
//! PNG is lossless; JPEG artefacts around small newspaper type measurably
//! hurt recognition, so the page goes to the service exactly as rendered.

use crate::error::AuditError;
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode a rendered page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Write already-encoded PNG bytes to `path`, creating parent directories.
pub async fn save_png(png: &[u8], path: &Path) -> Result<(), AuditError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AuditError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    tokio::fs::write(path, png)
        .await
        .map_err(|e| AuditError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let png = encode_png(&img).expect("encode should succeed");
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let decoded = image::load_from_memory(&png).expect("valid png");
        assert_eq!(decoded.width(), 10);
    }

    #[tokio::test]
    async fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/page-1.png");
        save_png(b"\x89PNG", &path).await.unwrap();
        assert!(path.exists());
    }
}
