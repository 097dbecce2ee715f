//! End-to-end tests that need pdfium and a real scanned PDF.
//!
//! Gated behind `OCR_AUDIT_TEST_PDF` (path to any PDF with at least one page)
//! so they do not run in CI unless explicitly requested. Cloud OCR is played
//! by a loopback fake, so no credentials are needed.
//!
//! Run with:
//!   OCR_AUDIT_TEST_PDF=scan.pdf PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture

mod common;

use common::{serve, Response};
use ocr_audit::pipeline::ocr::{HttpTransport, ManualClock};
use ocr_audit::pipeline::render::render_page;
use ocr_audit::{
    audit_page, inspect, AuditConfig, AuditError, AuditProgressCallback, CloudOcrClient,
    CloudOcrConfig, JobStatus, LocatorConfig, NoopProgressCallback, Stage,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Skip this test unless `OCR_AUDIT_TEST_PDF` names an existing file.
macro_rules! pdf_skip_unless_ready {
    () => {{
        let Ok(p) = std::env::var("OCR_AUDIT_TEST_PDF") else {
            println!("SKIP: set OCR_AUDIT_TEST_PDF=/path/to/scan.pdf to run e2e tests");
            return;
        };
        let p = PathBuf::from(p);
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn as_str(p: &Path) -> &str {
    p.to_str().expect("test path is UTF-8")
}

// ── Inspect / render (pdfium only) ───────────────────────────────────────────

#[tokio::test]
async fn test_inspect_reports_pages() {
    let pdf = pdf_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let meta = inspect(as_str(&pdf), dir.path(), &LocatorConfig::default())
        .await
        .expect("inspect() should succeed");
    assert!(meta.page_count >= 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_render_first_page() {
    let pdf = pdf_skip_unless_ready!();
    let page = render_page(&pdf, 1, 1200, None)
        .await
        .expect("page 1 should render");
    assert_eq!(page.page_number, 1);
    assert!(page.image.width() > 0 && page.image.height() > 0);
    assert!(page.image.width().max(page.image.height()) <= 1200);
    println!(
        "Rendered {}x{}, {} chars of embedded text",
        page.image.width(),
        page.image.height(),
        page.baseline_text.chars().count()
    );
}

#[test]
fn test_render_out_of_range_pages() {
    let pdf = pdf_skip_unless_ready!();
    let total = tokio_test::block_on(ocr_audit::pipeline::render::extract_metadata(&pdf, None))
        .expect("metadata")
        .page_count;

    for page in [0, total + 1] {
        let err = tokio_test::block_on(render_page(&pdf, page, 800, None)).unwrap_err();
        match err {
            AuditError::PageOutOfRange { page: p, total: t } => {
                assert_eq!(p, page);
                assert_eq!(t, total);
            }
            other => panic!("expected PageOutOfRange for page {page}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_corrupt_pdf_is_render_error() {
    let _ = pdf_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.pdf");
    std::fs::write(&path, b"%PDF-1.4\nthis is not really a pdf\n").unwrap();
    let err = render_page(&path, 1, 800, None).await.unwrap_err();
    assert!(matches!(err, AuditError::Render { .. }), "got {err:?}");
}

// ── Full audit with a fake cloud OCR service ─────────────────────────────────

#[derive(Default)]
struct StageLog(Mutex<Vec<String>>);

impl AuditProgressCallback for StageLog {
    fn on_stage_start(&self, stage: Stage) {
        self.0.lock().unwrap().push(format!("start {stage}"));
    }
    fn on_job_submitted(&self, job_id: &str) {
        self.0.lock().unwrap().push(format!("submitted {job_id}"));
    }
    fn on_poll(&self, _job_id: &str, attempt: u32, status: JobStatus) {
        self.0.lock().unwrap().push(format!("poll {attempt} {status}"));
    }
    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.0.lock().unwrap().push(format!("done {stage}"));
    }
}

#[tokio::test]
async fn test_audit_page_writes_artifacts_and_compares() {
    let pdf = pdf_skip_unless_ready!();
    let server = serve(|req, base| match req.path() {
        "/processImage" => Response::xml(r#"<response><task id="e2e" status="Queued"/></response>"#),
        "/getTaskStatus" => Response::xml(format!(
            r#"<response><task id="e2e" status="Completed" resultUrl="{base}/r/e2e.txt"/></response>"#
        )),
        "/r/e2e.txt" => Response::bytes(
            "text/plain",
            b"Federal marshals escorted James Meredith on Monday.".to_vec(),
        ),
        _ => Response::not_found(),
    })
    .await;

    let ocr_config = CloudOcrConfig::builder()
        .application_id("app")
        .secret("secret")
        .endpoint(server.base.clone())
        .build()
        .unwrap();
    let transport = HttpTransport::new(&ocr_config).unwrap();
    let ocr = CloudOcrClient::new(ocr_config, Arc::new(transport), Arc::new(ManualClock::new()))
        .unwrap()
        .with_progress(Arc::new(NoopProgressCallback));

    let dir = tempfile::tempdir().unwrap();
    let stages = Arc::new(StageLog::default());
    let config = AuditConfig::builder()
        .page(1)
        .phrase("James Meredith")
        .work_dir(dir.path())
        .max_rendered_pixels(1000)
        .progress_callback(stages.clone())
        .build()
        .unwrap();

    let out = audit_page(as_str(&pdf), &config, &ocr, &LocatorConfig::default())
        .await
        .expect("audit should succeed");

    assert_eq!(out.job_id, "e2e");
    assert_eq!(out.comparison.cloud_ocr.len(), 1);
    assert_eq!(out.image_path, dir.path().join("page-1.png"));
    assert!(std::fs::read(&out.image_path).unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
    assert!(out.baseline_path.exists());
    assert_eq!(
        std::fs::read_to_string(&out.ocr_result_path).unwrap(),
        "Federal marshals escorted James Meredith on Monday."
    );
    assert_eq!(
        *stages.0.lock().unwrap(),
        [
            "start fetch",
            "done fetch",
            "start render",
            "done render",
            "start cloud-ocr",
            "submitted e2e",
            "poll 1 finished",
            "done cloud-ocr",
            "start compare",
            "done compare",
        ]
    );

    println!(
        "baseline: {} match(es), cloud OCR: {} match(es)",
        out.comparison.baseline.len(),
        out.comparison.cloud_ocr.len()
    );
}

#[test]
fn test_callbacks_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<StageLog>();
    assert_send_sync::<CloudOcrClient>();
}
