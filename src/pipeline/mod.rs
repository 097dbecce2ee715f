//! Pipeline stages for an OCR quality audit.
//!
//! Each submodule implements exactly one step, and every step is usable on
//! its own (the CLI exposes each as a subcommand).
//!
//! ## Data Flow
//!
//! ```text
//! locate ──▶ input ──▶ render ──▶ encode ──▶ ocr ──▶ compare
//! (search)  (download) (pdfium)   (PNG)   (cloud)   (phrase)
//!                         │                            ▲
//!                         └──── baseline text ─────────┘
//! ```
//!
//! 1. [`locate`]: submit an archive's search form and collect hits
//! 2. [`input`]: turn a hit URL (or a local path) into a local PDF
//! 3. [`render`]: rasterise one page and read its embedded text layer;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]: PNG-encode the page for upload and for the work dir
//! 5. [`ocr`]: submit, poll and download a cloud recognition job
//! 6. [`compare`]: literal phrase matches in both texts, with context

pub mod compare;
pub mod encode;
pub mod input;
pub mod locate;
pub mod ocr;
pub mod render;
