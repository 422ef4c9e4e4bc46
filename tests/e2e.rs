//! End-to-end tests against the real pdfium library.
//!
//! PDFs are generated on the fly with pdfium, so no fixtures are needed, but
//! the library itself must be available (it is downloaded on first use).
//! Gated behind `E2E_ENABLED` so CI without network access skips them.
//! The OCR test additionally needs `OPENAI_API_KEY`.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use edgequake_pageloader::pipeline::split::ARTIFACT_PREFIX;
use edgequake_pageloader::{
    DocumentLoader, EngineConfig, LoaderError, LoaderOptions, OutputDocument, PageLoader,
    PdfBackend, PdfiumBackend, VisionOptions,
};
use futures::StreamExt;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// Write a PDF with one text line per entry of `lines`, one page each.
fn make_pdf(path: &Path, lines: &[&str]) {
    let pdfium = pdfium_auto::bind_pdfium_silent().expect("pdfium available");
    let mut document = pdfium.create_new_pdf().expect("new pdf");
    let font = document.fonts_mut().helvetica();

    for line in lines {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .expect("new page");
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(720.0),
                line,
                font,
                PdfPoints::new(14.0),
            )
            .expect("text object");
    }
    document.save_to_file(path).expect("save pdf");
}

fn artifact_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(ARTIFACT_PREFIX))
        .count()
}

const LINES: [&str; 3] = [
    "Alpha page carries the opening remarks of the report.",
    "Beta page lists the quarterly revenue figures in detail.",
    "Gamma page closes with the outlook for next year.",
];

fn text_only_config() -> EngineConfig {
    EngineConfig::builder()
        .ocr_enabled(false)
        .force_full_page_ocr(false)
        .build()
        .unwrap()
}

fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("report.pdf");
    make_pdf(&source, &LINES);
    let temp = root.path().join("artifacts");
    std::fs::create_dir(&temp).unwrap();
    (root, source, temp)
}

// ── Backend ──────────────────────────────────────────────────────────────────

#[test]
fn pdfium_backend_counts_and_extracts_pages() {
    e2e_skip_unless_enabled!();
    let (root, source, _temp) = setup();
    let backend = PdfiumBackend::new();

    assert_eq!(backend.page_count(&source, None).unwrap(), 3);

    let single = root.path().join("second.pdf");
    backend.extract_page_range(&source, None, 1..=1, &single).unwrap();
    assert_eq!(backend.page_count(&single, None).unwrap(), 1);

    let err = backend
        .extract_page_range(&source, None, 5..=5, &root.path().join("nope.pdf"))
        .unwrap_err();
    assert!(matches!(err, LoaderError::PageExtractionFailed { page: 6, .. }));
}

#[test]
fn truncated_pdf_is_reported_as_corrupt() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let broken = root.path().join("broken.pdf");
    std::fs::write(&broken, b"%PDF-1.7\n1 0 obj\n<<").unwrap();

    let err = PdfiumBackend::new().page_count(&broken, None).unwrap_err();
    assert!(matches!(err, LoaderError::CorruptPdf { .. }), "got: {err}");
}

// ── Text-layer loading ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn text_layer_load_in_both_modes() {
    e2e_skip_unless_enabled!();
    let (_root, source, temp) = setup();
    let loader = PageLoader::vision(
        text_only_config(),
        VisionOptions::default(),
        LoaderOptions::default().temp_dir(&temp),
    )
    .unwrap();

    let eager = loader.load(&source).await.unwrap();
    assert_eq!(eager.len(), 3);
    for (doc, line) in eager.iter().zip(LINES) {
        println!("--- page {} ---\n{}", doc.metadata.page, doc.content);
        assert!(doc.content.contains(line), "page {} missing {line:?}", doc.metadata.page);
    }

    let lazy: Vec<OutputDocument> = loader
        .lazy_load(&source)
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(eager, lazy);
    assert_eq!(artifact_count(&temp), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn inspect_reports_page_count() {
    e2e_skip_unless_enabled!();
    let (_root, source, temp) = setup();
    let loader = PageLoader::vision(
        text_only_config(),
        VisionOptions::default(),
        LoaderOptions::default().temp_dir(&temp),
    )
    .unwrap();

    let doc = loader.inspect(&source).await.unwrap();
    assert_eq!(doc.page_count, 3);
}

// ── OCR ──────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn forced_ocr_reads_the_rendered_page() {
    e2e_skip_unless_enabled!();
    if std::env::var("OPENAI_API_KEY").is_err() {
        println!("SKIP: OPENAI_API_KEY not set");
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("one.pdf");
    make_pdf(&source, &["Invoice number 4471 is due on the first of March."]);

    let loader = PageLoader::vision(
        EngineConfig::default(),
        VisionOptions::default(),
        LoaderOptions::default().temp_dir(root.path()),
    )
    .unwrap();

    let docs = loader.load(&source).await.unwrap();
    assert_eq!(docs.len(), 1);
    println!("{}", docs[0].content);
    assert!(docs[0].content.contains("4471"));
    assert!(!docs[0].content.starts_with("```"));
    assert_eq!(artifact_count(root.path()), 0);
}
