//! # edgequake-pageloader
//!
//! Load a PDF as a sequence of per-page Markdown documents.
//!
//! ## Why per page?
//!
//! Retrieval pipelines index pages, not books: a citation needs a page number,
//! and a 500-page scan should not have to finish converting before the first
//! page can be embedded. This crate cuts each page into its own temporary
//! single-page PDF, runs it through a conversion engine, and hands back one
//! [`OutputDocument`] per page with its page number attached.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path, permissions, %PDF magic
//!  ├─ 2. Split     page i → temporary single-page PDF (pdfium, spawn_blocking)
//!  ├─ 3. Convert   engine: text layer, or vision-model OCR when needed
//!  ├─ 4. Assemble  structured blocks → Markdown + {page, page_label}
//!  └─ 5. Cleanup   delete the page's temporary PDF before handing it out
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pageloader::{
//!     DocumentLoader, EngineConfig, LoaderOptions, PageLoader, VisionOptions,
//! };
//! use futures::StreamExt;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let loader = PageLoader::vision(
//!         EngineConfig::default(),
//!         VisionOptions::default(),
//!         LoaderOptions::default(),
//!     )?;
//!
//!     let mut pages = loader.lazy_load(Path::new("report.pdf")).await?;
//!     while let Some(page) = pages.next().await {
//!         let page = page?;
//!         println!("--- page {} ---\n{}", page.metadata.page, page.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `pdfpages` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium shared library at compile time |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pageloader = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, EngineConfigBuilder, LoaderOptions, OcrBackend, VisionOptions, VisionOptionsBuilder};
pub use error::{CleanupError, LoaderError};
pub use loader::{DocumentLoader, DocumentStream, PageLoader};
pub use output::{OutputDocument, PageMetadata};
pub use pipeline::document::{DocItem, ListItem, ParseOptions, StructuredDocument};
pub use pipeline::engine::{ConversionEngine, EngineAdapter, EngineError};
pub use pipeline::pdf::{PdfBackend, PdfiumBackend};
pub use pipeline::split::{PageArtifact, PageSplitter, SourceDocument};
pub use pipeline::vision::VisionEngine;
pub use progress::{LoadProgressCallback, NoopProgressCallback, ProgressCallback};
