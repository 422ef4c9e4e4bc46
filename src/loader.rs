//! The document-loader facade: one [`OutputDocument`] per source page.
//!
//! ## Two modes, one per-page step
//!
//! [`DocumentLoader::load`] splits every page up front and converts them in
//! order, returning the whole list. [`DocumentLoader::lazy_load`] returns a
//! stream that splits page *i* only when the consumer asks for it. Both run
//! every page through the same private step (convert → assemble → delete
//! artifact), so for the same source and engine they produce identical
//! documents.
//!
//! ## Temporary storage
//!
//! A page artifact is deleted before its document is handed out, whether
//! conversion succeeded or not. When `load` fails at page *k* the artifacts
//! of pages after *k* are deleted before the error is returned. When a lazy
//! stream is dropped early no further pages are split, and an artifact caught
//! mid-conversion is removed by its destructor.
//!
//! ## Failure
//!
//! The first failing page ends the load. `load` returns the error and no
//! documents; a lazy stream yields the documents before the failing page,
//! then the error, then ends. Retrying is the caller's decision.

use crate::config::{EngineConfig, LoaderOptions, VisionOptions};
use crate::error::LoaderError;
use crate::output::OutputDocument;
use crate::pipeline::assemble::assemble;
use crate::pipeline::engine::{ConversionEngine, EngineAdapter};
use crate::pipeline::pdf::{PdfBackend, PdfiumBackend};
use crate::pipeline::split::{cleanup_all, PageArtifact, PageSplitter, SourceDocument};
use crate::pipeline::vision::VisionEngine;
use crate::progress::ProgressCallback;
use futures::stream;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A stream of page documents, in ascending page order.
pub type DocumentStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OutputDocument, LoaderError>> + Send + 'a>>;

/// Loads a PDF as a sequence of per-page documents.
pub trait DocumentLoader {
    /// Convert every page and return the documents in page order.
    fn load(
        &self,
        source: &Path,
    ) -> impl Future<Output = Result<Vec<OutputDocument>, LoaderError>> + Send;

    /// Open the source and return a stream that converts pages on demand.
    ///
    /// Source-read failures (missing, unreadable, not a PDF, encrypted) are
    /// returned here, before any stream exists.
    fn lazy_load(
        &self,
        source: &Path,
    ) -> impl Future<Output = Result<DocumentStream<'_>, LoaderError>> + Send;
}

/// Per-page loader over a conversion engine.
///
/// The engine adapter may be shared between loaders; its internal gate keeps
/// engine calls one at a time.
pub struct PageLoader<E> {
    splitter: PageSplitter,
    adapter: Arc<EngineAdapter<E>>,
    progress: Option<ProgressCallback>,
}

impl<E> std::fmt::Debug for PageLoader<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLoader")
            .field("temp_dir", &self.splitter.temp_dir())
            .field("progress", &self.progress.as_ref().map(|_| "<dyn LoadProgressCallback>"))
            .finish()
    }
}

impl PageLoader<VisionEngine> {
    /// Loader over the built-in vision engine, splitting with pdfium.
    pub fn vision(
        config: EngineConfig,
        vision: VisionOptions,
        options: LoaderOptions,
    ) -> Result<Self, LoaderError> {
        let adapter = EngineAdapter::vision(config, vision)?;
        Ok(Self::new(Arc::new(adapter), options))
    }
}

impl<E: ConversionEngine> PageLoader<E> {
    /// Loader that splits pages with pdfium.
    pub fn new(adapter: Arc<EngineAdapter<E>>, options: LoaderOptions) -> Self {
        Self::with_backend(Arc::new(PdfiumBackend::new()), adapter, options)
    }

    /// Loader with an explicit PDF backend.
    pub fn with_backend(
        backend: Arc<dyn PdfBackend>,
        adapter: Arc<EngineAdapter<E>>,
        options: LoaderOptions,
    ) -> Self {
        let LoaderOptions {
            temp_dir,
            password,
            progress_callback,
        } = options;
        Self {
            splitter: PageSplitter::new(backend, temp_dir, password),
            adapter,
            progress: progress_callback,
        }
    }

    pub fn adapter(&self) -> &Arc<EngineAdapter<E>> {
        &self.adapter
    }

    /// Open `source` without converting anything.
    pub async fn inspect(&self, source: &Path) -> Result<SourceDocument, LoaderError> {
        self.splitter.open(source).await
    }

    async fn open(&self, source: &Path) -> Result<SourceDocument, LoaderError> {
        info!("Loading {}", source.display());
        let document = self.splitter.open(source).await?;
        if let Some(ref cb) = self.progress {
            cb.on_load_start(document.page_count);
        }
        Ok(document)
    }

    /// Convert, assemble, and delete one artifact.
    async fn process_page(
        &self,
        artifact: PageArtifact,
        total_pages: usize,
    ) -> Result<OutputDocument, LoaderError> {
        let page = artifact.page_number();
        let start = Instant::now();
        if let Some(ref cb) = self.progress {
            cb.on_page_start(page, total_pages);
        }

        let result = match self.adapter.convert(&artifact).await {
            Ok(document) => assemble(&document, page, artifact.page_label()),
            Err(e) => Err(e),
        };
        artifact.cleanup_logged();

        match &result {
            Ok(doc) => {
                debug!(
                    "Page {}/{}: {} bytes in {:?}",
                    page,
                    total_pages,
                    doc.content.len(),
                    start.elapsed()
                );
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(page, total_pages, doc.content.len());
                }
            }
            Err(e) => {
                warn!("Page {}/{} failed: {}", page, total_pages, e);
                if let Some(ref cb) = self.progress {
                    cb.on_page_error(page, total_pages, e.to_string());
                }
            }
        }
        result
    }

    fn finish(&self, total_pages: usize, success_count: usize) {
        info!("Loaded {}/{} pages", success_count, total_pages);
        if let Some(ref cb) = self.progress {
            cb.on_load_complete(total_pages, success_count);
        }
    }
}

/// State threaded through the lazy stream.
struct LazyState {
    source: SourceDocument,
    next_index: usize,
    produced: usize,
    done: bool,
}

impl<E: ConversionEngine> DocumentLoader for PageLoader<E> {
    async fn load(&self, source: &Path) -> Result<Vec<OutputDocument>, LoaderError> {
        let source = self.open(source).await?;
        let total = source.page_count;

        let artifacts = self.splitter.split_all(&source).await?;
        let mut documents = Vec::with_capacity(total);
        let mut pending = artifacts.into_iter();

        while let Some(artifact) = pending.next() {
            match self.process_page(artifact, total).await {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    cleanup_all(pending);
                    self.finish(total, documents.len());
                    return Err(e);
                }
            }
        }

        self.finish(total, documents.len());
        Ok(documents)
    }

    async fn lazy_load(&self, source: &Path) -> Result<DocumentStream<'_>, LoaderError> {
        let source = self.open(source).await?;
        let state = LazyState {
            source,
            next_index: 0,
            produced: 0,
            done: false,
        };

        let pages = stream::unfold(state, move |mut state| async move {
            let total = state.source.page_count;
            if state.done {
                return None;
            }
            if state.next_index >= total {
                self.finish(total, state.produced);
                return None;
            }

            let index = state.next_index;
            state.next_index += 1;

            let result = match self.splitter.split_page(&state.source, index).await {
                Ok(artifact) => self.process_page(artifact, total).await,
                Err(e) => Err(e),
            };
            if result.is_ok() {
                state.produced += 1;
            } else {
                state.done = true;
                self.finish(total, state.produced);
            }
            Some((result, state))
        });

        Ok(Box::pin(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::{DocItem, StructuredDocument};
    use crate::pipeline::engine::EngineError;
    use crate::pipeline::split::ARTIFACT_PREFIX;
    use futures::StreamExt;
    use std::ops::RangeInclusive;
    use std::path::PathBuf;

    struct StubBackend(usize);

    impl PdfBackend for StubBackend {
        fn page_count(&self, _: &Path, _: Option<&str>) -> Result<usize, LoaderError> {
            Ok(self.0)
        }

        fn extract_page_range(
            &self,
            _: &Path,
            _: Option<&str>,
            pages: RangeInclusive<usize>,
            dest: &Path,
        ) -> Result<(), LoaderError> {
            std::fs::write(dest, format!("page {}", pages.start() + 1))
                .map_err(|e| LoaderError::Internal(e.to_string()))
        }
    }

    /// Echoes the artifact body as a paragraph.
    struct EchoEngine;

    impl ConversionEngine for EchoEngine {
        async fn convert(
            &self,
            artifact: &Path,
            _config: &EngineConfig,
        ) -> Result<StructuredDocument, EngineError> {
            let body = tokio::fs::read_to_string(artifact)
                .await
                .map_err(|e| EngineError::Failed(e.to_string()))?;
            Ok(StructuredDocument::new(vec![DocItem::Paragraph(body)]))
        }
    }

    fn loader(dir: &Path, pages: usize) -> PageLoader<EchoEngine> {
        PageLoader::with_backend(
            Arc::new(StubBackend(pages)),
            Arc::new(EngineAdapter::new(EchoEngine, EngineConfig::default())),
            LoaderOptions::default().temp_dir(dir),
        )
    }

    fn source(dir: &Path) -> PathBuf {
        let path = dir.join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        path
    }

    fn leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(ARTIFACT_PREFIX))
            .count()
    }

    #[tokio::test]
    async fn load_returns_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let docs = loader(dir.path(), 3).load(&source(dir.path())).await.unwrap();

        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["page 1\n", "page 2\n", "page 3\n"]);
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[tokio::test]
    async fn lazy_stream_matches_eager_load() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(dir.path(), 4);
        let src = source(dir.path());

        let eager = loader.load(&src).await.unwrap();
        let lazy: Vec<OutputDocument> = loader
            .lazy_load(&src)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(eager, lazy);
    }

    #[tokio::test]
    async fn missing_source_fails_before_stream() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path(), 1)
            .lazy_load(&dir.path().join("absent.pdf"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LoaderError::FileNotFound { .. }));
    }
}
