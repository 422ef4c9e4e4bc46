//! Page isolation: turn page `i` of the source into its own temporary PDF.
//!
//! Every [`PageArtifact`] owns a [`tempfile::TempPath`]. The loader deletes it
//! explicitly through [`PageArtifact::cleanup`] so a failed delete can be
//! logged; if an artifact is dropped instead (a lazy stream torn down
//! mid-page, a panic), `TempPath`'s destructor removes the file anyway.
//! Either way a created artifact is deleted exactly once.

use crate::error::{CleanupError, LoaderError};
use crate::pipeline::input;
use crate::pipeline::pdf::PdfBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Filename prefix of every page artifact.
pub const ARTIFACT_PREFIX: &str = "pageload-";

/// The source PDF of a load: validated, opened once, page count known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// A temporary single-page PDF cut from the source.
#[derive(Debug)]
pub struct PageArtifact {
    page_number: usize,
    page_label: String,
    path: TempPath,
}

impl PageArtifact {
    /// 1-indexed page number in the source.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Label of the page; currently the page number as a string.
    pub fn page_label(&self) -> &str {
        &self.page_label
    }

    /// Location of the single-page PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact from temporary storage.
    pub fn cleanup(self) -> Result<(), CleanupError> {
        let page = self.page_number;
        let path = self.path.to_path_buf();
        self.path.close().map_err(|source| CleanupError { page, path, source })?;
        debug!("Page {}: artifact deleted", page);
        Ok(())
    }

    /// Delete the artifact, logging (not returning) a failure.
    pub fn cleanup_logged(self) {
        if let Err(e) = self.cleanup() {
            warn!("{}", e);
        }
    }
}

/// Best-effort deletion of every artifact in `artifacts`.
pub fn cleanup_all(artifacts: impl IntoIterator<Item = PageArtifact>) {
    for artifact in artifacts {
        artifact.cleanup_logged();
    }
}

/// Splits a source PDF into per-page artifacts.
#[derive(Clone)]
pub struct PageSplitter {
    backend: Arc<dyn PdfBackend>,
    temp_dir: PathBuf,
    password: Option<String>,
}

impl PageSplitter {
    /// `temp_dir` defaults to [`std::env::temp_dir`].
    pub fn new(
        backend: Arc<dyn PdfBackend>,
        temp_dir: Option<PathBuf>,
        password: Option<String>,
    ) -> Self {
        Self {
            backend,
            temp_dir: temp_dir.unwrap_or_else(std::env::temp_dir),
            password,
        }
    }

    /// Directory where artifacts are created.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Validate and open the source, returning its page count.
    ///
    /// No artifact exists yet when this fails.
    pub async fn open(&self, source: &Path) -> Result<SourceDocument, LoaderError> {
        let path = input::validate_source(source)?;
        let backend = Arc::clone(&self.backend);
        let password = self.password.clone();
        let probe = path.clone();

        let page_count = tokio::task::spawn_blocking(move || {
            backend.page_count(&probe, password.as_deref())
        })
        .await
        .map_err(|e| LoaderError::Internal(format!("Open task panicked: {}", e)))??;

        info!("Opened {}: {} pages", path.display(), page_count);
        Ok(SourceDocument { path, page_count })
    }

    /// Cut page `index` (0-based) into a fresh artifact.
    pub async fn split_page(
        &self,
        source: &SourceDocument,
        index: usize,
    ) -> Result<PageArtifact, LoaderError> {
        let backend = Arc::clone(&self.backend);
        let password = self.password.clone();
        let source_path = source.path.clone();
        let temp_dir = self.temp_dir.clone();

        tokio::task::spawn_blocking(move || {
            let page_number = index + 1;
            let path = tempfile::Builder::new()
                .prefix(&format!("{ARTIFACT_PREFIX}p{page_number:04}-"))
                .suffix(".pdf")
                .tempfile_in(&temp_dir)
                .map_err(|source| LoaderError::TempStorage { source })?
                .into_temp_path();

            let artifact = PageArtifact {
                page_number,
                page_label: page_number.to_string(),
                path,
            };

            if let Err(e) =
                backend.extract_page_range(&source_path, password.as_deref(), index..=index, artifact.path())
            {
                artifact.cleanup_logged();
                return Err(e);
            }

            debug!("Page {}: artifact created at {}", page_number, artifact.path().display());
            Ok(artifact)
        })
        .await
        .map_err(|e| LoaderError::Internal(format!("Split task panicked: {}", e)))?
    }

    /// Cut every page up front, in ascending page order.
    ///
    /// If any page fails, the artifacts already created are deleted before
    /// the error is returned.
    pub async fn split_all(&self, source: &SourceDocument) -> Result<Vec<PageArtifact>, LoaderError> {
        let mut artifacts = Vec::with_capacity(source.page_count);
        for index in 0..source.page_count {
            match self.split_page(source, index).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    cleanup_all(artifacts);
                    return Err(e);
                }
            }
        }
        Ok(artifacts)
    }
}
