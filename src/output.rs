//! Output types: one [`OutputDocument`] per source page.
//!
//! An output document is plain data. It holds no reference to any temporary
//! file or engine state, so callers may keep it as long as they like.

use crate::error::LoaderError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata attached to every page document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// 1-indexed page number in the source PDF.
    pub page: usize,
    /// Label of the page; currently the page number as a string.
    pub page_label: String,
}

/// The Markdown of one source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDocument {
    /// Markdown rendering of the page. May be empty for a blank page.
    pub content: String,
    pub metadata: PageMetadata,
}

impl OutputDocument {
    pub fn new(content: impl Into<String>, page: usize, page_label: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: PageMetadata {
                page,
                page_label: page_label.into(),
            },
        }
    }

    /// File name used when pages are written to a directory: `page-0001.md`.
    pub fn file_name(&self) -> String {
        format!("page-{:04}.md", self.metadata.page)
    }

    /// Write the content into `dir` atomically.
    ///
    /// The Markdown goes to a `.tmp` sibling first and is then renamed into
    /// place, so a crash never leaves a half-written page file behind.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, LoaderError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| LoaderError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let path = dir.join(self.file_name());
        let tmp_path = path.with_extension("md.tmp");

        tokio::fs::write(&tmp_path, &self.content)
            .await
            .map_err(|e| LoaderError::OutputWriteFailed {
                path: tmp_path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| LoaderError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Page {} written to {}", self.metadata.page, path.display());
        Ok(path)
    }
}
