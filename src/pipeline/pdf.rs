//! PDF page extraction: the capability the splitter needs from a PDF library.
//!
//! [`PdfBackend`] is deliberately small: count pages, copy a page range into
//! a new file. [`PdfiumBackend`] implements it with `pdfium-render`; tests
//! implement it with a fake that writes stub files.
//!
//! ## Why open the source per call?
//!
//! `PdfDocument<'a>` borrows the `Pdfium` bindings, so a handle cannot
//! outlive the blocking closure that created it. Reopening is cheap (pdfium
//! parses the xref lazily) and keeps every call self-contained, which is what
//! the lazy splitter needs anyway: it extracts one page per stream step.

use crate::error::LoaderError;
use pdfium_render::prelude::*;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::debug;

/// PDF page-range extraction.
///
/// Page indices are 0-based. Implementations are called from
/// `tokio::task::spawn_blocking` and may block freely.
pub trait PdfBackend: Send + Sync + 'static {
    /// Open `source` and return its page count.
    fn page_count(&self, source: &Path, password: Option<&str>) -> Result<usize, LoaderError>;

    /// Write a new PDF at `dest` holding exactly the pages in `pages`.
    fn extract_page_range(
        &self,
        source: &Path,
        password: Option<&str>,
        pages: RangeInclusive<usize>,
        dest: &Path,
    ) -> Result<(), LoaderError>;
}

/// [`PdfBackend`] backed by the pdfium C++ library.
///
/// The library is located (and downloaded on first use) by `pdfium-auto`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumBackend;

impl PdfiumBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for PdfiumBackend {
    fn page_count(&self, source: &Path, password: Option<&str>) -> Result<usize, LoaderError> {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, source, password)?;
        let count = document.pages().len() as usize;
        debug!("{} has {} pages", source.display(), count);
        Ok(count)
    }

    fn extract_page_range(
        &self,
        source: &Path,
        password: Option<&str>,
        pages: RangeInclusive<usize>,
        dest: &Path,
    ) -> Result<(), LoaderError> {
        let first_page = pages.start() + 1;
        let extraction_failed = |detail: String| LoaderError::PageExtractionFailed {
            page: first_page,
            detail,
        };

        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, source, password)?;

        let total = document.pages().len() as usize;
        if pages.is_empty() || *pages.end() >= total {
            return Err(extraction_failed(format!(
                "range {}..={} outside document of {} pages",
                pages.start() + 1,
                pages.end() + 1,
                total
            )));
        }

        let to_index = |i: usize| {
            PdfPageIndex::try_from(i).map_err(|_| extraction_failed(format!("page index {i} overflows")))
        };
        let range = to_index(*pages.start())?..=to_index(*pages.end())?;

        let mut target = pdfium
            .create_new_pdf()
            .map_err(|e| extraction_failed(format!("{:?}", e)))?;
        target
            .pages_mut()
            .copy_page_range_from_document(&document, range, 0)
            .map_err(|e| extraction_failed(format!("{:?}", e)))?;
        target
            .save_to_file(dest)
            .map_err(|e| extraction_failed(format!("save to {}: {:?}", dest.display(), e)))?;

        debug!(
            "Extracted pages {}..={} → {}",
            pages.start() + 1,
            pages.end() + 1,
            dest.display()
        );
        Ok(())
    }
}

/// Bind to the pdfium shared library, downloading it on first use.
pub(crate) fn bind_pdfium() -> Result<Pdfium, LoaderError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| LoaderError::PdfiumBindingFailed(e.to_string()))
}

/// Open a document, classifying pdfium's failure into a source-read error.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, LoaderError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            if password.is_some() {
                LoaderError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                LoaderError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            LoaderError::CorruptPdf {
                path: path.to_path_buf(),
                detail,
            }
        }
    })
}
