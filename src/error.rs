//! Error types for the edgequake-pageloader library.
//!
//! Two failure modes, two types:
//!
//! * [`LoaderError`]: **Fatal** for the current call: the source could not
//!   be read, or a page could not be converted or rendered. Returned as
//!   `Err(LoaderError)` from [`crate::loader::DocumentLoader::load`], from
//!   `lazy_load` itself (source errors), and as the final item of a lazy
//!   stream (page errors).
//!
//! * [`CleanupError`]: **Non-fatal**: a temporary page artifact could not be
//!   deleted. It is logged and never replaces the error (or the document)
//!   that the caller is waiting for.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    // ── Source read errors ────────────────────────────────────────────────
    /// Source file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the source file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The source opened, but a page could not be copied into its own file.
    #[error("Failed to extract page {page} into a single-page PDF: {detail}")]
    PageExtractionFailed { page: usize, detail: String },

    // ── Temporary storage ─────────────────────────────────────────────────
    /// A temporary page artifact could not be allocated.
    #[error("Failed to allocate a temporary page artifact: {source}")]
    TempStorage {
        #[source]
        source: std::io::Error,
    },

    // ── Per-page errors ───────────────────────────────────────────────────
    /// The conversion engine could not process one page.
    #[error("Conversion failed for page {page}: {detail}")]
    Conversion { page: usize, detail: String },

    /// The structured document of one page could not be rendered.
    #[error("Rendering failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    // ── Engine setup ──────────────────────────────────────────────────────
    /// The configured OCR provider is not initialised (missing API key etc.).
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output ────────────────────────────────────────────────────────────
    /// Could not write a page's Markdown to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoaderError {
    /// `true` when the error means the source PDF itself could not be read.
    ///
    /// These come from opening or splitting the source, never from the
    /// engine.
    pub fn is_source_read(&self) -> bool {
        matches!(
            self,
            LoaderError::FileNotFound { .. }
                | LoaderError::PermissionDenied { .. }
                | LoaderError::NotAPdf { .. }
                | LoaderError::CorruptPdf { .. }
                | LoaderError::PasswordRequired { .. }
                | LoaderError::WrongPassword { .. }
                | LoaderError::PageExtractionFailed { .. }
        )
    }

    /// The 1-indexed page a page-scoped error refers to.
    pub fn page(&self) -> Option<usize> {
        match self {
            LoaderError::PageExtractionFailed { page, .. }
            | LoaderError::Conversion { page, .. }
            | LoaderError::Render { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// A page artifact could not be removed from temporary storage.
///
/// Best-effort: logged at `warn` level by the loader, never propagated in
/// place of the primary result.
#[derive(Debug, Error)]
#[error("Failed to remove artifact for page {page} at '{path}': {source}")]
pub struct CleanupError {
    pub page: usize,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
