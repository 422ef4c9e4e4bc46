//! Source validation: make sure the caller's path is a readable PDF.
//!
//! The backend would eventually reject a bad file too, but checking the
//! `%PDF` magic bytes first turns "pdfium returned an opaque error" into a
//! precise [`LoaderError`] before any page artifact is allocated.

use crate::error::LoaderError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
///
/// Returns the path unchanged on success so callers can chain it.
pub fn validate_source(path: &Path) -> Result<PathBuf, LoaderError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(LoaderError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LoaderError::PermissionDenied { path });
        }
        Err(_) => return Err(LoaderError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => {}
        Ok(()) => return Err(LoaderError::NotAPdf { path, magic }),
        Err(e) => {
            return Err(LoaderError::CorruptPdf {
                path,
                detail: format!("cannot read header: {e}"),
            })
        }
    }

    debug!("Validated source PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound { .. }));
        assert!(err.is_source_read());
    }

    #[test]
    fn wrong_magic_is_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04zipdata").unwrap();
        let err = validate_source(f.path()).unwrap_err();
        match err {
            LoaderError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        let err = validate_source(f.path()).unwrap_err();
        assert!(matches!(err, LoaderError::CorruptPdf { .. }));
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        let path = validate_source(f.path()).expect("valid header");
        assert_eq!(path, f.path());
    }
}
