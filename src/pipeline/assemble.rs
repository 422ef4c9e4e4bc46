//! Assembly: structured document + page identity → [`OutputDocument`].

use crate::error::LoaderError;
use crate::output::OutputDocument;
use crate::pipeline::document::StructuredDocument;

/// Render `document` to Markdown and attach the page's metadata.
///
/// Rendering failures are reported against `page`.
pub fn assemble(
    document: &StructuredDocument,
    page: usize,
    page_label: &str,
) -> Result<OutputDocument, LoaderError> {
    let content = document.to_markdown().map_err(|e| LoaderError::Render {
        page,
        detail: e.to_string(),
    })?;
    Ok(OutputDocument::new(content, page, page_label))
}
