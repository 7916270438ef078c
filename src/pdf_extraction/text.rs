// Linearized text extraction: page texts concatenated in page order
use lopdf::Document;
use tracing::{debug, warn};

use super::lopdf_helper;
use crate::types::{DocumentKind, ReportError, Result};

/// Concatenate the text of every page, in page order.
///
/// A page whose content stream cannot be decoded contributes nothing; the
/// document as a whole only fails when no page yields any text.
pub fn linearize_text(document: &Document) -> String {
    let mut text = String::new();
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => {
                debug!(page = page_number, chars = page_text.len(), "page text extracted");
                text.push_str(&page_text);
            }
            Err(e) => warn!(page = page_number, error = %e, "skipping page without readable text"),
        }
    }
    text
}

/// Load `bytes` and return its linearized text, rejecting text-less documents
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    lopdf_helper::with_pdf(bytes, kind, |document| {
        let text = linearize_text(document);
        if text.trim().is_empty() {
            return Err(ReportError::malformed(kind, "no extractable text"));
        }
        Ok(text)
    })
}
