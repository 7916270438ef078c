// PDF extraction module: the input side of report generation
pub mod images;
pub mod lopdf_helper;
pub mod text;

pub use images::{extract_images, ExtractedImage};
pub use lopdf_helper::{load_pdf, with_pdf};
pub use text::{extract_text, linearize_text};

use crate::types::{DocumentKind, ReportError, Result};

/// Text and images recovered from one uploaded PDF
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

/// Treatment plan side: the document must yield both text and images.
pub fn extract_plan_content(bytes: &[u8]) -> Result<PdfContent> {
    let kind = DocumentKind::TreatmentPlan;
    with_pdf(bytes, kind, |document| {
        let text = linearize_text(document);
        if text.trim().is_empty() {
            return Err(ReportError::malformed(kind, "no extractable text"));
        }
        let images = extract_images(document);
        if images.is_empty() {
            return Err(ReportError::malformed(kind, "no decodable embedded images"));
        }
        Ok(PdfContent { text, images })
    })
}
