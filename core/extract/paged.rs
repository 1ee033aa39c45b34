//! Pre-paginated documents (PDF).

use crate::error::{AppError, Result};
use std::path::Path;

/// Text and page access for paged documents.
pub trait PagedDocumentService: Send + Sync {
    /// Flat text rendition of the whole document.
    fn extract_text(&self, path: &Path, bytes: &[u8]) -> Result<String>;

    fn page_count(&self, path: &Path, bytes: &[u8]) -> Result<usize>;
}

/// `pdf-extract` for text, `lopdf` for structure.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfService;

impl PagedDocumentService for PdfService {
    fn extract_text(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed inputs.
        let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(AppError::extraction(path, format!("PDF text extraction failed: {}", e))),
            Err(_) => Err(AppError::extraction(path, "PDF text extraction aborted on malformed input")),
        }
    }

    fn page_count(&self, path: &Path, bytes: &[u8]) -> Result<usize> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| AppError::extraction(path, format!("not a readable PDF: {}", e)))?;
        let pages = document.get_pages().len();
        if pages == 0 {
            return Err(AppError::extraction(path, "PDF has no pages"));
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_not_a_pdf() {
        let path = Path::new("fake.pdf");
        let err = PdfService.page_count(path, b"not a pdf").unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed { .. }));
        assert!(PdfService.extract_text(path, b"not a pdf").is_err());
    }
}
