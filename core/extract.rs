//! Per-file content extraction.
//!
//! Text files are decoded and highlighted here so the worker pool does both
//! steps for a file in one go. Paged documents keep their original bytes for
//! verbatim splicing; images keep their bytes and dimensions.

pub mod office;
pub mod paged;

pub use office::{OfficeConverter, OfficeOutput, OoxmlConverter};
pub use paged::{PagedDocumentService, PdfService};

use crate::error::{AppError, Result};
use crate::highlight::{Language, RegexHighlighter, SyntaxHighlighter, highlight_or_plain};
use crate::monitor::PerformanceMonitor;
use crate::source::{ContentKind, FileCategory, SourceFile};
use crate::styled::StyledRun;
use std::fs;
use std::io::Cursor;
use std::sync::Arc;

/// Pixel dimensions of an image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub source: SourceFile,
    pub kind: ContentKind,
    /// Text rendition used by the prompt. For images this is a caption.
    pub text: String,
    /// Concatenates to `text`.
    pub styled_runs: Vec<StyledRun>,
    /// Original bytes of images and paged documents.
    pub raw_bytes: Option<Arc<Vec<u8>>>,
    pub image: Option<ImageInfo>,
    pub page_count: Option<usize>,
    /// Non-fatal problem met while extracting, reported once the run ends.
    pub warning: Option<String>,
    pub is_placeholder: bool,
}

impl ExtractedContent {
    pub fn text(source: SourceFile, text: String, styled_runs: Vec<StyledRun>) -> Self {
        Self {
            source,
            kind: ContentKind::Text,
            text,
            styled_runs,
            raw_bytes: None,
            image: None,
            page_count: None,
            warning: None,
            is_placeholder: false,
        }
    }

    /// Stand-in for a file whose extraction failed.
    pub fn placeholder(source: SourceFile, error: &AppError) -> Self {
        let reason = match error {
            AppError::ExtractionFailed { reason, .. } => reason.clone(),
            AppError::LayoutFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        let marker = format!("[unable to extract {}: {}]", source.file_name(), reason);
        let mut content = Self::text(source, marker.clone(), vec![StyledRun::plain(marker)]);
        content.is_placeholder = true;
        content.warning = Some(error.to_string());
        content
    }
}

/// Collaborators used during extraction. Tests swap in fakes.
#[derive(Clone)]
pub struct Services {
    pub paged: Arc<dyn PagedDocumentService>,
    pub office: Arc<dyn OfficeConverter>,
    pub highlighter: Arc<dyn SyntaxHighlighter>,
    pub monitor: Arc<PerformanceMonitor>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            paged: Arc::new(PdfService),
            office: Arc::new(OoxmlConverter),
            highlighter: Arc::new(RegexHighlighter),
            monitor: Arc::new(PerformanceMonitor::disabled()),
        }
    }
}

impl Services {
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractOptions {
    pub syntax_highlighting: bool,
}

pub struct Extractor<'s> {
    services: &'s Services,
    options: ExtractOptions,
}

impl<'s> Extractor<'s> {
    pub fn new(services: &'s Services, options: ExtractOptions) -> Self {
        Self { services, options }
    }

    pub fn extract(&self, source: &SourceFile) -> Result<ExtractedContent> {
        let label = format!("extract {}", source.file_name());
        self.services.monitor.time(&label, || self.extract_inner(source))
    }

    fn extract_inner(&self, source: &SourceFile) -> Result<ExtractedContent> {
        log::debug!(
            "Extracting {} as {:?}",
            source.path.display(),
            source.category()
        );
        let bytes = fs::read(&source.path)
            .map_err(|e| AppError::extraction(&source.path, format!("read failed: {}", e)))?;

        match source.category() {
            FileCategory::PagedDocument => self.paged_document(source, bytes),
            FileCategory::Image => image_content(source, bytes),
            FileCategory::OfficeDocument => self.office_document(source, &bytes),
            FileCategory::Code
            | FileCategory::Data
            | FileCategory::Documentation
            | FileCategory::Unknown => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    AppError::extraction(
                        &source.path,
                        format!("not valid UTF-8 (at byte {})", e.utf8_error().valid_up_to()),
                    )
                })?;
                Ok(self.styled_text(source, text))
            }
        }
    }

    fn styled_text(&self, source: &SourceFile, text: String) -> ExtractedContent {
        let language = if self.options.syntax_highlighting {
            Language::from_extension(&source.extension)
        } else {
            None
        };
        let runs = highlight_or_plain(self.services.highlighter.as_ref(), &text, language);
        ExtractedContent::text(source.clone(), text, runs)
    }

    fn paged_document(&self, source: &SourceFile, bytes: Vec<u8>) -> Result<ExtractedContent> {
        let pages = self.services.paged.page_count(&source.path, &bytes)?;
        let (text, warning) = match self.services.paged.extract_text(&source.path, &bytes) {
            Ok(text) => (text, None),
            Err(e) => {
                log::warn!("{}", e);
                (String::new(), Some(e.to_string()))
            }
        };
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![StyledRun::plain(text.as_str())]
        };
        Ok(ExtractedContent {
            source: source.clone(),
            kind: ContentKind::PagedDocument,
            text,
            styled_runs: runs,
            raw_bytes: Some(Arc::new(bytes)),
            image: None,
            page_count: Some(pages),
            warning,
            is_placeholder: false,
        })
    }

    fn office_document(&self, source: &SourceFile, bytes: &[u8]) -> Result<ExtractedContent> {
        match self.services.office.convert(&source.path, &source.extension, bytes) {
            Ok(OfficeOutput::Text(text)) => Ok(self.styled_text(source, text)),
            Ok(OfficeOutput::PagedDocument(pdf)) => self.paged_document(source, pdf),
            Err(e) => {
                log::warn!("Conversion of {} failed: {}", source.path.display(), e);
                Ok(ExtractedContent::placeholder(source.clone(), &e))
            }
        }
    }
}

fn image_content(source: &SourceFile, bytes: Vec<u8>) -> Result<ExtractedContent> {
    let undecodable =
        |e: &dyn std::fmt::Display| AppError::extraction(&source.path, format!("undecodable image: {}", e));
    let (width, height) = image::ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| undecodable(&e))?
        .into_dimensions()
        .map_err(|e| undecodable(&e))?;
    let caption = format!("[Image: {} ({}x{})]", source.file_name(), width, height);
    Ok(ExtractedContent {
        source: source.clone(),
        kind: ContentKind::Image,
        text: caption.clone(),
        styled_runs: vec![StyledRun::plain(caption)],
        raw_bytes: Some(Arc::new(bytes)),
        image: Some(ImageInfo { width, height }),
        page_count: None,
        warning: None,
        is_placeholder: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::validate;
    use crate::styled::plain_text;
    use std::path::Path;

    struct FailingOffice;

    impl OfficeConverter for FailingOffice {
        fn convert(&self, path: &Path, _ext: &str, _bytes: &[u8]) -> Result<OfficeOutput> {
            Err(AppError::extraction(path, "converter offline"))
        }
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        validate(&path, u64::MAX).unwrap()
    }

    #[test]
    fn text_files_are_highlighted_losslessly() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "lib.rs", b"pub fn x() -> u8 { 1 } // one\n");
        let services = Services::default();
        let extractor = Extractor::new(
            &services,
            ExtractOptions {
                syntax_highlighting: true,
            },
        );
        let content = extractor.extract(&source).unwrap();
        assert_eq!(content.kind, ContentKind::Text);
        assert!(content.styled_runs.len() > 1);
        assert_eq!(plain_text(&content.styled_runs), content.text);
    }

    #[test]
    fn highlighting_off_gives_one_plain_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "lib.rs", b"fn main() {}");
        let services = Services::default();
        let content = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap();
        assert_eq!(content.styled_runs, vec![StyledRun::plain("fn main() {}")]);
    }

    #[test]
    fn empty_file_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "b.txt", b"");
        let services = Services::default();
        let content = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap();
        assert!(content.text.is_empty());
        assert!(content.styled_runs.is_empty());
    }

    #[test]
    fn invalid_utf8_fails_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "bad.txt", &[0x66, 0xff, 0xfe]);
        let services = Services::default();
        let err = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed { .. }));
    }

    #[test]
    fn office_failure_degrades_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "notes.docx", b"whatever");
        let services = Services {
            office: Arc::new(FailingOffice),
            ..Services::default()
        };
        let content = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap();
        assert!(content.is_placeholder);
        assert_eq!(content.text, "[unable to extract notes.docx: converter offline]");
        assert!(content.warning.is_some());
    }

    #[test]
    fn images_record_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();
        let source = validate(&path, u64::MAX).unwrap();
        let services = Services::default();
        let content = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap();
        assert_eq!(content.kind, ContentKind::Image);
        assert_eq!(content.image, Some(ImageInfo { width: 3, height: 2 }));
        assert_eq!(content.text, "[Image: dot.png (3x2)]");
        assert!(content.raw_bytes.is_some());
    }

    #[test]
    fn image_dimensions_come_from_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("full.bmp");
        image::RgbImage::from_pixel(3, 2, image::Rgb([0, 0, 255]))
            .save(&full)
            .unwrap();
        let bytes = fs::read(&full).unwrap();
        let source = write(dir.path(), "cut.bmp", &bytes[..bytes.len() - 12]);
        let services = Services::default();
        let content = Extractor::new(&services, ExtractOptions::default())
            .extract(&source)
            .unwrap();
        assert_eq!(content.image, Some(ImageInfo { width: 3, height: 2 }));
    }

    #[test]
    fn undecodable_image_fails_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "photo.heic", b"ftypheic");
        let services = Services::default();
        assert!(
            Extractor::new(&services, ExtractOptions::default())
                .extract(&source)
                .is_err()
        );
    }
}
