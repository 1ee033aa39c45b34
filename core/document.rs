//! Merges per-file pages into one document.
//!
//! Per file: an optional title page, then either the paginated text, a
//! full-page image, or the file's own pages spliced verbatim. A tree page and
//! a table of contents are prepended after the body is laid out, so TOC
//! entries can point at final page numbers.

pub mod pdf;
pub mod render;

pub use render::{DrawOp, Font, Surface};

use crate::config::DocumentConfig;
use crate::error::{AppError, Result};
use crate::extract::{ExtractedContent, ImageInfo};
use crate::paginate::{LayoutOptions, Page, Paginator, Size, TextMeasure, measure::fit_count};
use crate::source::ContentKind;
use crate::styled::StyledRun;
use crate::theme::Theme;
use crate::tree::FileTree;
use byte_unit::{Byte, UnitType};
use chrono::{DateTime, Utc};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TOC_TITLE: &str = "Table of Contents";
pub const TREE_TITLE: &str = "File Tree";
const TOC_MAX_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct TitlePage {
    pub file_name: String,
    pub display_path: String,
    pub size_label: String,
    pub generated_at: DateTime<Utc>,
    /// Extra line such as "12 pages" or "640x480 image".
    pub detail: Option<String>,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePage {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
    pub info: ImageInfo,
    pub theme: Theme,
}

/// One page of an input paged document, kept byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPage {
    pub file_name: String,
    pub source: Arc<Vec<u8>>,
    /// 0-based page index within `source`.
    pub page_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPage {
    Title(TitlePage),
    Toc(Page),
    Tree(Page),
    Text(Page),
    Image(ImagePage),
    Imported(ImportedPage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1-based position of the file in processing order.
    pub ordinal: usize,
    pub file_name: String,
    /// 1-based page number of the file's first page.
    pub first_page: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub layout: LayoutOptions,
    pub title_pages: bool,
    pub include_file_tree: bool,
    /// Title pages show paths relative to this directory.
    pub base_dir: Option<PathBuf>,
    /// Restamped at the start of every `run_pipeline` call.
    pub generated_at: DateTime<Utc>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self::from_config(&DocumentConfig::default())
    }
}

impl DocumentOptions {
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            layout: LayoutOptions::from_config(config),
            title_pages: config.title_pages,
            include_file_tree: config.include_file_tree,
            base_dir: None,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pages: Vec<DocumentPage>,
    toc: Vec<TocEntry>,
    file_ranges: Vec<Range<usize>>,
    layout: LayoutOptions,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[DocumentPage] {
        &self.pages
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    /// Page index ranges (0-based) of each file, in processing order.
    pub fn file_ranges(&self) -> &[Range<usize>] {
        &self.file_ranges
    }

    pub fn page_size(&self) -> Size {
        self.layout.page_size.dimensions()
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    /// Draws page `n` (1-based) into a surface of `size` points.
    pub fn render_page(&self, n: usize, size: Size) -> Result<Surface> {
        render::render_page(self, n, size)
    }

    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        pdf::write_pdf(self)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_pdf_bytes()?;
        std::fs::write(path, bytes).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!("Wrote {} page(s) to {}", self.page_count(), path.display());
        Ok(())
    }
}

/// A document plus the per-file failures that were replaced by placeholders,
/// keyed by input index.
#[derive(Debug)]
pub struct Assembly {
    pub document: Document,
    pub failures: Vec<(usize, AppError)>,
}

pub struct DocumentAssembler<'m> {
    measure: &'m dyn TextMeasure,
    options: DocumentOptions,
}

impl<'m> DocumentAssembler<'m> {
    pub fn new(measure: &'m dyn TextMeasure, options: DocumentOptions) -> Self {
        Self { measure, options }
    }

    pub fn assemble(&self, contents: &[ExtractedContent], tree: Option<&FileTree>) -> Result<Assembly> {
        if contents.is_empty() {
            return Err(AppError::Assembly("no files to assemble".to_string()));
        }
        let paginator = Paginator::new(self.measure, self.options.layout);
        let mut body = Vec::new();
        let mut starts = Vec::with_capacity(contents.len());
        let mut ends = Vec::with_capacity(contents.len());
        let mut failures = Vec::new();

        for (index, content) in contents.iter().enumerate() {
            starts.push(body.len());
            if let Err(e) = self.place_file(&paginator, content, &mut body) {
                log::warn!("{}: using placeholder ({})", content.source.path.display(), e);
                body.truncate(starts[index]);
                let placeholder = ExtractedContent::placeholder(content.source.clone(), &e);
                self.place_file(&paginator, &placeholder, &mut body)?;
                failures.push((index, e));
            }
            ends.push(body.len());
        }

        let chrome = LayoutOptions {
            line_numbers: false,
            ..self.options.layout
        };
        let chrome_paginator = Paginator::new(self.measure, chrome);

        let tree_pages: Vec<DocumentPage> = match (self.options.include_file_tree, tree) {
            (true, Some(tree)) => chrome_paginator
                .paginate(TREE_TITLE, &[StyledRun::plain(tree.render_text())])?
                .into_iter()
                .map(DocumentPage::Tree)
                .collect(),
            _ => Vec::new(),
        };

        let (toc_pages, toc) = if contents.len() > 1 {
            self.table_of_contents(&chrome_paginator, contents, &starts, tree_pages.len())?
        } else {
            (Vec::new(), Vec::new())
        };

        let offset = tree_pages.len() + toc_pages.len();
        let mut pages = Vec::with_capacity(offset + body.len());
        pages.extend(tree_pages);
        pages.extend(toc_pages);
        pages.extend(body);

        let file_ranges = starts
            .iter()
            .zip(&ends)
            .map(|(&s, &e)| s + offset..e + offset)
            .collect();

        log::info!(
            "Assembled document: {} page(s) for {} file(s).",
            pages.len(),
            contents.len()
        );
        Ok(Assembly {
            document: Document {
                pages,
                toc,
                file_ranges,
                layout: self.options.layout,
            },
            failures,
        })
    }

    fn place_file(
        &self,
        paginator: &Paginator<'_>,
        content: &ExtractedContent,
        out: &mut Vec<DocumentPage>,
    ) -> Result<()> {
        let name = content.source.file_name();
        match content.kind {
            ContentKind::PagedDocument => {
                let (Some(bytes), Some(count)) = (content.raw_bytes.as_ref(), content.page_count) else {
                    return Err(AppError::Assembly(format!(
                        "{} has no retained pages to splice",
                        name
                    )));
                };
                if self.options.title_pages {
                    out.push(self.title_page(content, Some(format!("{} page(s)", count))));
                }
                out.extend((0..count).map(|page_index| {
                    DocumentPage::Imported(ImportedPage {
                        file_name: name.clone(),
                        source: Arc::clone(bytes),
                        page_index,
                    })
                }));
            }
            ContentKind::Image => {
                let (Some(bytes), Some(info)) = (content.raw_bytes.as_ref(), content.image) else {
                    return Err(AppError::Assembly(format!("{} has no image data", name)));
                };
                if self.options.title_pages {
                    let detail = format!("{}x{} image", info.width, info.height);
                    out.push(self.title_page(content, Some(detail)));
                }
                out.push(DocumentPage::Image(ImagePage {
                    file_name: name,
                    bytes: Arc::clone(bytes),
                    info,
                    theme: self.options.layout.theme,
                }));
            }
            ContentKind::Text => {
                let pages = paginator.paginate(&name, &content.styled_runs)?;
                if self.options.title_pages {
                    out.push(self.title_page(content, None));
                }
                out.extend(pages.into_iter().map(DocumentPage::Text));
            }
        }
        Ok(())
    }

    fn title_page(&self, content: &ExtractedContent, detail: Option<String>) -> DocumentPage {
        let source = &content.source;
        let display_path = match &self.options.base_dir {
            Some(base) => pathdiff::diff_paths(&source.path, base).unwrap_or_else(|| source.path.clone()),
            None => source.path.clone(),
        };
        let size_label = format!(
            "{:.1}",
            Byte::from_u64(source.byte_size).get_appropriate_unit(UnitType::Binary)
        );
        DocumentPage::Title(TitlePage {
            file_name: source.file_name(),
            display_path: display_path.display().to_string(),
            size_label,
            generated_at: self.options.generated_at,
            detail,
            theme: self.options.layout.theme,
        })
    }

    /// Lays out the TOC until its own page count is stable, since entries
    /// point past it.
    fn table_of_contents(
        &self,
        paginator: &Paginator<'_>,
        contents: &[ExtractedContent],
        starts: &[usize],
        tree_page_count: usize,
    ) -> Result<(Vec<DocumentPage>, Vec<TocEntry>)> {
        let cols = fit_count(paginator.options().body_rect().width, self.measure.advance());
        let mut guess = 1usize;
        for _ in 0..TOC_MAX_PASSES {
            let offset = tree_page_count + guess;
            let entries: Vec<TocEntry> = contents
                .iter()
                .zip(starts)
                .enumerate()
                .map(|(i, (content, &start))| TocEntry {
                    ordinal: i + 1,
                    file_name: content.source.file_name(),
                    first_page: offset + start + 1,
                })
                .collect();
            let text = toc_text(&entries, cols);
            let pages = paginator.paginate(TOC_TITLE, &[StyledRun::plain(text)])?;
            if pages.len() == guess {
                return Ok((pages.into_iter().map(DocumentPage::Toc).collect(), entries));
            }
            log::trace!("TOC needs {} page(s), guessed {}", pages.len(), guess);
            guess = pages.len();
        }
        Err(AppError::Assembly(
            "table of contents page count did not settle".to_string(),
        ))
    }
}

/// `  1. name ........ 7` lines, dot leaders filling `cols`.
fn toc_text(entries: &[TocEntry], cols: usize) -> String {
    let width = entries.len().to_string().len();
    let mut out = String::new();
    for entry in entries {
        let left = format!("{:>width$}. {} ", entry.ordinal, entry.file_name);
        let right = format!(" {}", entry.first_page);
        let used = left.chars().count() + right.chars().count();
        let dots = cols.saturating_sub(used).max(1);
        out.push_str(&left);
        out.push_str(&".".repeat(dots));
        out.push_str(&right);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::MonospaceMetrics;
    use crate::source::SourceFile;

    fn text_content(name: &str, text: &str) -> ExtractedContent {
        let source = SourceFile {
            path: PathBuf::from("/p").join(name),
            extension: crate::source::extension_of(Path::new(name)),
            byte_size: text.len() as u64,
            mod_time: None,
        };
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![StyledRun::plain(text)]
        };
        ExtractedContent::text(source, text.to_string(), runs)
    }

    fn first_page_name(page: &DocumentPage) -> Option<&str> {
        match page {
            DocumentPage::Title(t) => Some(&t.file_name),
            DocumentPage::Text(p) => Some(&p.chrome.title),
            _ => None,
        }
    }

    #[test]
    fn toc_entries_point_at_first_pages() {
        let metrics = MonospaceMetrics::new(9.0);
        let contents = vec![
            text_content("a.rs", &"fn a() {}\n".repeat(200)),
            text_content("b.txt", ""),
            text_content("c.md", "# c\n"),
        ];
        let assembly = DocumentAssembler::new(&metrics, DocumentOptions::default())
            .assemble(&contents, None)
            .unwrap();
        let doc = &assembly.document;
        assert!(matches!(doc.pages()[0], DocumentPage::Toc(_)));
        let names: Vec<&str> = doc.toc().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.rs", "b.txt", "c.md"]);
        for (i, entry) in doc.toc().iter().enumerate() {
            assert_eq!(entry.ordinal, i + 1);
            assert_eq!(entry.first_page, doc.file_ranges()[i].start + 1);
            assert_eq!(
                first_page_name(&doc.pages()[entry.first_page - 1]),
                Some(entry.file_name.as_str())
            );
        }
        assert!(assembly.failures.is_empty());
    }

    #[test]
    fn single_file_has_no_toc() {
        let metrics = MonospaceMetrics::new(9.0);
        let doc = DocumentAssembler::new(&metrics, DocumentOptions::default())
            .assemble(&[text_content("only.txt", "x")], None)
            .unwrap()
            .document;
        assert!(doc.toc().is_empty());
        assert_eq!(doc.page_count(), 2);
        assert!(matches!(doc.pages()[0], DocumentPage::Title(_)));
    }

    #[test]
    fn tree_page_precedes_toc() {
        let metrics = MonospaceMetrics::new(9.0);
        let options = DocumentOptions {
            include_file_tree: true,
            ..DocumentOptions::default()
        };
        let contents = vec![text_content("a.txt", "a"), text_content("b.txt", "b")];
        let tree = FileTree::build(&["/p/a.txt", "/p/b.txt"]);
        let doc = DocumentAssembler::new(&metrics, options)
            .assemble(&contents, Some(&tree))
            .unwrap()
            .document;
        assert!(matches!(doc.pages()[0], DocumentPage::Tree(_)));
        assert!(matches!(doc.pages()[1], DocumentPage::Toc(_)));
        assert_eq!(doc.toc()[0].first_page, 3);
    }

    #[test]
    fn empty_file_keeps_one_content_page() {
        let metrics = MonospaceMetrics::new(9.0);
        let options = DocumentOptions {
            title_pages: false,
            ..DocumentOptions::default()
        };
        let doc = DocumentAssembler::new(&metrics, options)
            .assemble(&[text_content("empty.txt", "")], None)
            .unwrap()
            .document;
        assert_eq!(doc.page_count(), 1);
        let DocumentPage::Text(page) = &doc.pages()[0] else {
            panic!("expected a text page");
        };
        assert!(page.slice.is_empty());
    }

    #[test]
    fn paged_documents_are_spliced_per_page() {
        let metrics = MonospaceMetrics::new(9.0);
        let mut content = text_content("deck.pdf", "flat text");
        content.kind = ContentKind::PagedDocument;
        content.raw_bytes = Some(Arc::new(b"%PDF-stub".to_vec()));
        content.page_count = Some(3);
        let doc = DocumentAssembler::new(&metrics, DocumentOptions::default())
            .assemble(&[content], None)
            .unwrap()
            .document;
        assert_eq!(doc.page_count(), 4);
        let indices: Vec<usize> = doc
            .pages()
            .iter()
            .filter_map(|p| match p {
                DocumentPage::Imported(i) => Some(i.page_index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn broken_file_becomes_placeholder_and_is_reported() {
        let metrics = MonospaceMetrics::new(9.0);
        let mut broken = text_content("broken.pdf", "");
        broken.kind = ContentKind::PagedDocument;
        let contents = vec![text_content("ok.txt", "fine"), broken];
        let assembly = DocumentAssembler::new(&metrics, DocumentOptions::default())
            .assemble(&contents, None)
            .unwrap();
        assert_eq!(assembly.failures.len(), 1);
        assert_eq!(assembly.failures[0].0, 1);
        let range = assembly.document.file_ranges()[1].clone();
        let DocumentPage::Text(page) = &assembly.document.pages()[range.end - 1] else {
            panic!("expected placeholder text page");
        };
        assert!(page.text().starts_with("[unable to extract broken.pdf"));
    }

    #[test]
    fn toc_lines_fill_with_dot_leaders() {
        let entries = vec![TocEntry {
            ordinal: 1,
            file_name: "a.py".to_string(),
            first_page: 2,
        }];
        assert_eq!(toc_text(&entries, 20), "1. a.py .......... 2\n");
    }
}
