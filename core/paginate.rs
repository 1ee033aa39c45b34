//! Flows a styled run sequence into fixed-size pages.
//!
//! Pages of one file cover the text in contiguous, non-overlapping byte
//! ranges. Page labels ("Page K of N") are patched in once the count is known.

pub mod measure;

pub use measure::{ContentRect, MonospaceMetrics, TextMeasure};

use crate::config::DocumentConfig;
use crate::error::{AppError, Result};
use crate::styled::{StyledRun, plain_text, slice_runs};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Height of the header band above the content rectangle.
pub const HEADER_HEIGHT: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn dimensions(self) -> Size {
        match self {
            PageSize::Letter => Size {
                width: 612.0,
                height: 792.0,
            },
            PageSize::A4 => Size {
                width: 595.0,
                height: 842.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSize::Letter => "letter",
            PageSize::A4 => "a4",
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub page_size: PageSize,
    pub margin: f32,
    pub font_size: f32,
    pub line_numbers: bool,
    pub theme: Theme,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::from_config(&DocumentConfig::default())
    }
}

impl LayoutOptions {
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            page_size: config.page_size,
            margin: config.margin,
            font_size: config.font_size,
            line_numbers: config.line_numbers,
            theme: config.theme,
        }
    }

    /// Area below the header band and inside the margins, before any gutter.
    pub fn body_rect(&self) -> ContentRect {
        let size = self.page_size.dimensions();
        ContentRect {
            x: self.margin,
            y: self.margin + HEADER_HEIGHT,
            width: size.width - 2.0 * self.margin,
            height: size.height - 2.0 * self.margin - HEADER_HEIGHT,
        }
    }
}

/// Per-page decoration drawn around the content slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Chrome {
    pub title: String,
    pub page_label: String,
    pub theme: Theme,
    /// Width of the line-number column in points, zero when disabled.
    pub gutter_width: f32,
    /// One entry per visual line: the source line number on the first row of
    /// a source line, `None` on wrapped continuation rows.
    pub line_numbers: Option<Vec<Option<usize>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Byte range of the file's concatenated text shown on this page.
    pub slice: Range<usize>,
    pub runs: Vec<StyledRun>,
    /// Visual lines as byte ranges, in the same coordinates as `slice`.
    pub lines: Vec<Range<usize>>,
    /// 1-based position within the file's pagination.
    pub page_number: usize,
    pub chrome: Chrome,
    /// Where the text column starts on the page.
    pub text_rect: ContentRect,
}

impl Page {
    pub fn text(&self) -> String {
        plain_text(&self.runs)
    }
}

pub struct Paginator<'m> {
    measure: &'m dyn TextMeasure,
    options: LayoutOptions,
}

impl<'m> Paginator<'m> {
    pub fn new(measure: &'m dyn TextMeasure, options: LayoutOptions) -> Self {
        Self { measure, options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Content rectangle for `text`, narrowed by the gutter when line numbers
    /// are on. Returns the rectangle and the gutter width.
    pub fn text_rect(&self, text: &str) -> (ContentRect, f32) {
        let mut rect = self.options.body_rect();
        if !self.options.line_numbers {
            return (rect, 0.0);
        }
        let digits = source_line_count(text).to_string().len();
        let gutter = (digits + 1) as f32 * self.measure.advance();
        rect.x += gutter;
        rect.width -= gutter;
        (rect, gutter)
    }

    /// Splits `runs` into pages titled `title`. Empty input yields one page
    /// with an empty slice.
    pub fn paginate(&self, title: &str, runs: &[StyledRun]) -> Result<Vec<Page>> {
        let text = plain_text(runs);
        let (rect, gutter_width) = self.text_rect(&text);
        if rect.width < self.measure.advance() || rect.height < self.measure.line_height() {
            log::warn!(
                "Content area for '{}' is too small ({:.1}x{:.1} pt); forcing one glyph per page.",
                title,
                rect.width,
                rect.height
            );
        }

        let mut pages = Vec::new();
        let mut pos = 0usize;
        let mut source_line = 1usize;

        loop {
            let visible = self.measure.visible_range(&text, pos, &rect);
            if visible.start != pos || visible.end > text.len() || !text.is_char_boundary(visible.end) {
                return Err(AppError::LayoutFailed {
                    file: title.to_string(),
                    reason: format!(
                        "measurement returned {:?} for cursor {} in {} bytes",
                        visible,
                        pos,
                        text.len()
                    ),
                });
            }
            let end = if visible.is_empty() && pos < text.len() {
                measure::next_boundary(&text, pos)
            } else {
                visible.end
            };

            let lines = self.split_lines(&text, pos..end, rect.width);
            let numbers = self.options.line_numbers.then(|| {
                lines
                    .iter()
                    .map(|line| {
                        let starts_source_line = line.start == 0 || text.as_bytes()[line.start - 1] == b'\n';
                        let number = starts_source_line.then_some(source_line);
                        source_line += text[line.clone()].matches('\n').count();
                        number
                    })
                    .collect::<Vec<_>>()
            });

            pages.push(Page {
                slice: pos..end,
                runs: slice_runs(runs, pos..end),
                lines,
                page_number: pages.len() + 1,
                chrome: Chrome {
                    title: title.to_string(),
                    page_label: String::new(),
                    theme: self.options.theme,
                    gutter_width,
                    line_numbers: numbers,
                },
                text_rect: rect,
            });

            pos = end;
            if pos >= text.len() {
                break;
            }
        }

        let total = pages.len();
        for page in &mut pages {
            page.chrome.page_label = format!("Page {} of {}", page.page_number, total);
        }
        log::debug!("Paginated '{}' into {} page(s).", title, total);
        Ok(pages)
    }

    fn split_lines(&self, text: &str, range: Range<usize>, width: f32) -> Vec<Range<usize>> {
        let mut lines = Vec::new();
        let mut pos = range.start;
        while pos < range.end {
            let end = self.measure.line_end(text, pos, width).min(range.end);
            let end = if end > pos {
                end
            } else {
                measure::next_boundary(text, pos).min(range.end)
            };
            lines.push(pos..end);
            pos = end;
        }
        lines
    }
}

/// Number of source lines, counting a final unterminated line. At least 1.
pub fn source_line_count(text: &str) -> usize {
    let newlines = text.matches('\n').count();
    let trailing = usize::from(!text.is_empty() && !text.ends_with('\n'));
    (newlines + trailing).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styled::{FontWeight, Rgb, coalesce};

    fn options(line_numbers: bool) -> LayoutOptions {
        LayoutOptions {
            page_size: PageSize::Letter,
            margin: 36.0,
            font_size: 10.0,
            line_numbers,
            theme: Theme::Light,
        }
    }

    /// Rows per page for `options(false)` on letter paper.
    fn rows() -> usize {
        let rect = options(false).body_rect();
        measure::fit_count(rect.height, 12.5)
    }

    fn styled_source(lines: usize) -> Vec<StyledRun> {
        let mut runs = Vec::new();
        for n in 0..lines {
            runs.push(StyledRun::styled("let", Rgb::new(1, 2, 3), FontWeight::Bold));
            runs.push(StyledRun::plain(format!(" v{} = \"é{}\";\n", n, n)));
        }
        runs
    }

    #[test]
    fn pages_reproduce_the_runs_exactly() {
        let metrics = MonospaceMetrics::new(10.0);
        let paginator = Paginator::new(&metrics, options(true));
        let runs = styled_source(500);
        let pages = paginator.paginate("main.rs", &runs).unwrap();
        assert!(pages.len() > 1);

        let mut expected_start = 0;
        let mut rebuilt = Vec::new();
        for page in &pages {
            assert_eq!(page.slice.start, expected_start);
            assert!(!page.slice.is_empty());
            expected_start = page.slice.end;
            rebuilt.extend(page.runs.iter().cloned());
        }
        assert_eq!(expected_start, plain_text(&runs).len());
        assert_eq!(coalesce(rebuilt), coalesce(runs));
    }

    #[test]
    fn page_count_is_ceiling_of_height() {
        let metrics = MonospaceMetrics::new(10.0);
        let paginator = Paginator::new(&metrics, options(false));
        let per_page = rows();
        for lines in [1, per_page, per_page + 1, 3 * per_page, 3 * per_page + 7] {
            let text: String = (0..lines).map(|n| format!("line {}\n", n)).collect();
            let pages = paginator
                .paginate("t.txt", &[StyledRun::plain(text)])
                .unwrap();
            assert_eq!(pages.len(), lines.div_ceil(per_page), "lines = {}", lines);
            for page in &pages {
                assert!(page.lines.len() <= per_page);
            }
        }
    }

    #[test]
    fn empty_input_yields_one_empty_page() {
        let metrics = MonospaceMetrics::new(10.0);
        let pages = Paginator::new(&metrics, options(true))
            .paginate("empty.txt", &[])
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].slice.is_empty());
        assert!(pages[0].runs.is_empty());
        assert_eq!(pages[0].chrome.page_label, "Page 1 of 1");
    }

    #[test]
    fn labels_carry_total_count() {
        let metrics = MonospaceMetrics::new(10.0);
        let runs = [StyledRun::plain("x\n".repeat(rows() * 2 + 1))];
        let pages = Paginator::new(&metrics, options(false))
            .paginate("f", &runs)
            .unwrap();
        let labels: Vec<&str> = pages.iter().map(|p| p.chrome.page_label.as_str()).collect();
        assert_eq!(labels, vec!["Page 1 of 3", "Page 2 of 3", "Page 3 of 3"]);
        assert!(pages.iter().all(|p| p.chrome.title == "f"));
    }

    #[test]
    fn gutter_numbers_source_lines_not_wrapped_rows() {
        let metrics = MonospaceMetrics::new(10.0);
        let paginator = Paginator::new(&metrics, options(true));
        let (rect, gutter) = paginator.text_rect("a\n");
        assert!((gutter - 2.0 * 6.0).abs() < 1e-4);
        let cols = metrics.columns(rect.width);
        let long = "w".repeat(cols * 2 + 1);
        let text = format!("short\n{}\nend", long);
        let pages = paginator.paginate("g", &[StyledRun::plain(text)]).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0].chrome.line_numbers,
            Some(vec![Some(1), Some(2), None, None, Some(3)])
        );
    }

    #[test]
    fn numbering_continues_across_pages() {
        let metrics = MonospaceMetrics::new(10.0);
        let paginator = Paginator::new(&metrics, options(true));
        let runs = [StyledRun::plain("n\n".repeat(rows() + 2))];
        let pages = paginator.paginate("n", &runs).unwrap();
        let second = pages[1].chrome.line_numbers.as_ref().unwrap();
        assert_eq!(second[0], Some(rows() + 1));
    }

    #[test]
    fn unmeasurable_width_still_advances() {
        let metrics = MonospaceMetrics::new(10.0);
        let mut tiny = options(false);
        tiny.margin = 304.0;
        let pages = Paginator::new(&metrics, tiny)
            .paginate("tiny", &[StyledRun::plain("abc")])
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].slice, 2..3);
    }

    #[test]
    fn bad_measurement_is_a_layout_failure() {
        struct Broken;
        impl TextMeasure for Broken {
            fn advance(&self) -> f32 {
                6.0
            }
            fn line_height(&self) -> f32 {
                12.0
            }
            fn line_end(&self, _text: &str, start: usize, _width: f32) -> usize {
                start + 1
            }
            fn visible_range(&self, text: &str, _start: usize, _rect: &ContentRect) -> Range<usize> {
                0..text.len() + 5
            }
        }
        let err = Paginator::new(&Broken, options(false))
            .paginate("bad.txt", &[StyledRun::plain("abc")])
            .unwrap_err();
        assert!(matches!(err, AppError::LayoutFailed { ref file, .. } if file == "bad.txt"));
    }

    #[test]
    fn identical_input_gives_identical_pages() {
        let metrics = MonospaceMetrics::new(9.0);
        let paginator = Paginator::new(&metrics, options(true));
        let runs = styled_source(300);
        assert_eq!(
            paginator.paginate("d", &runs).unwrap(),
            paginator.paginate("d", &runs).unwrap()
        );
    }

    #[test]
    fn counts_source_lines() {
        assert_eq!(source_line_count(""), 1);
        assert_eq!(source_line_count("a"), 1);
        assert_eq!(source_line_count("a\n"), 1);
        assert_eq!(source_line_count("a\nb"), 2);
    }
}
