use std::ops::Range;

/// Columns a tab advances.
pub const TAB_WIDTH: usize = 4;

/// Glyph advance of Courier, in em.
const ADVANCE_EM: f32 = 0.6;
const LINE_HEIGHT_EM: f32 = 1.25;
const EPSILON: f32 = 1e-4;

/// Usable area of a page in points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Text measurement primitive the paginator is driven by.
pub trait TextMeasure: Send + Sync {
    fn advance(&self) -> f32;

    fn line_height(&self) -> f32;

    /// End offset of the visual line that starts at `start`. A line ending in
    /// `\n` includes it. Returns `start` when not even one glyph fits.
    fn line_end(&self, text: &str, start: usize, width: f32) -> usize;

    /// Maximal contiguous range starting at `start` that fits `rect`. Empty
    /// when nothing fits or `start` is at the end of `text`.
    fn visible_range(&self, text: &str, start: usize, rect: &ContentRect) -> Range<usize> {
        let rows = fit_count(rect.height, self.line_height());
        let mut pos = start;
        for _ in 0..rows {
            if pos >= text.len() {
                break;
            }
            let end = self.line_end(text, pos, rect.width);
            if end <= pos {
                break;
            }
            pos = end;
        }
        start..pos
    }
}

/// How many items of `size` fit in `extent`, tolerating float noise.
pub fn fit_count(extent: f32, size: f32) -> usize {
    if !(size > 0.0) || !(extent > 0.0) {
        return 0;
    }
    (extent / size + EPSILON).floor() as usize
}

/// Fixed-pitch metrics matching the Courier family used in the PDF output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    pub font_size: f32,
}

impl MonospaceMetrics {
    pub fn new(font_size: f32) -> Self {
        Self { font_size }
    }

    /// Columns available in `width`.
    pub fn columns(&self, width: f32) -> usize {
        fit_count(width, self.advance())
    }

    /// Display width of one char in columns.
    pub fn char_columns(c: char) -> usize {
        match c {
            '\t' => TAB_WIDTH,
            '\r' | '\n' => 0,
            _ => 1,
        }
    }

    /// Splits all of `text` into visual lines of at most `cols` columns.
    pub fn visual_lines(&self, text: &str, cols: usize) -> Vec<Range<usize>> {
        let mut lines = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let end = wrap_line(text, pos, cols);
            let end = if end > pos { end } else { next_boundary(text, pos) };
            lines.push(pos..end);
            pos = end;
        }
        lines
    }
}

impl TextMeasure for MonospaceMetrics {
    fn advance(&self) -> f32 {
        self.font_size * ADVANCE_EM
    }

    fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_EM
    }

    fn line_end(&self, text: &str, start: usize, width: f32) -> usize {
        wrap_line(text, start, self.columns(width))
    }
}

/// One visual line of at most `cols` columns. The first glyph is always
/// taken when `cols > 0`, even if wider than the line.
fn wrap_line(text: &str, start: usize, cols: usize) -> usize {
    if cols == 0 {
        return start;
    }
    let mut used = 0usize;
    let mut taken_glyph = false;
    for (offset, c) in text[start..].char_indices() {
        let at = start + offset;
        if c == '\n' {
            return at + 1;
        }
        let width = MonospaceMetrics::char_columns(c);
        if taken_glyph && used + width > cols {
            return at;
        }
        used += width;
        if width > 0 {
            taken_glyph = true;
        }
    }
    text.len()
}

/// Offset just past the char at `pos`.
pub fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len(), |c| pos + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> MonospaceMetrics {
        MonospaceMetrics::new(10.0)
    }

    #[test]
    fn metrics_scale_with_font_size() {
        assert!((metrics().advance() - 6.0).abs() < 1e-6);
        assert!((metrics().line_height() - 12.5).abs() < 1e-6);
        assert_eq!(metrics().columns(60.0), 10);
        assert_eq!(metrics().columns(59.0), 9);
    }

    #[test]
    fn lines_break_at_newline_and_width() {
        let text = "abc\n0123456789XY\n";
        let lines = metrics().visual_lines(text, 10);
        let pieces: Vec<&str> = lines.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(pieces, vec!["abc\n", "0123456789", "XY\n"]);
    }

    #[test]
    fn full_line_swallows_its_newline() {
        let text = "0123456789\nz";
        let pieces: Vec<&str> = metrics()
            .visual_lines(text, 10)
            .into_iter()
            .map(|r| &text[r])
            .collect();
        assert_eq!(pieces, vec!["0123456789\n", "z"]);
    }

    #[test]
    fn tabs_take_four_columns_and_cr_none() {
        let text = "\t\tab\r\n";
        let pieces: Vec<&str> = metrics()
            .visual_lines(text, 9)
            .into_iter()
            .map(|r| &text[r])
            .collect();
        assert_eq!(pieces, vec!["\t\ta", "b\r\n"]);
    }

    #[test]
    fn nothing_fits_in_zero_width() {
        let rect = ContentRect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 100.0,
        };
        assert_eq!(metrics().visible_range("abc", 0, &rect), 0..0);
    }

    #[test]
    fn visible_range_stops_after_row_budget() {
        let rect = ContentRect {
            x: 0.0,
            y: 0.0,
            width: 60.0,
            height: 25.0,
        };
        let text = "a\nb\nc\n";
        assert_eq!(metrics().visible_range(text, 0, &rect), 0..4);
        assert_eq!(metrics().visible_range(text, 4, &rect), 4..6);
    }

    #[test]
    fn multibyte_chars_stay_whole() {
        let text = "ééé";
        let lines = metrics().visual_lines(text, 2);
        assert_eq!(lines, vec![0..4, 4..6]);
    }
}
