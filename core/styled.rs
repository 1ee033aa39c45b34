//! The styled text model shared by the highlighter, the prompt assembler and the
//! pagination engine.
//!
//! A file's content is an ordered `Vec<StyledRun>`; concatenating the run texts in
//! order always reproduces the extracted text exactly.

use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb(r, g, b)
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect.
    pub fn unit(self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    /// `None` renders with the theme's foreground color.
    pub color: Option<Rgb>,
    pub weight: FontWeight,
    pub is_line_number: bool,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            weight: FontWeight::Regular,
            is_line_number: false,
        }
    }

    pub fn styled(text: impl Into<String>, color: Rgb, weight: FontWeight) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            weight,
            is_line_number: false,
        }
    }

    pub fn line_number(text: impl Into<String>, color: Rgb) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            weight: FontWeight::Regular,
            is_line_number: true,
        }
    }

    fn same_style(&self, other: &StyledRun) -> bool {
        self.color == other.color
            && self.weight == other.weight
            && self.is_line_number == other.is_line_number
    }

    fn with_text(&self, text: &str) -> StyledRun {
        StyledRun {
            text: text.to_string(),
            color: self.color,
            weight: self.weight,
            is_line_number: self.is_line_number,
        }
    }
}

/// Concatenated text of a run sequence.
pub fn plain_text(runs: &[StyledRun]) -> String {
    let mut out = String::with_capacity(runs.iter().map(|r| r.text.len()).sum());
    for run in runs {
        out.push_str(&run.text);
    }
    out
}

pub fn total_len(runs: &[StyledRun]) -> usize {
    runs.iter().map(|r| r.text.len()).sum()
}

/// Returns the runs covering the byte range `range` of the concatenated text,
/// splitting the runs at either end. Empty runs inside the range are dropped.
///
/// `range` must lie on char boundaries of the concatenated text.
pub fn slice_runs(runs: &[StyledRun], range: Range<usize>) -> Vec<StyledRun> {
    let mut out = Vec::new();
    if range.start >= range.end {
        return out;
    }
    let mut offset = 0usize;
    for run in runs {
        let run_start = offset;
        let run_end = offset + run.text.len();
        offset = run_end;
        if run_end <= range.start {
            continue;
        }
        if run_start >= range.end {
            break;
        }
        let from = range.start.max(run_start) - run_start;
        let to = range.end.min(run_end) - run_start;
        if from < to {
            out.push(run.with_text(&run.text[from..to]));
        }
    }
    out
}

/// Merges adjacent runs that share the same style and drops empty runs.
pub fn coalesce(runs: Vec<StyledRun>) -> Vec<StyledRun> {
    let mut out: Vec<StyledRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<StyledRun> {
        vec![
            StyledRun::styled("fn", Rgb::new(1, 2, 3), FontWeight::Bold),
            StyledRun::plain(" main() {\n"),
            StyledRun::styled("\"héllo\"", Rgb::new(9, 9, 9), FontWeight::Regular),
            StyledRun::plain("\n}"),
        ]
    }

    #[test]
    fn slices_cover_the_text_without_loss() {
        let runs = sample();
        let text = plain_text(&runs);
        let cuts = [0, 1, 5, 11, 13, text.len()];
        let mut rebuilt = Vec::new();
        for pair in cuts.windows(2) {
            rebuilt.extend(slice_runs(&runs, pair[0]..pair[1]));
        }
        assert_eq!(plain_text(&rebuilt), text);
        assert_eq!(coalesce(rebuilt), runs);
    }

    #[test]
    fn slice_keeps_style_of_split_run() {
        let runs = sample();
        let piece = slice_runs(&runs, 1..4);
        assert_eq!(piece.len(), 2);
        assert_eq!(piece[0].text, "n");
        assert_eq!(piece[0].weight, FontWeight::Bold);
        assert_eq!(piece[1].text, " m");
        assert_eq!(piece[1].color, None);
    }

    #[test]
    fn empty_range_yields_no_runs() {
        assert!(slice_runs(&sample(), 3..3).is_empty());
    }
}
