//! Concatenates extracted files into one prompt string.

use crate::extract::ExtractedContent;
use crate::styled::{FontWeight, StyledRun};
use crate::tree::FileTree;
use colored::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    /// `<name>` ... `</name>` blocks.
    #[default]
    Standard,
    /// Standard blocks preceded by a `<file_tree>` prelude.
    WithTree,
    /// `## name` headings with fenced code.
    Markdown,
}

impl PromptFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptFormat::Standard => "standard",
            PromptFormat::WithTree => "with_tree",
            PromptFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptOptions {
    pub format: PromptFormat,
    pub include_file_tree: bool,
    /// Emit styled runs as ANSI-colored text.
    pub syntax_highlighting: bool,
}

impl PromptOptions {
    fn wants_tree(&self) -> bool {
        self.format == PromptFormat::WithTree || self.include_file_tree
    }
}

/// Builds the prompt for `contents` in the given order. `tree` is used only
/// when the options ask for a tree prelude.
pub fn assemble(contents: &[ExtractedContent], tree: Option<&FileTree>, options: &PromptOptions) -> String {
    let mut out = String::new();

    if options.wants_tree() {
        if let Some(tree) = tree {
            let rendered = tree.render_text();
            match options.format {
                PromptFormat::Markdown => {
                    let _ = write!(out, "## File Tree\n\n```\n{}```\n\n", rendered);
                }
                PromptFormat::Standard | PromptFormat::WithTree => {
                    let _ = write!(out, "<file_tree>\n{}</file_tree>\n\n", rendered);
                }
            }
        } else {
            log::debug!("Tree prelude requested but no tree was supplied.");
        }
    }

    for content in contents {
        let name = content.source.file_name();
        let body = if options.syntax_highlighting {
            ansi_text(&content.styled_runs)
        } else {
            content.text.clone()
        };
        match options.format {
            PromptFormat::Standard | PromptFormat::WithTree => {
                let _ = write!(out, "<{name}>\n{body}\n</{name}>\n\n");
            }
            PromptFormat::Markdown => {
                let _ = write!(
                    out,
                    "## {}\n\n```{}\n{}\n```\n\n",
                    name, content.source.extension, body
                );
            }
        }
    }

    log::debug!(
        "Assembled {} prompt from {} file(s), {} bytes.",
        options.format,
        contents.len(),
        out.len()
    );
    out
}

/// Writes SGR sequences whether or not stdout is a terminal.
fn ansi_text(runs: &[StyledRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let mut codes: Vec<String> = Vec::new();
        if run.weight == FontWeight::Bold {
            codes.push("1".to_string());
        }
        if let Some(color) = run.color {
            codes.push(
                Color::TrueColor {
                    r: color.0,
                    g: color.1,
                    b: color.2,
                }
                .to_fg_str()
                .to_string(),
            );
        }
        if codes.is_empty() || run.text.is_empty() {
            out.push_str(&run.text);
        } else {
            let _ = write!(out, "\x1b[{}m{}\x1b[0m", codes.join(";"), run.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ContentKind, SourceFile};
    use crate::styled::Rgb;
    use regex::Regex;
    use std::path::PathBuf;

    fn content(path: &str, text: &str) -> ExtractedContent {
        let path = PathBuf::from(path);
        let source = SourceFile {
            extension: crate::source::extension_of(&path),
            path,
            byte_size: text.len() as u64,
            mod_time: None,
        };
        ExtractedContent::text(source, text.to_string(), vec![StyledRun::plain(text)])
    }

    fn fifty_lines() -> String {
        (1..=50)
            .map(|n| format!("print({})", n))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn standard_format_matches_literal_blocks() {
        let body = fifty_lines();
        let files = vec![content("a.py", &body), content("b.txt", "")];
        let prompt = assemble(&files, None, &PromptOptions::default());
        assert_eq!(prompt, format!("<a.py>\n{}\n</a.py>\n\n<b.txt>\n\n</b.txt>\n\n", body));
    }

    #[test]
    fn markdown_format_fences_with_extension() {
        let files = vec![content("src/main.rs", "fn main() {}")];
        let options = PromptOptions {
            format: PromptFormat::Markdown,
            ..Default::default()
        };
        assert_eq!(
            assemble(&files, None, &options),
            "## main.rs\n\n```rs\nfn main() {}\n```\n\n"
        );
    }

    #[test]
    fn with_tree_prepends_tree_once() {
        let files = vec![content("src/a.rs", "a"), content("src/b.rs", "b")];
        let tree = FileTree::build(&["src/a.rs", "src/b.rs"]);
        let options = PromptOptions {
            format: PromptFormat::WithTree,
            ..Default::default()
        };
        assert_eq!(
            assemble(&files, Some(&tree), &options),
            "<file_tree>\nsrc/\n  a.rs\n  b.rs\n</file_tree>\n\n<a.rs>\na\n</a.rs>\n\n<b.rs>\nb\n</b.rs>\n\n"
        );
    }

    #[test]
    fn standard_format_ignores_tree_unless_requested() {
        let files = vec![content("a.txt", "x")];
        let tree = FileTree::build(&["a.txt"]);
        let plain = assemble(&files, Some(&tree), &PromptOptions::default());
        assert!(!plain.contains("<file_tree>"));

        let options = PromptOptions {
            include_file_tree: true,
            ..Default::default()
        };
        assert!(assemble(&files, Some(&tree), &options).starts_with("<file_tree>\n./\n  a.txt\n"));
    }

    #[test]
    fn reordering_only_moves_blocks() {
        let a = content("a.md", "alpha");
        let b = content("b.md", "beta");
        let forward = assemble(&[a.clone(), b.clone()], None, &PromptOptions::default());
        let backward = assemble(&[b, a], None, &PromptOptions::default());
        let blocks = |s: &str| {
            let mut parts: Vec<String> = s.split("\n\n").map(str::to_string).collect();
            parts.sort();
            parts
        };
        assert_ne!(forward, backward);
        assert_eq!(blocks(&forward), blocks(&backward));
    }

    #[test]
    fn highlighting_never_changes_visible_text() {
        let text = "let x = 1;";
        let path = PathBuf::from("x.rs");
        let source = SourceFile {
            extension: "rs".to_string(),
            path,
            byte_size: text.len() as u64,
            mod_time: None,
        };
        let runs = vec![
            StyledRun::styled("let", Rgb::new(1, 2, 3), FontWeight::Bold),
            StyledRun::plain(" x = "),
            StyledRun::styled("1", Rgb::new(4, 5, 6), FontWeight::Regular),
            StyledRun::plain(";"),
        ];
        let files = vec![ExtractedContent::text(source, text.to_string(), runs)];
        let options = PromptOptions {
            syntax_highlighting: true,
            ..Default::default()
        };
        let ansi = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        let highlighted = assemble(&files, None, &options);
        assert!(highlighted.contains("\x1b[1;38;2;1;2;3mlet\x1b[0m"));
        assert!(highlighted.contains("\x1b[38;2;4;5;6m1\x1b[0m"));
        assert_eq!(ansi.replace_all(&highlighted, ""), "<x.rs>\nlet x = 1;\n</x.rs>\n\n");
        assert_eq!(files[0].kind, ContentKind::Text);
    }
}
