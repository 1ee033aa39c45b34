//! Syntax highlighting: `(text, language) -> [StyledRun]`.
//!
//! Each language compiles to one regex with a named group per token class.
//! Text between matches becomes unstyled runs, so the output always
//! concatenates back to the input.

pub mod languages;

pub use languages::{Family, Language, LanguageSpec};

use crate::error::{AppError, Result};
use crate::styled::{FontWeight, Rgb, StyledRun, coalesce, total_len};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Keyword,
    String,
    Comment,
    Number,
    Literal,
    Key,
    Tag,
    Heading,
    Emphasis,
    Code,
    Link,
}

const GROUPS: [(&str, TokenClass); 11] = [
    ("comment", TokenClass::Comment),
    ("string", TokenClass::String),
    ("key", TokenClass::Key),
    ("heading", TokenClass::Heading),
    ("code", TokenClass::Code),
    ("tag", TokenClass::Tag),
    ("link", TokenClass::Link),
    ("emphasis", TokenClass::Emphasis),
    ("number", TokenClass::Number),
    ("literal", TokenClass::Literal),
    ("keyword", TokenClass::Keyword),
];

impl TokenClass {
    pub fn style(self) -> (Option<Rgb>, FontWeight) {
        match self {
            TokenClass::Keyword => (Some(Rgb::new(167, 29, 93)), FontWeight::Bold),
            TokenClass::String => (Some(Rgb::new(24, 128, 56)), FontWeight::Regular),
            TokenClass::Comment => (Some(Rgb::new(128, 128, 128)), FontWeight::Regular),
            TokenClass::Number => (Some(Rgb::new(0, 134, 179)), FontWeight::Regular),
            TokenClass::Literal => (Some(Rgb::new(0, 92, 197)), FontWeight::Bold),
            TokenClass::Key => (Some(Rgb::new(0, 92, 197)), FontWeight::Regular),
            TokenClass::Tag => (Some(Rgb::new(199, 98, 0)), FontWeight::Regular),
            TokenClass::Heading => (Some(Rgb::new(9, 105, 218)), FontWeight::Bold),
            TokenClass::Emphasis => (None, FontWeight::Bold),
            TokenClass::Code => (Some(Rgb::new(130, 80, 223)), FontWeight::Regular),
            TokenClass::Link => (Some(Rgb::new(9, 105, 218)), FontWeight::Regular),
        }
    }
}

/// A source of styled runs. Implementations may fail; callers go through
/// [`highlight_or_plain`], which never does.
pub trait SyntaxHighlighter: Send + Sync {
    fn highlight(&self, text: &str, language: Language) -> Result<Vec<StyledRun>>;
}

/// Regex-table highlighter used by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexHighlighter;

impl SyntaxHighlighter for RegexHighlighter {
    fn highlight(&self, text: &str, language: Language) -> Result<Vec<StyledRun>> {
        let regex = PATTERNS
            .get(&language)
            .and_then(|r| r.as_ref())
            .ok_or_else(|| {
                AppError::extraction(
                    language.id(),
                    "no highlighting pattern available for language",
                )
            })?;
        Ok(tokenize(text, regex))
    }
}

static PATTERNS: Lazy<HashMap<Language, Option<Regex>>> = Lazy::new(|| {
    Language::ALL
        .iter()
        .map(|&lang| {
            let source = pattern_for(lang);
            let compiled = match Regex::new(&source) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    log::warn!("Highlight pattern for {} failed to compile: {}", lang, e);
                    None
                }
            };
            (lang, compiled)
        })
        .collect()
});

/// Highlights `text`, falling back to one unstyled run when there is no
/// language or the highlighter fails. Empty text yields no runs.
pub fn highlight_or_plain(
    highlighter: &dyn SyntaxHighlighter,
    text: &str,
    language: Option<Language>,
) -> Vec<StyledRun> {
    if text.is_empty() {
        return Vec::new();
    }
    let Some(language) = language else {
        return vec![StyledRun::plain(text)];
    };
    match highlighter.highlight(text, language) {
        Ok(runs) if total_len(&runs) == text.len() => runs,
        Ok(_) => {
            log::warn!("Highlighter for {} dropped content, using plain text", language);
            vec![StyledRun::plain(text)]
        }
        Err(e) => {
            log::debug!("Highlighting as {} failed: {}", language, e);
            vec![StyledRun::plain(text)]
        }
    }
}

/// Convenience wrapper resolving the language from a file extension.
pub fn highlight_extension(text: &str, extension: &str) -> Vec<StyledRun> {
    highlight_or_plain(&RegexHighlighter, text, Language::from_extension(extension))
}

fn tokenize(text: &str, regex: &Regex) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut last = 0usize;
    for caps in regex.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() == whole.end() {
            continue;
        }
        let class = GROUPS
            .iter()
            .find(|(name, _)| caps.name(name).is_some())
            .map(|(_, class)| *class);
        let Some(class) = class else { continue };
        if whole.start() > last {
            runs.push(StyledRun::plain(&text[last..whole.start()]));
        }
        let (color, weight) = class.style();
        runs.push(StyledRun {
            text: whole.as_str().to_string(),
            color,
            weight,
            is_line_number: false,
        });
        last = whole.end();
    }
    if last < text.len() {
        runs.push(StyledRun::plain(&text[last..]));
    }
    coalesce(runs)
}

const STRING_DOUBLE: &str = r#""(?:[^"\\\n]|\\.)*""#;
const STRING_SINGLE: &str = r#"'(?:[^'\\\n]|\\.)*'"#;
const NUMBER: &str = r"\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b";

fn pattern_for(language: Language) -> String {
    let spec = language.spec();
    match spec.family {
        Family::Code => code_pattern(&spec),
        Family::Data => data_pattern(language),
        Family::Markdown => [
            r"(?P<code>(?s:```.*?```)|`[^`\n]+`)",
            r"(?P<heading>(?m:^#{1,6}[ \t][^\n]*))",
            r"(?P<link>\[[^\]\n]*\]\([^)\n]*\))",
            r"(?P<emphasis>\*\*[^*\n]+\*\*|__[^_\n]+__)",
        ]
        .join("|"),
        Family::Markup => format!(
            r"(?P<comment>(?s:<!--.*?-->))|(?P<string>{})|(?P<tag></?[A-Za-z!?][\w:.-]*|/?>|\?>)",
            STRING_DOUBLE
        ),
    }
}

fn code_pattern(spec: &LanguageSpec) -> String {
    let mut comments: Vec<String> = spec
        .line_comments
        .iter()
        .map(|marker| format!("{}[^\\n]*", regex::escape(marker)))
        .collect();
    if let Some((open, close)) = spec.block_comment {
        comments.insert(
            0,
            format!("(?s:{}.*?{})", regex::escape(open), regex::escape(close)),
        );
    }

    let mut strings = vec![STRING_DOUBLE.to_string()];
    if spec.single_quote_strings {
        strings.push(STRING_SINGLE.to_string());
    }

    let word_keywords: Vec<String> = spec
        .keywords
        .iter()
        .filter(|k| k.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_'))
        .map(|k| regex::escape(k))
        .collect();
    let symbol_keywords: Vec<String> = spec
        .keywords
        .iter()
        .filter(|k| !k.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_'))
        .map(|k| regex::escape(k))
        .collect();
    let mut keyword_alternatives = Vec::new();
    if !word_keywords.is_empty() {
        keyword_alternatives.push(format!(r"\b(?:{})\b", word_keywords.join("|")));
    }
    if !symbol_keywords.is_empty() {
        keyword_alternatives.push(format!(r"(?:{})\b", symbol_keywords.join("|")));
    }

    let mut parts = Vec::new();
    if !comments.is_empty() {
        parts.push(format!("(?P<comment>{})", comments.join("|")));
    }
    parts.push(format!("(?P<string>{})", strings.join("|")));
    parts.push(format!("(?P<number>{})", NUMBER));
    if !keyword_alternatives.is_empty() {
        parts.push(format!("(?P<keyword>{})", keyword_alternatives.join("|")));
    }
    parts.join("|")
}

fn data_pattern(language: Language) -> String {
    let mut parts = Vec::new();
    if let Some(marker) = language.data_comment() {
        parts.push(format!("(?P<comment>{}[^\\n]*)", regex::escape(marker)));
    }
    parts.push(format!(
        r"(?P<key>{}[ \t]*:|(?m:^[ \t]*-?[ \t]*[A-Za-z_][\w.-]*[ \t]*[:=]))",
        STRING_DOUBLE
    ));
    if language == Language::Toml {
        parts.push(r"(?P<heading>(?m:^[ \t]*\[[^\]\n]*\][ \t]*$))".to_string());
    }
    parts.push(format!("(?P<string>{}|{})", STRING_DOUBLE, STRING_SINGLE));
    parts.push(format!("(?P<number>{})", NUMBER));
    parts.push(r"(?P<literal>\b(?:true|false|null)\b)".to_string());
    parts.join("|")
}
