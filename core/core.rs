pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod highlight;
pub mod monitor;
pub mod paginate;
pub mod prompt;
pub mod session;
pub mod source;
pub mod styled;
pub mod theme;
pub mod tree;

pub use config::Config;
pub use document::{Document, DocumentAssembler, DocumentOptions, DocumentPage, TocEntry};
pub use error::{AppError, Result};
pub use extract::{ExtractOptions, ExtractedContent, Extractor, Services};
pub use highlight::{RegexHighlighter, SyntaxHighlighter};
pub use monitor::PerformanceMonitor;
pub use paginate::{LayoutOptions, MonospaceMetrics, Page, PageSize, Paginator, Size, TextMeasure};
pub use prompt::{PromptFormat, PromptOptions};
pub use session::{
    Artifact, Mode, ProcessingSession, RunControl, RunOptions, RunOutcome, SessionEvent, run_pipeline,
};
pub use source::{ContentKind, FileCategory, SourceFile, classify, expand_inputs, validate};
pub use styled::{FontWeight, Rgb, StyledRun};
pub use theme::Theme;
pub use tree::FileTree;
