use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Too Large: '{path}' is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Unreadable File: '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction Failed: '{path}': {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Layout Failed for '{file}': {reason}")]
    LayoutFailed { file: String, reason: String },

    #[error("Assembly Error: {0}")]
    Assembly(String),

    #[error("PDF Error: {0}")]
    Pdf(String),

    #[error("Ignore Error: {0}")]
    Ignore(#[from] ignore::Error),

    #[error("Glob Pattern Error: {0}")]
    Glob(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl AppError {
    /// Validation failures abort a whole batch before any file is processed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::FileTooLarge { .. } | AppError::Unreadable { .. }
        )
    }

    pub fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AppError::ExtractionFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<globset::Error> for AppError {
    fn from(err: globset::Error) -> Self {
        AppError::Glob(format!("Globset error: {}", err))
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Pdf(err.to_string())
    }
}

impl From<parse_duration::parse::Error> for AppError {
    fn from(err: parse_duration::parse::Error) -> Self {
        AppError::InvalidArgument(format!("Invalid duration: {}", err))
    }
}
