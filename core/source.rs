//! Input validation, classification and directory expansion.

use crate::config::InputsConfig;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Immutable snapshot of a file taken at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Lowercased extension without the dot, empty if none.
    pub extension: String,
    pub byte_size: u64,
    pub mod_time: Option<DateTime<Utc>>,
}

impl SourceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn category(&self) -> FileCategory {
        classify(&self.extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Code,
    Data,
    Documentation,
    OfficeDocument,
    Image,
    PagedDocument,
    Unknown,
}

/// What the extractor produces for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Image,
    PagedDocument,
}

impl FileCategory {
    pub fn content_kind(self) -> ContentKind {
        match self {
            FileCategory::Image => ContentKind::Image,
            FileCategory::PagedDocument => ContentKind::PagedDocument,
            _ => ContentKind::Text,
        }
    }
}

const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "ts", "tsx", "swift", "java", "kt", "kts", "c", "h", "cpp",
    "hpp", "cc", "cxx", "m", "mm", "cs", "go", "rb", "php", "sh", "bash", "zsh", "fish", "sql",
    "html", "htm", "css", "scss", "lua", "pl", "r", "scala", "dart", "vue", "svelte",
];
const DATA_EXTENSIONS: &[&str] = &[
    "json", "yaml", "yml", "toml", "xml", "csv", "tsv", "ini", "cfg", "conf", "lock", "env",
];
const DOCUMENTATION_EXTENSIONS: &[&str] =
    &["md", "markdown", "txt", "rst", "adoc", "org", "tex", "ipynb", "rmd", "qmd", "log"];
const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "rtf", "odt", "pages", "pptx", "ppt", "key", "xlsx", "xls", "numbers", "ods",
];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp", "heic",
];
const PAGED_DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Pure mapping from a (case-insensitive) extension to a category.
pub fn classify(extension: &str) -> FileCategory {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let ext = ext.as_str();
    if CODE_EXTENSIONS.contains(&ext) {
        FileCategory::Code
    } else if DATA_EXTENSIONS.contains(&ext) {
        FileCategory::Data
    } else if DOCUMENTATION_EXTENSIONS.contains(&ext) {
        FileCategory::Documentation
    } else if OFFICE_EXTENSIONS.contains(&ext) {
        FileCategory::OfficeDocument
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        FileCategory::Image
    } else if PAGED_DOCUMENT_EXTENSIONS.contains(&ext) {
        FileCategory::PagedDocument
    } else {
        FileCategory::Unknown
    }
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Checks that `path` is a readable regular file no larger than `max_size`
/// bytes and snapshots its metadata.
pub fn validate(path: &Path, max_size: u64) -> Result<SourceFile> {
    let metadata = fs::metadata(path).map_err(|e| AppError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_file() {
        return Err(AppError::Unreadable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    let size = metadata.len();
    if size > max_size {
        log::debug!(
            "Rejecting {}: {} bytes exceeds limit of {}",
            path.display(),
            size,
            max_size
        );
        return Err(AppError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_size,
        });
    }
    let mod_time = metadata.modified().ok().map(DateTime::<Utc>::from);
    Ok(SourceFile {
        path: path.to_path_buf(),
        extension: extension_of(path),
        byte_size: size,
        mod_time,
    })
}

/// Validates every path in order. The first failure aborts the whole batch.
pub fn validate_all(paths: &[PathBuf], max_size: u64) -> Result<Vec<SourceFile>> {
    paths.iter().map(|p| validate(p, max_size)).collect()
}

/// Expands directory arguments into the files below them. Explicit files keep
/// their position; files found in a directory are sorted by path. Duplicates
/// are dropped, keeping the first occurrence.
pub fn expand_inputs(inputs: &[PathBuf], config: &InputsConfig) -> Result<Vec<PathBuf>> {
    let exclude_set = build_glob_set(&config.exclude)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for input in inputs {
        if input.is_dir() {
            log::debug!("Expanding directory input: {}", input.display());
            let mut found = walk_directory(input, config.use_gitignore, &exclude_set)?;
            found.sort();
            for path in found {
                if seen.insert(path.clone()) {
                    out.push(path);
                }
            }
        } else if seen.insert(input.clone()) {
            out.push(input.clone());
        } else {
            log::trace!("Skipping duplicate input: {}", input.display());
        }
    }
    log::info!("Resolved {} input file(s).", out.len());
    Ok(out)
}

fn walk_directory(root: &Path, use_gitignore: bool, exclude_set: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true);
    builder.ignore(use_gitignore);
    builder.git_ignore(use_gitignore);
    builder.git_exclude(use_gitignore);
    builder.require_git(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
        if relative.components().next() == Some(std::path::Component::Normal(".git".as_ref())) {
            continue;
        }
        if exclude_set.is_match(&relative) {
            log::trace!("Excluded by pattern: {}", relative.display());
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        let glob = Glob::new(&processed_pattern).map_err(|e| {
            AppError::Glob(format!(
                "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                pattern_str, processed_pattern, e
            ))
        })?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
