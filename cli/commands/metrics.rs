use crate::cli_args::MetricsArgs;
use crate::commands::{resolve_inputs, services_for};
use crate::load_config_for_command;
use crate::output::{print_metrics_pretty_table, write_to_stdout};
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tiktoken_rs::cl100k_base;
use uno_core::{ExtractOptions, Extractor, validate};

#[derive(Debug, Serialize)]
pub struct ProjectMetrics {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    pub total_bytes_readable: String,
    pub estimated_tokens: usize,
    pub files_details: Vec<FileMetrics>,
}

#[derive(Debug, Serialize)]
pub struct FileMetrics {
    pub path: String,
    pub kind: String,
    pub lines: usize,
    pub bytes: u64,
    pub bytes_readable: String,
    pub estimated_tokens: usize,
}

pub fn handle_metrics_command(args: MetricsArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.config, &args.inputs)
        .context("Failed to load configuration for metrics command")?;
    let files = resolve_inputs(&args.inputs, &config)?;
    let base_dir = std::env::current_dir().context("Failed to read current directory")?;

    log::debug!("Calculating metrics for {} file(s)...", files.len());
    let metrics = calculate_metrics(&files, &base_dir, config.max_file_size_bytes()?, &config, quiet)?;
    log::debug!("Metrics calculation complete.");

    if args.json {
        let json = serde_json::to_string_pretty(&metrics).context("Failed to serialize metrics")?;
        write_to_stdout(&json)
    } else {
        print_metrics_pretty_table(&metrics)
    }
}

fn calculate_metrics(
    files: &[PathBuf],
    base_dir: &Path,
    max_file_size: u64,
    config: &uno_core::Config,
    quiet: bool,
) -> Result<ProjectMetrics> {
    let bpe = cl100k_base().map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
    let services = services_for(config);
    let extractor = Extractor::new(&services, ExtractOptions::default());

    let mut files_details = Vec::with_capacity(files.len());
    for path in files {
        let source = validate(path, max_file_size)?;
        let content = match extractor.extract(&source) {
            Ok(content) => content,
            Err(e) => {
                if !quiet {
                    eprintln!("{} Skipping {}: {}", "⚠️".yellow(), path.display(), e);
                }
                continue;
            }
        };
        let relative = pathdiff::diff_paths(path, base_dir)
            .unwrap_or_else(|| path.clone())
            .to_string_lossy()
            .to_string();
        files_details.push(FileMetrics {
            path: relative,
            kind: format!("{:?}", source.category()),
            lines: content.text.lines().count(),
            bytes: source.byte_size,
            bytes_readable: readable(source.byte_size),
            estimated_tokens: bpe.encode_ordinary(&content.text).len(),
        });
    }

    let total_bytes = files_details.iter().map(|f| f.bytes).sum();
    Ok(ProjectMetrics {
        total_files: files_details.len(),
        total_lines: files_details.iter().map(|f| f.lines).sum(),
        total_bytes,
        total_bytes_readable: readable(total_bytes),
        estimated_tokens: files_details.iter().map(|f| f.estimated_tokens).sum(),
        files_details,
    })
}

fn readable(bytes: u64) -> String {
    format!(
        "{:.1}",
        Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary)
    )
}
