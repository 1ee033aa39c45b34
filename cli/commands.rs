pub mod completion;
pub mod config;
pub mod metrics;
pub mod pdf;
pub mod prompt;
pub mod tree;

use crate::cli_args::InputOpts;
use crate::output;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use uno_core::{
    AppError, Config, Mode, PerformanceMonitor, RunControl, RunOptions, RunOutcome, Services,
    expand_inputs, run_pipeline,
};

/// Expands `~` and directory arguments into the ordered file list.
pub fn resolve_inputs(inputs: &InputOpts, config: &Config) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = inputs
        .paths
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()))
        .collect();
    let files = expand_inputs(&paths, &config.inputs).context("Failed to expand input paths")?;
    if files.is_empty() {
        anyhow::bail!(AppError::InvalidArgument(
            "No input files found".to_string()
        ));
    }
    Ok(files)
}

pub fn services_for(config: &Config) -> Services {
    Services::default().with_monitor(Arc::new(PerformanceMonitor::new(config.general.monitor)))
}

pub fn run_options_for(config: &Config, mode: Mode) -> Result<RunOptions> {
    let mut options = RunOptions::from_config(config, mode)?;
    options.document.base_dir = std::env::current_dir().ok();
    Ok(options)
}

/// Runs one batch in the foreground, printing progress and warnings to stderr.
pub fn run_batch(files: &[PathBuf], config: &Config, mode: Mode, quiet: bool) -> Result<RunOutcome> {
    let options = run_options_for(config, mode)?;
    let services = services_for(config);
    if services.monitor.is_enabled() {
        log::info!("Host: {}", PerformanceMonitor::host_summary());
    }

    let control = RunControl::new();
    let mut progress = |done: usize, total: usize| {
        if !quiet {
            output::print_progress(done, total);
        }
    };
    let outcome = run_pipeline(files, &options, &services, &control, &mut progress)?;

    if !quiet {
        output::report_warnings(&outcome.warnings);
    }
    output::report_timings(&services.monitor);
    Ok(outcome)
}
