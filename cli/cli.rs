mod cli_args;
mod commands;
mod output;
mod watch;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::process;

use cli_args::{Cli, Commands, ConfigOpts, DocumentStyleOpts, InputOpts, PromptStyleOpts};
use uno_core::{AppError, Config, PageSize, PromptFormat, Theme};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AppError>() {
        Some(AppError::Config(_))
        | Some(AppError::TomlParse(_))
        | Some(AppError::TomlSerialize(_))
        | Some(AppError::Glob(_))
        | Some(AppError::InvalidArgument(_)) => 1,
        Some(AppError::FileTooLarge { .. })
        | Some(AppError::Unreadable { .. })
        | Some(AppError::Io(_))
        | Some(AppError::FileRead { .. })
        | Some(AppError::FileWrite { .. })
        | Some(AppError::Ignore(_)) => 2,
        Some(AppError::ExtractionFailed { .. })
        | Some(AppError::LayoutFailed { .. })
        | Some(AppError::Assembly(_))
        | Some(AppError::Pdf(_)) => 3,
        Some(AppError::Cancelled) => 4,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Prompt(args) => {
                log::debug!("Executing 'prompt' command...");
                commands::prompt::handle_prompt_command(args, quiet)?;
            }
            Commands::Pdf(args) => {
                log::debug!("Executing 'pdf' command...");
                commands::pdf::handle_pdf_command(args, quiet)?;
            }
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args)?;
            }
            Commands::Metrics(args) => {
                log::debug!("Executing 'metrics' command...");
                commands::metrics::handle_metrics_command(args, quiet)?;
            }
            Commands::Watch(args) => {
                log::debug!("Executing 'watch' command...");
                watch::run_watch_mode(args, quiet, verbose)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let base_dir = std::env::current_dir().context("Failed to read current directory")?;
                commands::config::handle_config_command(&args, &base_dir, quiet)?;
            }
        },
    }
    Ok(())
}

/// Loads the config file selected by `opts` (or the defaults) and applies
/// input overrides from the command line.
pub fn load_config_for_command(opts: &ConfigOpts, inputs: &InputOpts) -> Result<Config> {
    let base_dir = std::env::current_dir().context("Failed to read current directory")?;
    let config_path = Config::resolve_config_path(&base_dir, opts.config.as_ref(), opts.no_config)
        .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if inputs.no_gitignore {
        config.inputs.use_gitignore = false;
    }
    config.inputs.exclude.extend(inputs.exclude.iter().cloned());
    if let Some(size) = &inputs.max_file_size {
        config.general.max_file_size = size.clone();
    }
    if let Some(workers) = inputs.workers {
        config.general.workers = workers;
    }
    config.validate()?;
    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}

pub fn apply_prompt_overrides(config: &mut Config, style: &PromptStyleOpts) -> Result<()> {
    if let Some(format) = &style.format {
        config.prompt.format = match format.as_str() {
            "standard" => PromptFormat::Standard,
            "with-tree" => PromptFormat::WithTree,
            "markdown" => PromptFormat::Markdown,
            other => {
                anyhow::bail!(AppError::InvalidArgument(format!(
                    "Unknown prompt format: {}",
                    other
                )))
            }
        };
    }
    if style.tree {
        config.prompt.include_file_tree = true;
    }
    if style.highlight {
        config.prompt.syntax_highlighting = true;
    }
    Ok(())
}

pub fn apply_document_overrides(config: &mut Config, style: &DocumentStyleOpts) -> Result<()> {
    if let Some(theme) = &style.theme {
        config.document.theme = theme.parse::<Theme>().map_err(AppError::InvalidArgument)?;
    }
    if let Some(size) = &style.page_size {
        config.document.page_size = match size.as_str() {
            "letter" => PageSize::Letter,
            "a4" => PageSize::A4,
            other => {
                anyhow::bail!(AppError::InvalidArgument(format!(
                    "Unknown page size: {}",
                    other
                )))
            }
        };
    }
    if let Some(font_size) = style.font_size {
        config.document.font_size = font_size;
    }
    if let Some(margin) = style.margin {
        config.document.margin = margin;
    }
    if style.no_line_numbers {
        config.document.line_numbers = false;
    }
    if style.tree_page {
        config.document.include_file_tree = true;
    }
    if style.no_highlight {
        config.document.syntax_highlighting = false;
    }
    if style.no_title_pages {
        config.document.title_pages = false;
    }
    config.validate()?;
    Ok(())
}
