use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use uno_core::Config;
use uno_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, base_dir: &Path, quiet: bool) -> Result<()> {
    let text = Config::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&text);
    }

    let path = base_dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME);
    if !confirm_overwrite(&path, quiet)? {
        return Ok(());
    }
    write_to_file(&path, text.as_bytes())?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
