use crate::cli_args::PromptArgs;
use crate::commands::{resolve_inputs, run_batch};
use crate::output;
use crate::{apply_prompt_overrides, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use uno_core::{Artifact, Mode};

pub fn handle_prompt_command(args: PromptArgs, quiet: bool) -> Result<()> {
    let mut config = load_config_for_command(&args.config, &args.inputs)
        .context("Failed to load configuration for prompt command")?;
    apply_prompt_overrides(&mut config, &args.style)?;
    let files = resolve_inputs(&args.inputs, &config)?;

    let outcome = run_batch(&files, &config, Mode::Prompt, quiet)?;
    let Artifact::Prompt(text) = outcome.artifact else {
        anyhow::bail!("Prompt run produced a document");
    };

    match &args.save {
        Some(path) => {
            output::write_to_file(path, text.as_bytes())?;
            if !quiet {
                println!(
                    "{} Prompt saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => output::write_to_stdout(&text)?,
    }

    if !quiet {
        match output::estimate_tokens(&text) {
            Ok(tokens) => eprintln!(
                "{} {} file(s), ~{} tokens",
                "ℹ".blue(),
                files.len(),
                tokens.to_string().cyan()
            ),
            Err(e) => log::warn!("Token estimate unavailable: {:#}", e),
        }
    }
    Ok(())
}
