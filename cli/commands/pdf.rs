use crate::cli_args::PdfArgs;
use crate::commands::{resolve_inputs, run_batch};
use crate::output;
use crate::{apply_document_overrides, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use uno_core::{Artifact, Mode};

pub fn handle_pdf_command(args: PdfArgs, quiet: bool) -> Result<()> {
    let mut config = load_config_for_command(&args.config, &args.inputs)
        .context("Failed to load configuration for pdf command")?;
    apply_document_overrides(&mut config, &args.style)?;
    let files = resolve_inputs(&args.inputs, &config)?;

    let outcome = run_batch(&files, &config, Mode::Paginated, quiet)?;
    let Artifact::Document(document) = outcome.artifact else {
        anyhow::bail!("Paginated run produced a prompt");
    };

    output::ensure_parent_dir(&args.output)?;
    document.save(&args.output)?;
    if !quiet {
        println!(
            "{} {} page(s) saved to: {}",
            "✅".green(),
            document.page_count(),
            args.output.display().to_string().blue()
        );
    }
    Ok(())
}
