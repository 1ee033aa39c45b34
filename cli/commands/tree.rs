use crate::cli_args::TreeArgs;
use crate::commands::resolve_inputs;
use crate::load_config_for_command;
use crate::output::write_to_stdout;
use anyhow::{Context, Result};
use uno_core::FileTree;

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let config = load_config_for_command(&args.config, &args.inputs)
        .context("Failed to load configuration for tree command")?;
    let files = resolve_inputs(&args.inputs, &config)?;
    let tree = FileTree::build(&files);
    write_to_stdout(&tree.render_text())
}
