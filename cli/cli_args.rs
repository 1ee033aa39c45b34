use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOpts {
    #[arg(
        long,
        help = "Path of the TOML config file (default: .uno/uno.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Do not load any TOML config file.",
        conflicts_with = "config",
        help_heading = "Configuration"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InputOpts {
    #[arg(
        required = true,
        value_name = "PATH",
        help = "Files or directories to process, in order."
    )]
    pub paths: Vec<PathBuf>,

    #[arg(
        long,
        help = "Do not apply .gitignore rules when expanding directories.",
        help_heading = "Inputs"
    )]
    pub no_gitignore: bool,

    #[arg(long, value_name = "PATTERN", action = clap::ArgAction::Append, help = "Skip files under directory inputs matching this glob.", help_heading = "Inputs")]
    pub exclude: Vec<String>,

    #[arg(
        long,
        value_name = "SIZE_STRING",
        help = "Reject the batch if any file is larger than this (e.g. '10 MiB').",
        help_heading = "Inputs"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        short = 'j',
        long,
        value_name = "N",
        help = "Number of extraction workers.",
        help_heading = "Inputs"
    )]
    pub workers: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PromptStyleOpts {
    #[arg(short = 'f', long, help = "Prompt layout.", value_name = "FORMAT", value_parser = ["standard", "with-tree", "markdown"], help_heading = "Prompt")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Prepend the file tree to the prompt.",
        help_heading = "Prompt"
    )]
    pub tree: bool,

    #[arg(
        long,
        help = "Color file contents with ANSI escapes.",
        help_heading = "Prompt"
    )]
    pub highlight: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DocumentStyleOpts {
    #[arg(long, value_name = "THEME", value_parser = ["light", "dark", "sepia"], help = "Color theme for page chrome.", help_heading = "Document")]
    pub theme: Option<String>,

    #[arg(long, value_name = "SIZE", value_parser = ["letter", "a4"], help = "Paper size.", help_heading = "Document")]
    pub page_size: Option<String>,

    #[arg(
        long,
        value_name = "POINTS",
        help = "Body font size.",
        help_heading = "Document"
    )]
    pub font_size: Option<f32>,

    #[arg(
        long,
        value_name = "POINTS",
        help = "Page margin.",
        help_heading = "Document"
    )]
    pub margin: Option<f32>,

    #[arg(long, help = "Omit the line-number gutter.", help_heading = "Document")]
    pub no_line_numbers: bool,

    #[arg(
        long = "tree-page",
        help = "Add a file tree page before the contents.",
        help_heading = "Document"
    )]
    pub tree_page: bool,

    #[arg(long, help = "Disable syntax coloring.", help_heading = "Document")]
    pub no_highlight: bool,

    #[arg(long, help = "Skip per-file title pages.", help_heading = "Document")]
    pub no_title_pages: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Turn a list of files into an LLM prompt or a paginated PDF.",
    long_about = "uno reads source, data, documentation, office, image and PDF files in the order given \nand assembles them into a single prompt string or a paginated, syntax-colored PDF \nwith title pages, a table of contents and an optional file tree.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  uno prompt src/main.rs src/lib.rs --format markdown\n  uno pdf src/ -o code.pdf --theme dark\n  uno metrics src/ --json\n  uno watch notes.md --pdf notes.pdf",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "p", about = "Assemble the files into a prompt.")]
    Prompt(PromptArgs),

    #[command(about = "Assemble the files into a paginated PDF.")]
    Pdf(PdfArgs),

    #[command(visible_alias = "t", about = "Print the file tree of the inputs.")]
    Tree(TreeArgs),

    #[command(
        visible_alias = "m",
        about = "Show line, size and token counts per file."
    )]
    Metrics(MetricsArgs),

    #[command(
        visible_alias = "w",
        about = "Regenerate the prompt or PDF whenever an input changes."
    )]
    Watch(WatchArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[clap(flatten)]
    pub config: ConfigOpts,
    #[clap(flatten)]
    pub inputs: InputOpts,
    #[clap(flatten)]
    pub style: PromptStyleOpts,

    #[arg(
        short = 's',
        long,
        value_name = "FILE",
        help = "Write the prompt to FILE instead of stdout.",
        help_heading = "Output Control"
    )]
    pub save: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PdfArgs {
    #[clap(flatten)]
    pub config: ConfigOpts,
    #[clap(flatten)]
    pub inputs: InputOpts,
    #[clap(flatten)]
    pub style: DocumentStyleOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Where to write the PDF.",
        help_heading = "Output Control"
    )]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub config: ConfigOpts,
    #[clap(flatten)]
    pub inputs: InputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[clap(flatten)]
    pub config: ConfigOpts,
    #[clap(flatten)]
    pub inputs: InputOpts,

    #[arg(long, help = "Print metrics as JSON.", help_heading = "Output Control")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[clap(flatten)]
    pub config: ConfigOpts,
    #[clap(flatten)]
    pub inputs: InputOpts,
    #[clap(flatten)]
    pub prompt_style: PromptStyleOpts,
    #[clap(flatten)]
    pub document_style: DocumentStyleOpts,

    #[arg(
        long,
        value_name = "FILE",
        help = "Regenerate a PDF at FILE instead of a prompt.",
        conflicts_with = "save",
        help_heading = "Output Control"
    )]
    pub pdf: Option<PathBuf>,

    #[arg(
        short = 's',
        long,
        value_name = "FILE",
        help = "Write each prompt to FILE instead of stdout.",
        help_heading = "Output Control"
    )]
    pub save: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DELAY_STRING",
        help = "Debounce delay before regenerating [default: 300ms]."
    )]
    pub delay: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save the default config to .uno/uno.toml (prompts overwrite)."
    )]
    pub save: bool,
}
