//! Command line definitions for `pagelens`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "Extract structured content from web pages and analyze it with an LLM")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, env = "PAGELENS_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Log file
    #[arg(long, default_value = lens_logging::DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    /// Also log to the terminal, at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the structured content of a page as JSON
    Extract {
        /// URL or local file
        source: String,
    },

    /// Extract a page and ask the model about it
    Analyze(AnalyzeArgs),

    /// List prompt templates
    Prompts {
        /// Only show prompts that apply to this URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
pub(crate) struct AnalyzeArgs {
    /// URL or local file
    pub source: String,

    /// Free-form analysis request
    #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
    pub prompt: Option<String>,

    /// Label of a stored prompt template
    #[arg(long)]
    pub preset: Option<String>,

    /// System message sent ahead of the request
    #[arg(long)]
    pub system: Option<String>,

    /// Paste the result into the page's compose area
    #[arg(long)]
    pub paste: bool,
}

#[derive(Subcommand)]
pub(crate) enum SettingsAction {
    /// Print the stored settings (the API key is masked)
    Show,

    /// Update stored settings
    Set {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Maximum characters of page content sent to the model
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Forget custom prompts and use the built-in set
    ResetPrompts,
}
