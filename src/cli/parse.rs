//! CLI parse: clap types for Roki. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Roki CLI - page-oriented wiki publisher
#[derive(Parser)]
#[command(name = "roki")]
#[command(about = "Publish a page-oriented wiki as static artifacts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (relative backend roots resolve against it)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Options for the commit that ends a mutating command
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Commit message
    #[arg(long, short)]
    pub message: Option<String>,

    /// Write a parentless commit, replacing history
    #[arg(long)]
    pub bare: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new revision of a page (content from --file or stdin)
    Revision {
        page: String,
        /// Read the content from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Attach a file to a page
    Attach {
        page: String,
        file: PathBuf,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Delete a page's revisions and attachments
    DeletePage {
        page: String,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Delete one revision
    DeleteRevision {
        page: String,
        id: String,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Delete one attachment by stored filename
    DeleteAttachment {
        page: String,
        filename: String,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// List pages
    Pages {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Generate the site into the destination
    Generate {
        #[command(flatten)]
        sync: SyncArgs,
    },
}

impl Commands {
    /// Stable command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Revision { .. } => "revision",
            Commands::Attach { .. } => "attach",
            Commands::DeletePage { .. } => "delete-page",
            Commands::DeleteRevision { .. } => "delete-revision",
            Commands::DeleteAttachment { .. } => "delete-attachment",
            Commands::Pages { .. } => "pages",
            Commands::Generate { .. } => "generate",
        }
    }
}
