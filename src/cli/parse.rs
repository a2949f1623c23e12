//! CLI parse: clap types for revgeom. No behavior; definitions only.

use crate::logging::{LogFormat, LogOutput};
use crate::types::{Poid, Roid, Uoid};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// revgeom CLI - revision-consistent geometry regeneration
#[derive(Parser)]
#[command(name = "revgeom")]
#[command(about = "Regenerate derived geometry for revisions of a versioned model store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (layered above the workspace config)
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
    pub log_format: Option<LogFormat>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<LogOutput>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a project from a JSON model file and check in its first revision
    Import {
        /// Model file (name, length_unit_to_mm, products)
        model: PathBuf,
        /// Acting user
        #[arg(long, default_value_t = 1)]
        user: Uoid,
    },
    /// Check in a revision; without --changes it shares the previous snapshot
    Commit {
        #[arg(long)]
        project: Poid,
        #[arg(long, default_value = "")]
        comment: String,
        /// JSON array of shape changes (upsert/remove)
        #[arg(long)]
        changes: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        user: Uoid,
    },
    /// Regenerate geometry for a revision
    Regenerate {
        #[arg(long)]
        revision: Roid,
        /// Product oid to regenerate; -1 regenerates the whole model
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        object: i64,
        /// Engine name (default: configured default engine)
        #[arg(long)]
        engine: Option<String>,
        #[arg(long, default_value_t = 1)]
        user: Uoid,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a revision, its snapshot, bounds and attachments
    Show {
        #[arg(long)]
        revision: Roid,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List regeneration jobs and their status
    Jobs {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Include the event log of one job
        #[arg(long)]
        events: Option<String>,
    },
}
