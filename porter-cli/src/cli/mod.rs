//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "forum-porter")]
#[command(about = "Export forum databases into the porter interchange format")]
#[command(version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported source platforms
    Platforms {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a platform's export plan and column mappings
    Show {
        /// Platform id (see `platforms`)
        platform: String,
    },
    /// Export a forum database
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Platform id (see `platforms`)
    pub platform: String,

    /// Source database: SQLite file path or `sqlite:` URL
    #[arg(short, long)]
    pub source: Option<String>,

    /// Source table prefix, replacing the platform default
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Export file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Character set to record instead of probing the source
    #[arg(long)]
    pub charset: Option<String>,

    /// Stop at the first table that fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Run every query and mapping without writing an export file
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Config file (defaults to <config dir>/forum-porter/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
