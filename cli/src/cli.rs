//! Command-line interface for matdiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "matdiff")]
#[command(about = "Compare two material delivery snapshots and report what changed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of matdiff.toml / ~/.matdiff/global.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a current snapshot against a previous one and write the report
    Compare {
        /// Current snapshot workbook
        current: PathBuf,

        /// Previous snapshot workbook
        previous: PathBuf,

        /// Report destination (defaults to report.output_path, Comparison_Result.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the report without filling the changed quantities
        #[arg(long)]
        no_highlight: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Append failures to this file (overrides report.error_log)
        #[arg(long)]
        error_log: Option<PathBuf>,
    },

    /// Show the columns and row count of a snapshot workbook
    Inspect {
        /// Snapshot workbook
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the active configuration and where it was loaded from
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Write ~/.matdiff/global.toml instead of ./matdiff.toml
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
