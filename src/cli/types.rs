//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "lockcell")]
#[command(about = "lockcell - distributed multi-cause delta debugging", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .lockcell/config.yaml and .lockcell/local.yaml)
    #[arg(short, long, global = true, env = "LOCKCELL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for the minimal failing subsets of an oracle
    Run(RunArgs),

    /// Print the effective configuration
    Config,
}
