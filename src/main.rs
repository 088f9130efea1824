//! lockcell CLI entry point.

use anyhow::Result;
use clap::Parser;

use lockcell::cli::{commands, Cli, Commands};
use lockcell::infrastructure::config::ConfigLoader;
use lockcell::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command, cli.config, cli.json).await {
        lockcell::cli::handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<std::path::PathBuf>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match command {
        Commands::Run(args) => commands::run::execute(args, config, json).await,
        Commands::Config => commands::config::execute(config, json),
    }
}
