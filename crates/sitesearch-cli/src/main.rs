//! sitesearch CLI - crawl a rendered site into a searchable artifact
//!
//! Entry point for the `sitesearch` binary. Each subcommand lives in its
//! own module under `commands`.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    execute_command(cli).await
}

fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = log_level(cli);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

const fn log_level(cli: &Cli) -> Level {
    if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build { project_root } => {
            commands::build(&project_root).await?;
        },
        Commands::Serve(args) => {
            commands::serve(args).await?;
        },
        Commands::Query {
            artifact,
            query,
            snippet,
        } => {
            commands::query(&artifact, &query.join(" "), snippet.options()).await?;
        },
    }

    Ok(())
}
