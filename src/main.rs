//! visualdata - Main Entry Point

use std::path::PathBuf;

use clap::Parser;
use visualdata::cli::{cmd_clean, cmd_describe, cmd_export, cmd_reduce, cmd_serve, Cli, Commands};
use visualdata::reduction::ReductionParams;

/// Commands other than `serve` are synchronous.
fn run_command(root: PathBuf, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Describe { source } => cmd_describe(&root, &source),
        Commands::Clean { source, output, drop_missing, drop_duplicates, imputation } => {
            cmd_clean(&root, &source, &output, drop_missing, drop_duplicates, &imputation)
        }
        Commands::Reduce {
            source,
            method,
            dim,
            label,
            perplexity,
            neighbors,
            min_dist,
            seed,
            title,
            output_dir,
        } => {
            let mut params = ReductionParams::default()
                .with_perplexity(perplexity)
                .with_n_neighbors(neighbors)
                .with_min_dist(min_dist);
            params.random_state = seed;
            cmd_reduce(&root, &source, &method, dim, label.as_deref(), params, &title, &output_dir)
        }
        Commands::Export { source, db_file, table, if_exists } => {
            cmd_export(&root, &source, &db_file, &table, &if_exists)
        }
        Commands::Serve { .. } => anyhow::bail!("serve runs on the async runtime"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visualdata=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => cmd_serve(&cli.root, &host, port).await,
        // Remote sources use a blocking HTTP client, which must stay off the runtime workers.
        command => {
            let root = cli.root;
            tokio::task::spawn_blocking(move || run_command(root, command)).await?
        }
    }
}
