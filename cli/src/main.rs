//! `vaultgraph`: embed a markdown vault and link semantically related notes.
//!
//! Logging goes to stderr (`RUST_LOG` overrides, `-v` raises the default to
//! debug) so stdout stays machine-readable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vaultgraph_cli::{Vault, VaultGraphConfig, Workspace, commands};
use vaultgraph_embeddings::{CancellationToken, RunOutcome, build_provider};

#[derive(Parser, Debug)]
#[command(
    name = "vaultgraph",
    version,
    about = "Incremental note embeddings and a sparse similarity graph for markdown vaults"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "VAULTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(long, short)]
    verbose: bool,

    /// Vault root directory
    vault: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count documents per embedding status
    Status,

    /// Embed new and modified documents
    Generate,

    /// Print the similarity graph as JSON
    Graph {
        /// Override the configured similarity threshold
        #[arg(long)]
        threshold: Option<f32>,

        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// List the notes most similar to one note
    Related {
        /// Vault-relative path of the note
        path: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Minimum cosine similarity
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,
    },

    /// Delete every cached embedding
    Clear,

    /// Check that the embedding provider is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "vaultgraph=debug,vaultgraph_cli=debug,vaultgraph_embeddings=debug,vaultgraph_graph=debug"
        } else {
            "info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut config = VaultGraphConfig::load(cli.config.as_deref())?;
    let vault = Vault::new(&cli.vault, config.vault.clone());
    if !vault.root().is_dir() {
        anyhow::bail!("vault directory {} does not exist", cli.vault.display());
    }

    match cli.command {
        Command::Status => {
            let workspace = Workspace::new(vault, config);
            let counts = workspace.status().await;
            println!("new:        {}", counts.new);
            println!("modified:   {}", counts.modified);
            println!("up to date: {}", counts.up_to_date);
            println!("processing: {}", counts.processing);
            println!("total:      {}", counts.total());
        }
        Command::Generate => {
            let provider = build_provider(&config.provider);
            let workspace = Workspace::new(vault, config);

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after the current document");
                    on_signal.cancel();
                }
            });

            let summary = workspace
                .generate(provider.as_ref(), &cancel, |done, total, name| {
                    info!("[{done}/{total}] {name}");
                })
                .await?;

            match summary.outcome {
                RunOutcome::NothingToDo => println!("All documents are up to date."),
                RunOutcome::Cancelled => println!(
                    "Cancelled: {} embedded, {} failed, {} not attempted.",
                    summary.processed,
                    summary.failed,
                    summary.total - summary.attempted()
                ),
                RunOutcome::Completed | RunOutcome::Aborted => println!(
                    "Embedded {} of {} documents ({} failed).",
                    summary.processed, summary.total, summary.failed
                ),
            }
        }
        Command::Graph { threshold, pretty } => {
            if let Some(threshold) = threshold {
                config.graph.threshold = threshold;
            }
            let workspace = Workspace::new(vault, config);
            let graph = workspace.graph().await?;
            info!(
                "{} edges from {} candidates over {} nodes",
                graph.stats.edges, graph.stats.candidates, graph.stats.nodes
            );

            let json = if pretty {
                serde_json::to_string_pretty(&graph.edges)
            } else {
                serde_json::to_string(&graph.edges)
            }
            .context("failed to serialize graph")?;
            println!("{json}");
        }
        Command::Related {
            path,
            limit,
            min_score,
        } => {
            let workspace = Workspace::new(vault, config);
            for result in workspace.related(&path, limit, min_score).await? {
                println!("{:.4}  {}", result.score, result.path);
            }
        }
        Command::Clear => {
            let workspace = Workspace::new(vault, config);
            workspace.clear().await?;
            println!("Embedding cache cleared.");
        }
        Command::Health => {
            let provider = build_provider(&config.provider);
            let health = commands::health(provider.as_ref()).await?;
            println!("{}", serde_json::to_string(&health)?);
            if !health.ok {
                anyhow::bail!(
                    "provider {} is not ready: {}",
                    provider.name(),
                    health.detail.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
