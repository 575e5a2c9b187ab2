//! # Repo RAG CLI (`rrag`)
//!
//! Clone a repository, index its source files, and ask questions about it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rrag init` | Create the SQLite database and schema |
//! | `rrag analyze <url>` | Clone, index and summarize a repository |
//! | `rrag ask <repo> "<question>"` | Answer a question from an indexed repository |
//! | `rrag inspect <path>` | Show the files and tree that analysis would see |
//! | `rrag collections` | List stored collections |
//! | `rrag serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! rrag --config ./config/rrag.toml init
//! rrag analyze https://github.com/tokio-rs/mini-redis
//! rrag ask https://github.com/tokio-rs/mini-redis "Where are frames parsed?"
//! rrag serve
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use repo_rag::assistant::RepoAssistant;
use repo_rag::collector::{list_repo_files, repo_structure, CollectOptions};
use repo_rag::config::{self, Config};
use repo_rag::{migrate, server, store};

/// Repo RAG: question answering over Git repositories.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rrag",
    about = "Repo RAG: index a Git repository and ask questions about its code",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rrag.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it more than once is safe.
    Init,

    /// Clone a repository, build its index, and print a structure summary.
    Analyze {
        /// Anything `git clone` accepts: an HTTPS URL, `git@host:org/repo`, or a local path.
        url: String,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from a previously analyzed repository.
    Ask {
        /// Repository URL exactly as passed to `analyze`, or its 12-character id.
        repo: String,

        question: String,
    },

    /// Show the files and directory tree analysis would use for a local directory.
    ///
    /// Does not touch the database or any provider.
    Inspect {
        path: PathBuf,

        /// Include every file, not just recognized source code.
        #[arg(long)]
        all: bool,
    },

    /// List stored collections and their entry counts.
    Collections,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Inspect { path, all } = &cli.command {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
        return run_inspect(&cfg, path, *all);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze { url, json } => {
            let assistant = RepoAssistant::from_config(cfg).await?;
            let report = assistant.analyze(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Repository: {}", report.repo_url);
                println!("Id:         {}", report.repo_id);
                println!("Files:      {}", report.files);
                println!("Chunks:     {}", report.chunks);
                for skipped in &report.skipped {
                    println!("Skipped:    {}", skipped);
                }
                println!("\n{}\n", report.repo_structure);
                println!("{}", report.structure_summary);
            }
        }
        Commands::Ask { repo, question } => {
            let assistant = RepoAssistant::from_config(cfg).await?;
            let repo_id = RepoAssistant::resolve_repo_id(&repo);
            let answer = assistant.ask(&repo_id, &question).await;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for s in &answer.sources {
                    println!("  {} (chunk {}) score={:.3}", s.file_path, s.chunk_index, s.score);
                }
            }
        }
        Commands::Collections => {
            let store = store::open_store(&cfg).await?;
            let collections = store.list_collections().await?;
            if collections.is_empty() {
                println!("No collections.");
            }
            for c in collections {
                println!("{:<24} {:>8} entries", c.name, c.entries);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Inspect { .. } => unreachable!(),
    }

    Ok(())
}

fn run_inspect(cfg: &Config, path: &std::path::Path, all: bool) -> anyhow::Result<()> {
    let options = if all {
        CollectOptions::all()
    } else {
        CollectOptions::from_config(&cfg.repos)
    };
    let files = list_repo_files(path, &options)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;

    println!("{}\n", repo_structure(path));
    for f in &files {
        println!("{}", f.relative_path);
    }
    println!("\n{} files", files.len());
    Ok(())
}
