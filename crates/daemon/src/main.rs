//! Shelf Daemon
//!
//! Headless service managing a download directory, plus the client
//! subcommands that talk to it.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use protocol::{encode_path, DeleteOutcome, DeleteRequest, DirectoryEntry, PlayRequest};
use shelfd::config::Config;
use shelfd::ipc::IpcClient;
use shelfd::orchestrator::DaemonOrchestrator;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Shelf Daemon - lists, deletes and streams files from a download directory.
#[derive(Parser, Debug)]
#[command(name = "shelfd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the daemon in the foreground
    Serve,

    /// Show daemon status
    Status,

    /// List the files in the download directory
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete a listed file
    Delete {
        /// Path exactly as shown by `list`
        path: String,

        /// Fingerprint exactly as shown by `list`
        sha: String,
    },

    /// Stream a file from the download directory
    Play {
        /// Path of the file to stream
        path: PathBuf,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// First byte to stream
        #[arg(long)]
        offset: Option<u64>,

        /// Number of bytes to stream
        #[arg(long)]
        length: Option<u64>,
    },

    /// Print the play token for a path
    Token {
        /// Path to encode
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::load_default()?,
    };

    // Apply environment variable overrides
    let overrides = config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    let serving = matches!(cli.command, Commands::Serve);
    let _log_guard = init_tracing(&config, cli.verbose, serving)?;

    if let Some(config_path) = &cli.config {
        tracing::debug!("Using config file: {:?}", config_path);
    }
    for var in overrides {
        tracing::info!("Configuration overridden from environment variable {}", var);
    }

    // Handle commands
    match cli.command {
        Commands::Serve => {
            tracing::info!("Shelf daemon starting...");
            let mut orchestrator = DaemonOrchestrator::new(config)?;
            run_headless(&mut orchestrator).await?;
        }
        Commands::Status => {
            let mut client = connect(&config).await?;
            let (root, uptime_secs) = client.status().await?;
            println!("Shelf Daemon Status");
            println!("===================");
            println!("Status:   running");
            println!("Root:     {}", root);
            println!("Uptime:   {}", format_duration(uptime_secs));
        }
        Commands::List { json } => {
            let mut client = connect(&config).await?;
            let entries = client.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_entries_table(&entries);
            }
        }
        Commands::Delete { path, sha } => {
            let mut client = connect(&config).await?;
            let outcome = client
                .delete(DeleteRequest {
                    path: path.clone(),
                    fingerprint: sha,
                })
                .await?;
            match outcome {
                DeleteOutcome::Removed { index } => {
                    println!("Deleted {} (catalog entry {})", path, index)
                }
                DeleteOutcome::Mismatch => {
                    anyhow::bail!("{} is not in the current listing with that fingerprint", path)
                }
            }
        }
        Commands::Play {
            path,
            output,
            offset,
            length,
        } => {
            let mut request = PlayRequest::new(encode_path(&path));
            if let Some(offset) = offset {
                request = request.with_range(offset, length);
            } else if length.is_some() {
                request = request.with_range(0, length);
            }

            let mut client = connect(&config).await?;
            let summary = match &output {
                Some(file) => {
                    let mut out = tokio::fs::File::create(file)
                        .await
                        .with_context(|| format!("Failed to create {}", file.display()))?;
                    client.play(request, &mut out).await?
                }
                None => client.play(request, &mut tokio::io::stdout()).await?,
            };
            tracing::info!(
                "Received {} of {} bytes in {} chunks",
                summary.bytes_written,
                summary.total_size,
                summary.chunks
            );
        }
        Commands::Token { path } => {
            println!("{}", encode_path(&path));
        }
    }

    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The daily rolling file is only
/// written by `serve`; the returned guard must live until exit so buffered
/// lines are flushed.
fn init_tracing(
    config: &Config,
    verbose: bool,
    serving: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.daemon.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let (file_layer, guard) = match (&config.daemon.log_dir, serving) {
        (Some(dir), true) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "shelfd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn connect(config: &Config) -> anyhow::Result<IpcClient> {
    let socket_path = config.socket_path();
    IpcClient::connect(&socket_path).await.with_context(|| {
        format!(
            "Daemon not running (cannot connect to {}). Start it with: shelfd serve",
            socket_path.display()
        )
    })
}

/// Print catalog entries in a table format.
fn print_entries_table(entries: &[DirectoryEntry]) {
    if entries.is_empty() {
        println!("No files");
        return;
    }

    println!("{:<64}  {:<32}  PATH", "SHA256", "NAME");
    println!("{}", "-".repeat(64 + 2 + 32 + 2 + 4));

    for entry in entries {
        println!(
            "{:<64}  {:<32}  {}",
            entry.fingerprint,
            truncate_str(&entry.name, 32),
            entry.path
        );
    }

    println!();
    println!("Total: {} file(s)", entries.len());
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Format a duration in seconds as a human-readable string.
fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Run the daemon in headless mode.
async fn run_headless(orchestrator: &mut DaemonOrchestrator) -> anyhow::Result<()> {
    orchestrator.start().await?;
    tracing::info!(
        "Ready; clients connect via {}",
        orchestrator.socket_path().display()
    );

    // Wait for shutdown signal (SIGTERM or SIGINT)
    wait_for_shutdown_signal().await?;
    tracing::info!("Received shutdown signal");

    orchestrator.stop().await?;

    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }

    Ok(())
}
