use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use yop_cloud_sdk::utils::{format_bytes, init_logger};
use yop_cloud_sdk::{ClientConfig, ProgressReporter, StorageClient, StorageError, TransferProgress};

#[derive(Parser, Debug)]
#[command(name = "yop", version, about = "Upload and download files to yop-cloud storage")]
struct Cli {
    /// Base URL of the storage service (falls back to YOP_HOST_URL)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Bearer token (falls back to YOP_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Hide the progress line
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file or directory
    Upload {
        /// Local file or directory
        src: PathBuf,
        /// Destination path on the server
        dst: String,
    },
    /// Download a remote file or folder
    Download {
        /// Path on the server
        src: String,
        /// Local destination file or directory
        dst: PathBuf,
    },
    /// List a remote path
    Ls {
        path: String,
    },
}

/// Single-line progress display on stderr.
struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}

    fn advance(&self, progress: TransferProgress<'_>) {
        let line = match (progress.total, progress.percent()) {
            (Some(total), Some(percent)) => format!(
                "{}: {} / {} ({}%)",
                progress.label,
                format_bytes(progress.transferred),
                format_bytes(total),
                percent
            ),
            _ => format!("{}: {}", progress.label, format_bytes(progress.transferred)),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();
    }

    fn finish(&self, label: &str, transferred: u64) {
        eprintln!("\r{}: {} done", label, format_bytes(transferred));
    }

    fn fail(&self, label: &str, _error: &StorageError) {
        // End the progress line so the error report starts on its own
        eprintln!("\r{}: failed", label);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = ClientConfig::load(cli.host, cli.token).context("Invalid configuration")?;
    debug!(config = ?config, "Configuration loaded");

    let mut client = StorageClient::from_config(config)?;
    if !cli.quiet {
        client = client.with_progress(Arc::new(ConsoleProgress));
    }

    match cli.command {
        Command::Upload { src, dst } => {
            let result = client
                .upload(&src, &dst)
                .await
                .with_context(|| format!("Upload of {} failed", src.display()))?;
            println!("{}", result.object_id);
        }
        Command::Download { src, dst } => {
            let result = client
                .download(&src, &dst)
                .await
                .with_context(|| format!("Download of {} failed", src))?;
            println!("{}", result.local_path.display());
        }
        Command::Ls { path } => {
            let entries = client
                .list(&path)
                .await
                .with_context(|| format!("Listing {} failed", path))?;
            for entry in entries {
                println!("{}", entry.file_name);
            }
        }
    }

    Ok(())
}
