//! ovzoo CLI: download, patch, and convert model zoo models from their
//! `model.yml` manifests.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// ovzoo: manifest-driven model zoo downloader and converter
#[derive(Parser, Debug)]
#[command(name = "ovzoo", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (where ovzoo.toml and the models tree live)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Override the models directory from config
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List models available in the zoo
    List {
        /// Filter by substring of name or description
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show a model's manifest: files, inputs, conversion stages
    Info {
        /// Model name
        name: String,
    },
    /// Download and verify a model's files, then apply postprocessing
    Download {
        /// Model name
        name: String,
    },
    /// Convert a downloaded model to ONNX and run the model optimizer
    Convert {
        /// Model name
        name: String,
        /// Print the resolved command lines without executing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default ovzoo.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "ovzoo", "ovzoo")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ovzoo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.models_dir).await
}
