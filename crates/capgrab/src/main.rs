mod commands;
mod gateway;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "capgrab")]
#[command(about = "Race a capacity-constrained cloud for scarce compute instances", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $CAPGRAB_CONFIG, ./capgrab.kdl, <config dir>/capgrab/capgrab.kdl)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch every template of every account (default)
    Launch {
        /// Only these accounts
        #[arg(short, long)]
        account: Vec<String>,
    },
    /// Export the public addresses of every account
    ExportIps {
        /// Only these accounts
        #[arg(short, long)]
        account: Vec<String>,
        /// Output file (default: <ip-export-prefix>-<timestamp>.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (path, config) =
        capgrab_config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    println!("{} {}", "Config:".bold(), path.display().to_string().cyan());
    tracing::debug!(
        "Loaded {} account(s), {} shared template(s)",
        config.accounts.len(),
        config.templates.len()
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, finishing current step...".yellow());
            on_signal.cancel();
        }
    });

    match cli.command.unwrap_or(Commands::Launch { account: vec![] }) {
        Commands::Launch { account } => commands::launch::handle(&config, &account, cancel).await,
        Commands::ExportIps { account, output } => {
            commands::export_ips::handle(&config, &account, output).await
        }
    }
}
