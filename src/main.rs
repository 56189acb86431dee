use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mosaic-deploy")]
#[command(about = "Provision a VPS over SSH and deploy the mosaic blog", long_about = None)]
#[command(version)]
struct Cli {
    /// Deployment configuration file (defaults to ./.deployment-config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// Commands enum lives in lib.rs so tests can parse it too
use mosaic_deploy::Commands;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let code = mosaic_deploy::commands::handle_command(cli.config, cli.command)?;
    std::process::exit(code);
}

/// Diagnostics go to stderr so they never mix with the operator-facing output
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
