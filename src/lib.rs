// Library crate for mosaic-deploy - exposes modules for the binary and tests
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod session;
pub mod status;
pub mod templates;
#[cfg(test)]
mod testing;
pub mod tools;
pub mod utils;

// CLI-specific types (used by both library and binary)
use clap::{Args, Subcommand};
use config::{DeployConfig, Field};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the VPS and deploy the blog behind nginx
    Setup(SetupArgs),
    /// Check what is deployed and running on the VPS
    Status(TargetArgs),
}

/// Connection overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// VPS hostname or IP
    #[arg(long)]
    pub host: Option<String>,
    /// SSH user
    #[arg(long)]
    pub user: Option<String>,
    /// Domain name serving the blog
    #[arg(long)]
    pub domain: Option<String>,
    /// SSH private key path
    #[arg(long, value_name = "PATH")]
    pub key: Option<String>,
}

impl TargetArgs {
    /// Values given on the command line, ready to lay over the saved config
    pub fn overrides(&self) -> DeployConfig {
        DeployConfig::new()
            .with(Field::Host, self.host.clone())
            .with(Field::User, self.user.clone())
            .with(Field::Domain, self.domain.clone())
            .with(Field::SshKey, self.key.clone())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Run every command without asking for confirmation
    #[arg(long)]
    pub auto: bool,
    /// Print what each command does before running it
    #[arg(long)]
    pub explain: bool,
    /// Show every command and upload without touching the VPS
    #[arg(long)]
    pub dry_run: bool,
    /// Leave the firewall alone
    #[arg(long)]
    pub skip_firewall: bool,
    /// Do not echo uploaded files before sending them
    #[arg(long)]
    pub no_review: bool,
    /// Project to upload (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,
    /// Directory whose files replace the built-in templates of the same name
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
}
