//! The setup pipeline: a fixed order of idempotent stages driven over one
//! remote session.

pub mod archive;
mod stages;
#[cfg(test)]
mod tests;

use crate::config::{DeployConfig, secret};
use crate::error::{DeployError, DeployResult};
use crate::layout::RemoteLayout;
use crate::session::RemoteSession;
use crate::templates::TemplateSet;
use crate::utils::{Console, RemoteTransport};
use anyhow::Context;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dependencies,
    Firewall,
    FileTransfer,
    ImageBuild,
    ConfigUpload,
    ServiceInstall,
    ProxyConfig,
    Certificate,
    ServiceStart,
}

impl Stage {
    /// Every stage, in execution order
    pub const ALL: [Stage; 9] = [
        Stage::Dependencies,
        Stage::Firewall,
        Stage::FileTransfer,
        Stage::ImageBuild,
        Stage::ConfigUpload,
        Stage::ServiceInstall,
        Stage::ProxyConfig,
        Stage::Certificate,
        Stage::ServiceStart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Dependencies => "install dependencies",
            Stage::Firewall => "configure firewall",
            Stage::FileTransfer => "transfer files",
            Stage::ImageBuild => "build image",
            Stage::ConfigUpload => "write configuration",
            Stage::ServiceInstall => "install services",
            Stage::ProxyConfig => "configure proxy",
            Stage::Certificate => "issue certificate",
            Stage::ServiceStart => "start services",
        }
    }

    /// Section heading printed when the stage starts
    pub fn title(self) -> &'static str {
        match self {
            Stage::Dependencies => "📦 Installing system dependencies...",
            Stage::Firewall => "🔥 Configuring firewall...",
            Stage::FileTransfer => "📦 Transferring project files...",
            Stage::ImageBuild => "🐳 Building Docker image on VPS...",
            Stage::ConfigUpload => "⚙️  Setting up configuration...",
            Stage::ServiceInstall => "🔧 Creating systemd services...",
            Stage::ProxyConfig => "🌐 Configuring nginx...",
            Stage::Certificate => "🔒 Setting up SSL certificate...",
            Stage::ServiceStart => "🚀 Starting services...",
        }
    }

    /// Whether a failure here ends the run
    pub fn is_fatal(self) -> bool {
        !matches!(self, Stage::Certificate)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stages run and where their local inputs come from
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub firewall: bool,
    pub project_dir: PathBuf,
    pub templates: TemplateSet,
}

impl PipelineOptions {
    /// Every stage, firewall included
    pub fn full(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            firewall: true,
            project_dir: project_dir.into(),
            templates: TemplateSet::builtin(),
        }
    }

    /// Everything except the firewall
    pub fn minimal(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            firewall: false,
            ..Self::full(project_dir)
        }
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.firewall || *stage != Stage::Firewall)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Completed,
    Failed(Stage),
    Cancelled,
}

#[derive(Debug)]
pub enum Outcome {
    Completed { url: String },
    Failed { stage: Stage, error: DeployError },
    Cancelled { stage: Stage },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed { .. } => 0,
            Outcome::Failed { .. } => 1,
            Outcome::Cancelled { .. } => 130,
        }
    }

    fn state(&self) -> PipelineState {
        match self {
            Outcome::Completed { .. } => PipelineState::Completed,
            Outcome::Failed { stage, .. } => PipelineState::Failed(*stage),
            Outcome::Cancelled { .. } => PipelineState::Cancelled,
        }
    }
}

/// One setup run against one host.
///
/// Owns the session; `run` closes it whatever the outcome.
pub struct Pipeline<T: RemoteTransport> {
    session: RemoteSession<T>,
    console: Console,
    config: DeployConfig,
    layout: RemoteLayout,
    options: PipelineOptions,
    history: Vec<PipelineState>,
    // Rendered files and the project archive are staged here before upload
    scratch: TempDir,
}

impl<T: RemoteTransport> Pipeline<T> {
    /// Prepare a run. A secret key is generated if `config` has none.
    pub fn new(
        mut session: RemoteSession<T>,
        mut config: DeployConfig,
        options: PipelineOptions,
    ) -> DeployResult<Self> {
        let layout = RemoteLayout::from_config(&config)?;

        if config.secret_key().is_none() {
            config.set_secret_key(secret::generate());
        }
        if let Some(secret) = config.secret_key() {
            session.mask_secret(secret);
        }

        let scratch = tempfile::Builder::new()
            .prefix("mosaic-deploy-")
            .tempdir()
            .context("Failed to create staging directory")?;

        Ok(Self {
            console: session.console().clone(),
            session,
            config,
            layout,
            options,
            history: vec![PipelineState::Idle],
            scratch,
        })
    }

    /// Run every selected stage in order, then close the session
    pub fn run(&mut self) -> Outcome {
        let outcome = self.drive();
        self.history.push(outcome.state());
        tracing::info!(state = ?outcome.state(), "pipeline finished");

        if let Err(e) = self.session.close() {
            self.console
                .warning(format!("Failed to close SSH connection: {}", e));
        }

        outcome
    }

    fn drive(&mut self) -> Outcome {
        for stage in self.options.stages() {
            self.history.push(PipelineState::Running(stage));
            tracing::info!(%stage, "starting stage");
            self.console.section(stage.title());

            match self.run_stage(stage) {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Outcome::Cancelled { stage },
                Err(e) if !stage.is_fatal() => {
                    tracing::warn!(%stage, error = %e, "non-fatal stage failed");
                    self.console.warning(e.to_string());
                }
                Err(e) => {
                    self.console.error(format!("Failed: {}", e));
                    return Outcome::Failed { stage, error: e };
                }
            }
        }

        let domain = self.config.domain().unwrap_or_default();
        Outcome::Completed {
            url: format!("https://{}", domain),
        }
    }

    /// States visited so far, starting with `Idle`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn state(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    /// Configuration as the run left it, including any reused secret
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }
}
