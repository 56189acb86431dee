//! Read-only health inspection of a deployed host.
//!
//! Every probe runs regardless of what the others found; a probe that
//! cannot complete becomes a warning in its own section.

mod probes;

use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::layout::RemoteLayout;
use crate::session::RemoteSession;
use crate::utils::{Console, RemoteTransport};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckLevel {
    Pass,
    Warn,
    Fail,
}

/// One classified finding, with optional indented detail lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub level: CheckLevel,
    pub message: String,
    pub details: Vec<String>,
}

impl Check {
    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(CheckLevel::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(CheckLevel::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(CheckLevel::Fail, message)
    }

    fn new(level: CheckLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub sections: Vec<Section>,
}

impl StatusReport {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.sections.iter().flat_map(|s| s.checks.iter())
    }

    pub fn count(&self, level: CheckLevel) -> usize {
        self.checks().filter(|c| c.level == level).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} warnings, {} failed",
            self.count(CheckLevel::Pass),
            self.count(CheckLevel::Warn),
            self.count(CheckLevel::Fail)
        )
    }

    pub fn render(&self, console: &Console) {
        for section in &self.sections {
            console.section(section.title);
            for check in &section.checks {
                match check.level {
                    CheckLevel::Pass => console.success(&check.message),
                    CheckLevel::Warn => console.warning(&check.message),
                    CheckLevel::Fail => console.error(&check.message),
                }
                for detail in &check.details {
                    console.line(format!("    {}", detail));
                }
            }
        }
        console.section(self.summary());
    }
}

pub const CONFIG_FILES: &str = "📄 Configuration Files:";
pub const DOCKER: &str = "🐳 Docker:";
pub const SERVICES: &str = "⚙️  Services:";
pub const NGINX: &str = "🌐 Nginx:";
pub const HEALTH: &str = "🏥 Application Health & SSL:";
pub const DISK: &str = "💾 Disk Space:";
pub const BACKUPS: &str = "📦 Database Backup:";
pub const RECENT_ERRORS: &str = "⚠️  Recent Errors:";

/// Runs the probes over one session and closes it when done
pub struct Inspector<T: RemoteTransport> {
    session: RemoteSession<T>,
    layout: RemoteLayout,
    domain: String,
    now: DateTime<Utc>,
}

type Probe<T> = fn(&mut Inspector<T>) -> DeployResult<Vec<Check>>;

impl<T: RemoteTransport> Inspector<T> {
    pub fn new(session: RemoteSession<T>, config: &DeployConfig) -> DeployResult<Self> {
        Ok(Self {
            layout: RemoteLayout::from_config(config)?,
            domain: config.domain()?.to_string(),
            session,
            now: Utc::now(),
        })
    }

    /// Judge certificate expiry against `now` instead of the clock
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn run(mut self) -> StatusReport {
        let probes: [(&'static str, &'static str, Probe<T>); 8] = [
            (CONFIG_FILES, "configuration files", Self::config_files),
            (DOCKER, "docker", Self::docker),
            (SERVICES, "services", Self::services),
            (NGINX, "nginx", Self::nginx),
            (HEALTH, "health", Self::health),
            (DISK, "disk", Self::disk),
            (BACKUPS, "backup", Self::backups),
            (RECENT_ERRORS, "recent errors", Self::recent_errors),
        ];

        let mut report = StatusReport::default();
        for (title, probe, check) in probes {
            let checks = check(&mut self).unwrap_or_else(|e| {
                let failure = DeployError::Probe {
                    probe,
                    reason: e.to_string(),
                };
                tracing::warn!(%probe, error = %e, "probe failed");
                vec![Check::warn(failure.to_string())]
            });
            report.sections.push(Section { title, checks });
        }

        if let Err(e) = self.session.close() {
            tracing::warn!("failed to close SSH connection: {}", e);
        }
        report
    }
}

/// Inspect the host described by `config`, closing `session` afterwards
pub fn inspect<T: RemoteTransport>(
    session: RemoteSession<T>,
    config: &DeployConfig,
) -> DeployResult<StatusReport> {
    Ok(Inspector::new(session, config)?.run())
}
