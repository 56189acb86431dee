use crate::error::{DeployError, DeployResult};
use crate::tools::RemoteCommand;
use crate::utils::{CommandOutput, Console, RemoteTransport, Style, shell_escape};
use anyhow::Context;
use std::path::Path;

const ARCHIVE_SUFFIXES: [&str; 4] = [".tar.gz", ".tar", ".zip", ".tgz"];
const RULE_WIDTH: usize = 70;
const SECRET_MASK: &str = "********";

/// Mode flags for one session, fixed when it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Ask before every command and upload
    pub confirm: bool,
    /// Print each command's description before it
    pub explain: bool,
    /// Log intentions without executing anything remotely
    pub dry_run: bool,
    /// Echo text uploads to the operator before sending them
    pub review_uploads: bool,
    /// Print each command line before running it
    pub echo: bool,
}

impl SessionOptions {
    /// Quiet, unconfirmed, executing: what the status inspector uses
    pub fn read_only() -> Self {
        Self {
            confirm: false,
            explain: false,
            dry_run: false,
            review_uploads: false,
            echo: false,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            confirm: true,
            explain: false,
            dry_run: false,
            review_uploads: true,
            echo: true,
        }
    }
}

/// The one remote session of a run.
///
/// Every command and upload goes through here so that echoing, confirmation,
/// dry-run and privilege escalation are applied the same way everywhere.
/// `run`/`run_privileged` return `None` in dry-run mode; callers treat that
/// as success.
pub struct RemoteSession<T: RemoteTransport> {
    transport: T,
    options: SessionOptions,
    console: Console,
    user: String,
    masked: Option<String>,
    closed: bool,
}

impl<T: RemoteTransport> RemoteSession<T> {
    pub fn new(transport: T, user: impl Into<String>, options: SessionOptions, console: Console) -> Self {
        Self {
            transport,
            options,
            console,
            user: user.into(),
            masked: None,
            closed: false,
        }
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Hide `secret` whenever upload content is echoed
    pub fn mask_secret(&mut self, secret: impl Into<String>) {
        let secret = secret.into();
        if !secret.is_empty() {
            self.masked = Some(secret);
        }
    }

    /// Run as the SSH user
    pub fn run(&mut self, command: &RemoteCommand) -> DeployResult<Option<CommandOutput>> {
        self.execute(command, false)
    }

    /// Run with elevated privilege
    pub fn run_privileged(&mut self, command: &RemoteCommand) -> DeployResult<Option<CommandOutput>> {
        self.execute(command, true)
    }

    fn execute(
        &mut self,
        command: &RemoteCommand,
        privileged: bool,
    ) -> DeployResult<Option<CommandOutput>> {
        self.ensure_open()?;
        self.explain(command.description());

        if self.options.echo {
            if privileged {
                self.console
                    .styled(Style::Warning, format!("  $ sudo {}", command.line()));
            } else {
                self.console.line(format!("  $ {}", command.line()));
            }
        }

        self.confirm("  Execute? [Y/n]: ")?;

        if self.options.dry_run {
            tracing::debug!(command = %command.line(), privileged, "dry run, not executing");
            return Ok(None);
        }

        let line = if privileged {
            self.elevate(command.line())
        } else {
            command.line().to_string()
        };
        let output = self.transport.exec(&line)?;
        tracing::debug!(command = %command.line(), status = output.status, "remote command finished");

        if !output.ok() && !command.allows_failure() {
            return Err(DeployError::CommandFailed {
                command: command.line().to_string(),
                description: command
                    .description()
                    .filter(|_| self.options.explain)
                    .map(str::to_string),
                status: output.status,
                output: output.combined(),
            });
        }

        Ok(Some(output))
    }

    fn elevate(&self, line: &str) -> String {
        if self.user == "root" {
            line.to_string()
        } else {
            format!("sudo -n sh -c {}", shell_escape(line))
        }
    }

    /// Copy a local file to `remote_path`, replacing what is there.
    ///
    /// Text files are shown to the operator first (unless review is off);
    /// archives and binaries only report their size.
    pub fn transfer_file(
        &mut self,
        local: &Path,
        remote_path: &str,
        description: &str,
    ) -> DeployResult<()> {
        self.ensure_open()?;
        self.explain(Some(description));

        let content = std::fs::read(local)
            .with_context(|| format!("Failed to read {}", local.display()))?;

        self.console
            .line(format!("  📤 {} → {}", local.display(), remote_path));
        if self.options.review_uploads {
            self.show_content(&content, remote_path);
        }

        self.confirm("  Upload? [Y/n]: ")?;

        if self.options.dry_run {
            tracing::debug!(%remote_path, bytes = content.len(), "dry run, not uploading");
            return Ok(());
        }

        self.transport
            .upload(&content, remote_path)
            .with_context(|| format!("Failed to upload {}", remote_path))?;
        Ok(())
    }

    fn show_content(&self, content: &[u8], remote_path: &str) {
        if ARCHIVE_SUFFIXES.iter().any(|s| remote_path.ends_with(s)) {
            let size_mb = content.len() as f64 / (1024.0 * 1024.0);
            self.console.line(format!("  (Archive, {:.1} MB)", size_mb));
            return;
        }

        let Ok(text) = std::str::from_utf8(content) else {
            self.console
                .line(format!("  (Binary file, {} bytes)", content.len()));
            return;
        };

        let text = match &self.masked {
            Some(secret) => text.replace(secret.as_str(), SECRET_MASK),
            None => text.to_string(),
        };

        let rule = format!("  {}", "─".repeat(RULE_WIDTH));
        self.console.blank();
        self.console.styled(Style::Success, "  Content:");
        self.console.line(&rule);
        for (i, line) in text.split('\n').enumerate() {
            self.console.line(format!("  {:3} | {}", i + 1, line));
        }
        self.console.line(&rule);
    }

    fn explain(&self, description: Option<&str>) {
        if self.options.explain {
            if let Some(description) = description {
                self.console.section(description);
            }
        }
    }

    fn confirm(&self, prompt: &str) -> DeployResult<()> {
        if !self.options.confirm {
            return Ok(());
        }

        match self.console.ask(prompt)? {
            // No operator left to ask
            None => Err(DeployError::Cancelled),
            Some(answer) if matches!(answer.to_lowercase().as_str(), "n" | "no") => {
                Err(DeployError::Cancelled)
            }
            Some(_) => Ok(()),
        }
    }

    fn ensure_open(&self) -> DeployResult<()> {
        if self.closed {
            return Err(DeployError::Other(anyhow::anyhow!("remote session is closed")));
        }
        Ok(())
    }

    /// Release the underlying connection. Later calls do nothing.
    pub fn close(&mut self) -> DeployResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!("closing remote session");
        self.transport.close()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: RemoteTransport> Drop for RemoteSession<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("failed to close remote session: {}", e);
        }
    }
}
