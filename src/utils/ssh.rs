use crate::error::DeployError;
use crate::utils::exec::{CommandOutput, RemoteTransport, local, shell_escape};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;

/// SSH connection for remote command execution.
///
/// One OpenSSH control master is started on connect; every command and
/// upload afterwards is multiplexed over it, so the whole run shares a
/// single authenticated connection.
pub struct SshConnection {
    destination: String,
    control_path: PathBuf,
    // Holds the control socket; removed when the connection is dropped
    _control_dir: TempDir,
    closed: bool,
}

impl SshConnection {
    pub fn connect(host: &str, user: &str, key: &Path) -> Result<Self, DeployError> {
        let connection_error = |reason: String| DeployError::Connection {
            host: host.to_string(),
            reason,
        };

        if !local::check_command_exists("ssh") {
            return Err(connection_error(
                "ssh not found. Please install openssh-client".to_string(),
            ));
        }

        let control_dir = tempfile::Builder::new()
            .prefix("mosaic-ssh-")
            .tempdir()
            .map_err(|e| connection_error(format!("cannot create control directory: {}", e)))?;
        let control_path = control_dir.path().join("master.sock");
        let log_path = control_dir.path().join("master.log");
        let destination = format!("{}@{}", user, host);

        // The master forks into the background once authenticated, so its
        // stderr goes to a file rather than a pipe nobody would close
        let log = File::create(&log_path)
            .map_err(|e| connection_error(format!("cannot create ssh log: {}", e)))?;

        tracing::debug!(%destination, control = %control_path.display(), "starting ssh control master");
        let status = Command::new("ssh")
            .args(["-M", "-f", "-N"])
            .arg("-S")
            .arg(&control_path)
            .args([
                "-o",
                "ControlPersist=yes",
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "ServerAliveInterval=15",
                "-o",
                "ServerAliveCountMax=4",
                "-o",
                "StrictHostKeyChecking=accept-new",
            ])
            .arg("-i")
            .arg(key)
            .arg(&destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(log)
            .status()
            .map_err(|e| connection_error(format!("failed to spawn ssh: {}", e)))?;

        if !status.success() {
            let reason = std::fs::read_to_string(&log_path)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            let reason = if reason.is_empty() {
                format!("ssh exited with status {}", status.code().unwrap_or(-1))
            } else {
                reason
            };
            return Err(connection_error(reason));
        }

        let mut conn = Self {
            destination,
            control_path,
            _control_dir: control_dir,
            closed: false,
        };

        let probe = conn
            .exec("echo \"Connection successful\"")
            .map_err(|e| connection_error(format!("{:#}", e)))?;
        if !probe.ok() {
            let reason = probe.combined();
            // Best effort: the master is useless if it cannot run commands
            let _ = conn.close();
            return Err(connection_error(reason));
        }

        Ok(conn)
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-S")
            .arg(&self.control_path)
            .args(["-o", "ControlMaster=no", "-o", "BatchMode=yes"])
            .arg(&self.destination);
        cmd
    }
}

impl RemoteTransport for SshConnection {
    fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        if self.closed {
            anyhow::bail!("SSH connection to {} is closed", self.destination);
        }

        tracing::debug!(destination = %self.destination, %command, "ssh exec");
        let output = self
            .base_command()
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute command: {}", command))?;

        Ok(output.into())
    }

    fn upload(&mut self, content: &[u8], remote_path: &str) -> Result<()> {
        if self.closed {
            anyhow::bail!("SSH connection to {} is closed", self.destination);
        }

        tracing::debug!(destination = %self.destination, %remote_path, bytes = content.len(), "ssh upload");
        let child = self
            .base_command()
            .arg(format!("cat > {}", shell_escape(remote_path)))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn SSH command for writing file".to_string())?;

        feed_and_wait(child, content, remote_path)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        tracing::debug!(destination = %self.destination, "stopping ssh control master");
        let output = Command::new("ssh")
            .arg("-S")
            .arg(&self.control_path)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to stop SSH control master")?;

        if !output.status.success() {
            anyhow::bail!(
                "Failed to stop SSH control master: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

/// Stream `content` into the child's stdin, then reap it. The child is
/// waited on even when the write fails, and its stderr goes into the error.
fn feed_and_wait(mut child: Child, content: &[u8], remote_path: &str) -> Result<()> {
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(content).and_then(|()| stdin.flush()),
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to write file: {}", remote_path))?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        anyhow::bail!("Failed to write file {}: {}", remote_path, stderr);
    }
    if let Err(e) = written {
        anyhow::bail!("Failed to write file {}: {} {}", remote_path, e, stderr);
    }

    Ok(())
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        if let Err(e) = RemoteTransport::close(self) {
            tracing::warn!("{:#}", e);
        }
    }
}
