use anyhow::Result;
use std::process::Output;

/// Local command execution helpers
pub mod local {
    /// Check if a command exists using native Rust (which crate)
    pub fn check_command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Exit status and captured streams of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn ok(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// stdout followed by stderr, for error reports
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// One open channel to a remote host.
///
/// Implementations execute shell lines verbatim; gating, confirmation and
/// privilege escalation are the session's business.
pub trait RemoteTransport {
    /// Execute a shell command line and capture its output
    fn exec(&mut self, command: &str) -> Result<CommandOutput>;

    /// Write `content` to `remote_path`, replacing any existing file
    fn upload(&mut self, content: &[u8], remote_path: &str) -> Result<()>;

    /// Tear down the channel
    fn close(&mut self) -> Result<()>;
}

/// Escape a string for safe use in shell commands
pub fn shell_escape(s: &str) -> String {
    // Simple escaping - wrap in single quotes and escape single quotes
    if s.is_empty() {
        return "''".to_string();
    }

    // If string contains no special characters, return as-is
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.' | ':' | '@' | '=' | '+' | ',')
    }) {
        return s.to_string();
    }

    // Escape single quotes by ending quote, adding escaped quote, starting new quote
    let escaped = s.replace('\'', "'\"'\"'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape_leaves_plain_words() {
        assert_eq!(shell_escape("/var/www/mosaic"), "/var/www/mosaic");
        assert_eq!(shell_escape("mosaic:latest"), "mosaic:latest");
        assert_eq!(shell_escape("admin@example.com"), "admin@example.com");
    }

    #[test]
    fn test_shell_escape_quotes_specials() {
        assert_eq!(shell_escape(""), "''");
        assert_eq!(shell_escape("a b"), "'a b'");
        assert_eq!(shell_escape("$HOME"), "'$HOME'");
        assert_eq!(shell_escape("it's"), "'it'\"'\"'s'");
        assert_eq!(
            shell_escape("{{.Names}}|{{.Status}}"),
            "'{{.Names}}|{{.Status}}'"
        );
    }

    #[test]
    fn test_combined_output() {
        assert_eq!(CommandOutput::success("ok\n").combined(), "ok");
        assert_eq!(CommandOutput::failure(1, "boom").combined(), "boom");
        let both = CommandOutput {
            status: 1,
            stdout: "partial".into(),
            stderr: "boom".into(),
        };
        assert_eq!(both.combined(), "partial\nboom");
        assert!(!both.ok());
    }
}
