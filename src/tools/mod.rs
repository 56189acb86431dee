// Typed command builders, one module per external tool on the target host
pub mod apt;
pub mod certbot;
pub mod diag;
pub mod docker;
pub mod files;
pub mod nginx;
pub mod systemctl;
pub mod ufw;

use crate::utils::shell_escape;

/// A shell line to run on the remote host, with its operator-facing description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    line: String,
    description: Option<String>,
    allow_failure: bool,
}

impl RemoteCommand {
    pub fn new(program: &str) -> Self {
        Self {
            line: program.to_string(),
            description: None,
            allow_failure: false,
        }
    }

    /// Take a prebuilt shell line as-is (pipes, redirects)
    pub fn shell(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            description: None,
            allow_failure: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.line.push(' ');
        self.line.push_str(&shell_escape(arg.as_ref()));
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        args.into_iter().fold(self, |cmd, a| cmd.arg(a))
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Return non-zero exits as results instead of failing
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn allows_failure(&self) -> bool {
        self.allow_failure
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_escaped_once() {
        let cmd = RemoteCommand::new("mkdir").arg("-p").arg("/var/www/my site");
        assert_eq!(cmd.line(), "mkdir -p '/var/www/my site'");
        assert!(!cmd.allows_failure());
        assert_eq!(cmd.description(), None);
    }

    #[test]
    fn test_shell_lines_are_kept_verbatim() {
        let cmd = RemoteCommand::shell("df -h / | tail -1")
            .describe("Disk usage")
            .allow_failure();
        assert_eq!(cmd.to_string(), "df -h / | tail -1");
        assert_eq!(cmd.description(), Some("Disk usage"));
        assert!(cmd.allows_failure());
    }
}
