// Command module routing
//
// To add a new command:
// 1. Create a new file in this directory (e.g., `mycommand.rs`)
// 2. Add `pub mod mycommand;` below
// 3. Add the match arm in `handle_command` function

pub mod setup;
pub mod status;

use crate::Commands;
use crate::config::{ConfigStore, DeployConfig, Field, expand_tilde};
use crate::error::DeployError;
use crate::utils::{Console, SshConnection};
use anyhow::Result;
use std::path::PathBuf;

/// Lines of captured command output shown when a run fails
const FAILURE_OUTPUT_LINES: usize = 20;

/// Dispatch command to appropriate handler and return the process exit code
pub fn handle_command(config_path: Option<PathBuf>, command: Commands) -> Result<i32> {
    let store = match config_path {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::in_current_dir()?,
    };
    let console = Console::stdio();

    match command {
        Commands::Setup(args) => setup::handle_setup(&store, &console, &args),
        Commands::Status(target) => status::handle_status(&store, &console, &target),
    }
}

/// Open the SSH connection described by `config`
pub(crate) fn connect(config: &DeployConfig, console: &Console) -> Result<SshConnection, DeployError> {
    let host = config.host()?;
    let user = config.user()?;
    let key = expand_tilde(config.require(Field::SshKey)?)?;

    let connection = SshConnection::connect(host, user, &key)?;
    console.success(format!("Connected to {}", host));
    Ok(connection)
}

/// Exit code for an error that ended a command before or outside a pipeline
pub(crate) fn exit_code(error: &DeployError) -> i32 {
    if error.is_cancelled() { 130 } else { 1 }
}

/// Print an error along with the failed command's details, if it has any
pub(crate) fn report_error(console: &Console, error: &DeployError) {
    if let DeployError::CommandFailed {
        command,
        description,
        output,
        ..
    } = error
    {
        console.line(format!("    Command: {}", command));
        if let Some(description) = description {
            console.line(format!("    Description: {}", description));
        }
        let lines: Vec<&str> = output.lines().collect();
        if !lines.is_empty() {
            console.line("    Output:");
            let start = lines.len().saturating_sub(FAILURE_OUTPUT_LINES);
            for line in &lines[start..] {
                console.line(format!("      {}", line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_shows_tail_of_output() {
        let output: String = (1..=25).map(|n| format!("line {}\n", n)).collect();
        let error = DeployError::CommandFailed {
            command: "docker build -t mosaic:latest /var/www/mosaic/build".to_string(),
            description: Some("Building Docker image on VPS".to_string()),
            status: 1,
            output,
        };
        let console = Console::captured();

        report_error(&console, &error);

        let lines = console.lines();
        assert_eq!(
            lines[0],
            "    Command: docker build -t mosaic:latest /var/www/mosaic/build"
        );
        assert_eq!(lines[1], "    Description: Building Docker image on VPS");
        assert_eq!(lines[2], "    Output:");
        assert_eq!(lines[3], "      line 6");
        assert_eq!(lines.last().map(String::as_str), Some("      line 25"));
        assert_eq!(lines.len(), 3 + FAILURE_OUTPUT_LINES);
    }

    #[test]
    fn test_other_errors_add_no_detail() {
        let console = Console::captured();
        report_error(&console, &DeployError::stage("Nginx configuration is invalid"));
        assert!(console.lines().is_empty());

        assert_eq!(exit_code(&DeployError::Cancelled), 130);
        assert_eq!(exit_code(&DeployError::stage("x")), 1);
    }
}
