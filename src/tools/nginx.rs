use super::RemoteCommand;

/// Syntax check of the whole nginx configuration
pub fn test_config() -> RemoteCommand {
    RemoteCommand::new("nginx")
        .arg("-t")
        .describe("Testing nginx configuration")
        .allow_failure()
}

pub fn error_log_excerpt(log_path: &str) -> RemoteCommand {
    RemoteCommand::shell(format!(
        "tail -50 {} 2>/dev/null | grep -iE 'error|crit|alert|emerg' | tail -5",
        crate::utils::shell_escape(log_path)
    ))
    .describe("Reading recent nginx errors")
    .allow_failure()
}
