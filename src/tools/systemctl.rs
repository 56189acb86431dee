use super::RemoteCommand;
use crate::utils::shell_escape;

fn systemctl(action: &str, unit: &str) -> RemoteCommand {
    RemoteCommand::new("systemctl").arg(action).arg(unit)
}

pub fn enable(unit: &str) -> RemoteCommand {
    systemctl("enable", unit).describe(format!("Enabling {}", unit))
}

pub fn start(unit: &str) -> RemoteCommand {
    systemctl("start", unit).describe(format!("Starting {}", unit))
}

/// Restart rather than start, so changed configuration is picked up
pub fn restart(unit: &str) -> RemoteCommand {
    systemctl("restart", unit).describe(format!("Restarting {}", unit))
}

pub fn reload(unit: &str) -> RemoteCommand {
    systemctl("reload", unit).describe(format!("Reloading {}", unit))
}

pub fn daemon_reload() -> RemoteCommand {
    RemoteCommand::new("systemctl")
        .arg("daemon-reload")
        .describe("Reloading systemd daemon")
}

pub fn is_active(unit: &str) -> RemoteCommand {
    systemctl("is-active", unit)
        .describe(format!("Checking whether {} is active", unit))
        .allow_failure()
}

/// Error-priority journal lines for `unit` from the last hour
pub fn recent_errors(unit: &str) -> RemoteCommand {
    RemoteCommand::shell(format!(
        "journalctl -u {} --since '1 hour ago' --no-pager -p err 2>/dev/null | tail -5",
        shell_escape(unit)
    ))
    .describe(format!("Reading recent errors for {}", unit))
    .allow_failure()
}
