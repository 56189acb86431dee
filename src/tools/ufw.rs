use super::RemoteCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Allow,
    Deny,
}

impl Policy {
    fn as_str(self) -> &'static str {
        match self {
            Policy::Allow => "allow",
            Policy::Deny => "deny",
        }
    }
}

pub fn allow_tcp(port: u16, label: &str) -> RemoteCommand {
    RemoteCommand::new("ufw")
        .arg("allow")
        .arg(format!("{}/tcp", port))
        .describe(format!("Allowing {} (port {})", label, port))
}

pub fn default_policy(policy: Policy, direction: Direction) -> RemoteCommand {
    RemoteCommand::new("ufw")
        .args(["default", policy.as_str(), direction.as_str()])
        .describe(format!(
            "Setting default {} for {}",
            policy.as_str(),
            direction.as_str()
        ))
}

/// `--force` skips ufw's own "may disrupt ssh" prompt
pub fn enable() -> RemoteCommand {
    RemoteCommand::new("ufw")
        .args(["--force", "enable"])
        .describe("Enabling UFW firewall")
}
