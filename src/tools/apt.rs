use super::RemoteCommand;

pub fn update() -> RemoteCommand {
    RemoteCommand::new("apt-get")
        .arg("update")
        .describe("Updating package lists")
}

pub fn install(packages: &[&str]) -> RemoteCommand {
    RemoteCommand::new("apt-get")
        .args(["install", "-y"])
        .args(packages)
        .describe(format!("Installing {}", packages.join(", ")))
}
