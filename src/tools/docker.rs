use super::RemoteCommand;
use crate::utils::shell_escape;

pub fn build(tag: &str, context_dir: &str) -> RemoteCommand {
    RemoteCommand::new("docker")
        .args(["build", "-t", tag, context_dir])
        .describe("Building Docker image on VPS (this may take a few minutes)")
        .allow_failure()
}

fn exact_name(name: &str) -> String {
    format!("name=^{}$", name)
}

/// Running containers named exactly `name`, as `name|status|image`
pub fn running(name: &str) -> RemoteCommand {
    RemoteCommand::new("docker")
        .args(["ps", "--filter"])
        .arg(exact_name(name))
        .args(["--format", "{{.Names}}|{{.Status}}|{{.Image}}"])
        .describe(format!("Looking for running container {}", name))
        .allow_failure()
}

/// Containers named exactly `name` in any state, as `name|status`
pub fn any_state(name: &str) -> RemoteCommand {
    RemoteCommand::new("docker")
        .args(["ps", "-a", "--filter"])
        .arg(exact_name(name))
        .args(["--format", "{{.Names}}|{{.Status}}"])
        .describe(format!("Looking for stopped container {}", name))
        .allow_failure()
}

/// Local image `tag`, as `id|created`
pub fn image(tag: &str) -> RemoteCommand {
    RemoteCommand::new("docker")
        .arg("images")
        .arg(tag)
        .args(["--format", "{{.ID}}|{{.CreatedAt}}"])
        .describe(format!("Looking for image {}", tag))
        .allow_failure()
}

pub fn log_errors(name: &str) -> RemoteCommand {
    RemoteCommand::shell(format!(
        "docker logs {} --tail 50 2>&1 | grep -iE '(error|exception|fatal|critical)' | head -5",
        shell_escape(name)
    ))
    .describe(format!("Reading recent errors from container {}", name))
    .allow_failure()
}
