use super::RemoteCommand;
use crate::utils::shell_escape;

pub fn mkdir_p(path: &str) -> RemoteCommand {
    RemoteCommand::new("mkdir")
        .arg("-p")
        .arg(path)
        .describe(format!("Creating directory {}", path))
}

pub fn chown_recursive(owner: &str, path: &str) -> RemoteCommand {
    RemoteCommand::new("chown")
        .arg("-R")
        .arg(owner)
        .arg(path)
        .describe(format!("Giving {} ownership of {}", owner, path))
}

pub fn chmod(mode: &str, path: &str) -> RemoteCommand {
    RemoteCommand::new("chmod")
        .arg(mode)
        .arg(path)
        .describe(format!("Setting mode {} on {}", mode, path))
}

/// Create `path` if missing without touching existing contents
pub fn touch(path: &str) -> RemoteCommand {
    RemoteCommand::new("touch")
        .arg(path)
        .describe(format!("Creating {} if missing", path))
}

pub fn move_into_place(from: &str, to: &str) -> RemoteCommand {
    RemoteCommand::new("mv")
        .arg(from)
        .arg(to)
        .describe(format!("Installing {}", to))
}

pub fn symlink(target: &str, link: &str) -> RemoteCommand {
    RemoteCommand::new("ln")
        .arg("-sf")
        .arg(target)
        .arg(link)
        .describe(format!("Linking {} -> {}", link, target))
}

pub fn remove(path: &str) -> RemoteCommand {
    RemoteCommand::new("rm")
        .arg("-f")
        .arg(path)
        .describe(format!("Cleaning up {}", path))
}

pub fn extract_archive(archive: &str, into: &str) -> RemoteCommand {
    RemoteCommand::new("tar")
        .arg("xzf")
        .arg(archive)
        .arg("-C")
        .arg(into)
        .describe("Extracting project files on VPS")
}

pub fn exists(path: &str) -> RemoteCommand {
    RemoteCommand::new("test")
        .arg("-e")
        .arg(path)
        .allow_failure()
}

pub fn is_executable(path: &str) -> RemoteCommand {
    RemoteCommand::new("test")
        .arg("-x")
        .arg(path)
        .allow_failure()
}

/// The `SECRET_KEY=` line of an env file, if the file exists
pub fn secret_key_line(env_file: &str) -> RemoteCommand {
    RemoteCommand::shell(format!(
        "cat {} 2>/dev/null | grep '^SECRET_KEY='",
        shell_escape(env_file)
    ))
    .describe("Checking for existing SECRET_KEY")
    .allow_failure()
}

/// Newest-first listing of database backups in `dir`
pub fn list_backups(dir: &str) -> RemoteCommand {
    RemoteCommand::shell(format!(
        "ls -1t {}/db-*.sqlite3 2>/dev/null",
        shell_escape(dir)
    ))
    .allow_failure()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_lookup_tolerates_missing_file() {
        let cmd = secret_key_line("/var/www/mosaic/.env");
        assert_eq!(
            cmd.line(),
            "cat /var/www/mosaic/.env 2>/dev/null | grep '^SECRET_KEY='"
        );
        assert!(cmd.allows_failure());
    }

    #[test]
    fn test_backup_glob_stays_unquoted() {
        assert_eq!(
            list_backups("/var/www/mosaic/backups/hourly").line(),
            "ls -1t /var/www/mosaic/backups/hourly/db-*.sqlite3 2>/dev/null"
        );
    }
}
