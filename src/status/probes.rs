use super::{Check, Inspector};
use crate::error::DeployResult;
use crate::layout::{BACKUP_TIERS, NGINX_ERROR_LOG};
use crate::tools::{RemoteCommand, diag, docker, files, nginx, systemctl};
use crate::utils::{CommandOutput, RemoteTransport};
use chrono::{DateTime, NaiveDateTime, Utc};

const EXCERPT_LINES: usize = 3;
const EXCERPT_WIDTH: usize = 100;
const DISK_WARN_PERCENT: u32 = 90;
const CERT_WARN_DAYS: i64 = 14;

impl<T: RemoteTransport> Inspector<T> {
    fn probe(&mut self, command: &RemoteCommand) -> DeployResult<CommandOutput> {
        Ok(self.session.run(command)?.unwrap_or_default())
    }

    fn probe_privileged(&mut self, command: &RemoteCommand) -> DeployResult<CommandOutput> {
        Ok(self.session.run_privileged(command)?.unwrap_or_default())
    }

    pub(super) fn config_files(&mut self) -> DeployResult<Vec<Check>> {
        let layout = self.layout.clone();
        let backup_script = layout.backup_script();
        let mut expected = vec![
            (layout.env_file(), ".env file".to_string()),
            (backup_script.clone(), "backup.sh script".to_string()),
        ];
        for unit in layout.units() {
            expected.push((layout.unit_path(&unit), unit));
        }
        expected.push((layout.nginx_available(), "nginx site config".to_string()));
        expected.push((layout.nginx_enabled(), "nginx site symlink".to_string()));

        let mut checks = Vec::new();
        for (path, label) in expected {
            if !self.probe(&files::exists(&path))?.ok() {
                checks.push(Check::fail(format!("{} missing", label)));
            } else if path == backup_script {
                if self.probe(&files::is_executable(&path))?.ok() {
                    checks.push(Check::pass(format!("{} exists and is executable", label)));
                } else {
                    checks.push(Check::warn(format!("{} exists but is not executable", label)));
                }
            } else {
                checks.push(Check::pass(format!("{} exists", label)));
            }
        }
        Ok(checks)
    }

    pub(super) fn docker(&mut self) -> DeployResult<Vec<Check>> {
        let name = self.layout.app_name.clone();
        let tag = self.layout.image_tag();
        let mut checks = Vec::new();

        let running = self.probe_privileged(&docker::running(&name))?;
        match first_line(&running) {
            Some(line) => {
                let parts: Vec<&str> = line.split('|').collect();
                if let [container, status, image, ..] = parts.as_slice() {
                    checks.push(
                        Check::pass(format!("Container running: {}", container))
                            .with_detail(format!("Status: {}", status))
                            .with_detail(format!("Image: {}", image)),
                    );
                } else {
                    checks.push(Check::pass("Container running"));
                }
            }
            None => {
                checks.push(Check::fail("Container not running"));
                let any = self.probe_privileged(&docker::any_state(&name))?;
                if let Some(line) = first_line(&any) {
                    let status = line.split('|').nth(1).unwrap_or("stopped");
                    checks.push(Check::warn(format!(
                        "Container exists but is stopped ({})",
                        status
                    )));
                }
            }
        }

        let image = self.probe_privileged(&docker::image(&tag))?;
        match first_line(&image) {
            Some(line) => {
                let created = line.split('|').nth(1).unwrap_or("unknown");
                checks.push(Check::pass(format!("Image: {} (created {})", tag, created)));
            }
            None => checks.push(Check::fail(format!("Image {} not found", tag))),
        }

        Ok(checks)
    }

    pub(super) fn services(&mut self) -> DeployResult<Vec<Check>> {
        let mut checks = Vec::new();
        for unit in self.layout.units() {
            checks.push(self.unit_state(&unit, &unit)?);
        }
        Ok(checks)
    }

    pub(super) fn nginx(&mut self) -> DeployResult<Vec<Check>> {
        Ok(vec![self.unit_state("nginx", "Nginx")?])
    }

    fn unit_state(&mut self, unit: &str, label: &str) -> DeployResult<Check> {
        let output = self.probe(&systemctl::is_active(unit))?;
        let state = output.stdout_trimmed();
        Ok(if output.ok() && state == "active" {
            Check::pass(format!("{} active", label))
        } else if state.is_empty() {
            Check::fail(format!("{} inactive", label))
        } else {
            Check::fail(format!("{} {}", label, state))
        })
    }

    pub(super) fn health(&mut self) -> DeployResult<Vec<Check>> {
        let domain = self.domain.clone();

        for scheme in ["https", "http"] {
            let output = self.probe(&diag::http_status(&format!("{}://{}/", scheme, domain)))?;
            if !output.ok() {
                continue;
            }

            let code = output.stdout_trimmed().to_string();
            let label = scheme.to_uppercase();
            if !(code.starts_with('2') || code.starts_with('3')) {
                return Ok(vec![Check::warn(format!(
                    "Application returned {} {}",
                    label, code
                ))]);
            }

            let mut checks = vec![Check::pass(format!(
                "Application responding ({} {})",
                label, code
            ))];
            if scheme == "https" {
                checks.push(self.certificate()?);
            }
            return Ok(checks);
        }

        Ok(vec![Check::fail(format!(
            "Application not responding at {}",
            domain
        ))])
    }

    fn certificate(&mut self) -> DeployResult<Check> {
        let domain = self.domain.clone();
        let output = self.probe(&diag::certificate_dates(&domain))?;
        let not_after = output
            .stdout
            .lines()
            .find_map(|line| line.trim().strip_prefix("notAfter="))
            .map(str::trim);

        let Some(raw) = not_after.filter(|_| output.ok()) else {
            return Ok(Check::warn("Could not read SSL certificate"));
        };

        Ok(match parse_cert_expiry(raw) {
            None => Check::warn(format!("SSL certificate expires: {} (unparsed)", raw)),
            Some(expiry) => classify_expiry(raw, expiry, self.now),
        })
    }

    pub(super) fn disk(&mut self) -> DeployResult<Vec<Check>> {
        let output = self.probe(&diag::disk_usage())?;
        let Some(line) = output.stdout.lines().nth(1).filter(|_| output.ok()) else {
            return Ok(vec![Check::warn("Could not read disk usage")]);
        };

        let line = line.trim().to_string();
        Ok(vec![match usage_percent(&line) {
            Some(used) if used >= DISK_WARN_PERCENT => {
                Check::warn(format!("Disk {}% full", used)).with_detail(line)
            }
            _ => Check::pass(line),
        }])
    }

    pub(super) fn backups(&mut self) -> DeployResult<Vec<Check>> {
        let mut tiers = Vec::new();
        for tier in BACKUP_TIERS {
            let dir = self.layout.backup_tier_dir(tier);
            let output = self.probe(&files::list_backups(&dir))?;
            let found: Vec<String> = output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
                .collect();
            tiers.push((tier, found));
        }

        let Some(latest) = tiers.iter().find_map(|(_, found)| found.first().cloned()) else {
            return Ok(vec![Check::warn("No backups found")]);
        };

        let mut check = Check::pass(format!("Latest backup: {}", latest));
        for (tier, found) in &tiers {
            let detail = match found.first() {
                Some(newest) => format!(
                    "{}: {} backups (latest {})",
                    capitalize(tier),
                    found.len(),
                    newest
                ),
                None => format!("{}: 0 backups", capitalize(tier)),
            };
            check = check.with_detail(detail);
        }
        Ok(vec![check])
    }

    pub(super) fn recent_errors(&mut self) -> DeployResult<Vec<Check>> {
        let sources = [
            ("Recent errors in Docker logs:", docker::log_errors(&self.layout.app_name), true),
            (
                "Recent systemd errors:",
                systemctl::recent_errors(&self.layout.app_unit()),
                false,
            ),
            ("Recent nginx errors:", nginx::error_log_excerpt(NGINX_ERROR_LOG), true),
        ];

        let mut checks = Vec::new();
        for (label, command, privileged) in sources {
            let output = if privileged {
                self.probe_privileged(&command)?
            } else {
                self.probe(&command)?
            };
            if !output.ok() {
                continue;
            }

            let excerpt = excerpt(&output.stdout);
            if !excerpt.is_empty() {
                checks.push(excerpt.into_iter().fold(Check::warn(label), Check::with_detail));
            }
        }

        if checks.is_empty() {
            checks.push(Check::pass("No recent errors found"));
        }
        Ok(checks)
    }
}

fn first_line(output: &CommandOutput) -> Option<&str> {
    if !output.ok() {
        return None;
    }
    output.stdout.lines().map(str::trim).find(|l| !l.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First few non-empty lines, each cut to a readable width
pub(crate) fn excerpt(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(EXCERPT_LINES)
        .map(|l| l.chars().take(EXCERPT_WIDTH).collect())
        .collect()
}

/// `Use%` column of a `df -h` data line
pub(crate) fn usage_percent(line: &str) -> Option<u32> {
    line.split_whitespace()
        .find_map(|field| field.strip_suffix('%'))
        .and_then(|n| n.parse().ok())
}

/// Parse openssl's `notAfter` date, e.g. `Mar  1 12:00:00 2026 GMT`
pub(crate) fn parse_cert_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn classify_expiry(raw: &str, expiry: DateTime<Utc>, now: DateTime<Utc>) -> Check {
    let days = (expiry - now).num_days();
    if expiry <= now {
        Check::fail(format!("SSL certificate expired: {}", raw))
    } else if days < CERT_WARN_DAYS {
        Check::warn(format!("SSL certificate expires soon: {} ({} days)", raw, days))
    } else {
        Check::pass(format!("SSL certificate expires: {} ({} days)", raw, days))
    }
}
