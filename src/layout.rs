use crate::config::DeployConfig;
use crate::error::DeployResult;

pub const SYSTEMD_DIR: &str = "/etc/systemd/system";
pub const NGINX_AVAILABLE_DIR: &str = "/etc/nginx/sites-available";
pub const NGINX_ENABLED_DIR: &str = "/etc/nginx/sites-enabled";
pub const NGINX_ERROR_LOG: &str = "/var/log/nginx/error.log";

/// Backup retention tiers, newest first
pub const BACKUP_TIERS: [&str; 4] = ["hourly", "daily", "weekly", "monthly"];

/// Where everything lives on the target host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub app_name: String,
    pub install_path: String,
}

impl RemoteLayout {
    pub fn new(app_name: impl Into<String>, install_path: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            install_path: normalize_dir(install_path.into()),
        }
    }

    pub fn from_config(config: &DeployConfig) -> DeployResult<Self> {
        Ok(Self::new(config.app_name()?, config.install_path()?))
    }

    pub fn build_dir(&self) -> String {
        format!("{}/build", self.install_path)
    }

    pub fn env_file(&self) -> String {
        format!("{}/.env", self.install_path)
    }

    pub fn backup_script(&self) -> String {
        format!("{}/backup.sh", self.install_path)
    }

    pub fn database(&self) -> String {
        format!("{}/db.sqlite3", self.install_path)
    }

    pub fn media_dir(&self) -> String {
        format!("{}/media", self.install_path)
    }

    pub fn static_dir(&self) -> String {
        format!("{}/static", self.install_path)
    }

    pub fn backup_tier_dir(&self, tier: &str) -> String {
        format!("{}/backups/{}", self.install_path, tier)
    }

    /// Remote staging path of the uploaded project archive
    pub fn remote_archive(&self) -> String {
        format!("/tmp/{}-project.tar.gz", self.app_name)
    }

    pub fn image_tag(&self) -> String {
        format!("{}:latest", self.app_name)
    }

    pub fn app_unit(&self) -> String {
        format!("{}-app.service", self.app_name)
    }

    pub fn backup_unit(&self) -> String {
        format!("{}-backup.service", self.app_name)
    }

    pub fn backup_timer(&self) -> String {
        format!("{}-backup.timer", self.app_name)
    }

    /// App service, backup service, backup timer
    pub fn units(&self) -> [String; 3] {
        [self.app_unit(), self.backup_unit(), self.backup_timer()]
    }

    pub fn unit_path(&self, unit: &str) -> String {
        format!("{}/{}", SYSTEMD_DIR, unit)
    }

    pub fn nginx_available(&self) -> String {
        format!("{}/{}", NGINX_AVAILABLE_DIR, self.app_name)
    }

    pub fn nginx_enabled(&self) -> String {
        format!("{}/{}", NGINX_ENABLED_DIR, self.app_name)
    }
}

fn normalize_dir(path: String) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_naming_convention() {
        let layout = RemoteLayout::new("mosaic", "/var/www/mosaic/");
        assert_eq!(layout.build_dir(), "/var/www/mosaic/build");
        assert_eq!(layout.env_file(), "/var/www/mosaic/.env");
        assert_eq!(layout.backup_tier_dir("daily"), "/var/www/mosaic/backups/daily");
        assert_eq!(
            layout.units(),
            [
                "mosaic-app.service".to_string(),
                "mosaic-backup.service".to_string(),
                "mosaic-backup.timer".to_string(),
            ]
        );
        assert_eq!(
            layout.unit_path("mosaic-app.service"),
            "/etc/systemd/system/mosaic-app.service"
        );
        assert_eq!(layout.nginx_enabled(), "/etc/nginx/sites-enabled/mosaic");
        assert_eq!(layout.remote_archive(), "/tmp/mosaic-project.tar.gz");
    }
}
