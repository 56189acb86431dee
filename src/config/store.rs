use crate::config::{DeployConfig, Field};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".deployment-config.toml";

const HEADER: &str = "# Mosaic Deployment Configuration\n# Auto-generated - edit with caution\n\n";

/// On-disk shape of the configuration file. Fields are declared in key order
/// so the written file is sorted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(alias = "workers", skip_serializing_if = "Option::is_none")]
    gunicorn_workers: Option<WorkerCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    install_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssh_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_conf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wsgi_module: Option<String>,
    #[serde(flatten, skip_serializing)]
    unknown: toml::Table,
}

/// Worker count as written by hand: usually a bare integer, sometimes quoted
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WorkerCount {
    Count(i64),
    Text(String),
}

impl WorkerCount {
    fn from_value(value: &str) -> Self {
        match value.parse() {
            Ok(count) => WorkerCount::Count(count),
            Err(_) => WorkerCount::Text(value.to_string()),
        }
    }

    fn into_value(self) -> String {
        match self {
            WorkerCount::Count(count) => count.to_string(),
            WorkerCount::Text(text) => text,
        }
    }
}

impl From<&DeployConfig> for SavedConfig {
    fn from(config: &DeployConfig) -> Self {
        let text = |field: Field| config.get(field).map(str::to_string);
        Self {
            app_name: text(Field::AppName),
            domain: text(Field::Domain),
            email: text(Field::Email),
            gunicorn_workers: config.get(Field::Workers).map(WorkerCount::from_value),
            host: text(Field::Host),
            install_path: text(Field::InstallPath),
            ssh_key: text(Field::SshKey),
            url_conf: text(Field::UrlConf),
            user: text(Field::User),
            wsgi_module: text(Field::WsgiModule),
            unknown: toml::Table::new(),
        }
    }
}

impl SavedConfig {
    fn into_config(self) -> DeployConfig {
        for key in self.unknown.keys() {
            tracing::debug!(%key, "ignoring unknown configuration key");
        }

        DeployConfig::new()
            .with(Field::AppName, self.app_name)
            .with(Field::Domain, self.domain)
            .with(Field::Email, self.email)
            .with(Field::Workers, self.gunicorn_workers.map(WorkerCount::into_value))
            .with(Field::Host, self.host)
            .with(Field::InstallPath, self.install_path)
            .with(Field::SshKey, self.ssh_key)
            .with(Field::UrlConf, self.url_conf)
            .with(Field::User, self.user)
            .with(Field::WsgiModule, self.wsgi_module)
    }
}

/// Flat TOML file holding the non-secret deployment settings
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `.deployment-config.toml` in the current directory
    pub fn in_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        Ok(Self::new(cwd.join(DEFAULT_CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved configuration; a missing file is an empty configuration
    pub fn load(&self) -> Result<DeployConfig> {
        if !self.path.exists() {
            return Ok(DeployConfig::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;
        let config = parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), fields = config.persistent().len(), "loaded configuration");
        Ok(config)
    }

    pub fn save(&self, config: &DeployConfig) -> Result<()> {
        let content = render(config)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "saved configuration");
        Ok(())
    }
}

/// Serialize the non-secret fields, sorted by key, under a comment header
pub fn render(config: &DeployConfig) -> Result<String> {
    let body = toml::to_string_pretty(&SavedConfig::from(config))
        .context("Failed to serialize config")?;
    Ok(format!("{}{}", HEADER, body))
}

pub fn parse(content: &str) -> Result<DeployConfig> {
    let saved: SavedConfig = toml::from_str(content)?;
    Ok(saved.into_config())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeployConfig {
        DeployConfig::new()
            .with(Field::Host, Some("203.0.113.7"))
            .with(Field::User, Some("deploy"))
            .with(Field::SshKey, Some("~/.ssh/id_ed25519"))
            .with(Field::InstallPath, Some("/var/www/mosaic"))
            .with(Field::AppName, Some("mosaic"))
            .with(Field::Domain, Some("blog.example.com"))
            .with(Field::Email, Some("me@example.com"))
            .with(Field::Workers, Some("3"))
            .with(Field::WsgiModule, Some("website.wsgi:application"))
            .with(Field::UrlConf, Some("website.urls"))
    }

    #[test]
    fn test_render_sorts_and_leaves_workers_unquoted() {
        let text = render(&sample()).unwrap();
        let body: Vec<&str> = text.lines().skip(3).collect();
        assert_eq!(body[0], "app_name = \"mosaic\"");
        assert_eq!(body[1], "domain = \"blog.example.com\"");
        assert!(body.contains(&"gunicorn_workers = 3"));
        assert!(text.starts_with("# Mosaic Deployment Configuration\n"));
    }

    #[test]
    fn test_persist_then_load_reproduces_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(DEFAULT_CONFIG_FILE));

        let mut config = sample().with(Field::UrlConf, Some("odd\"quote\\path"));
        config.set_secret_key("do-not-write-me");
        store.save(&config).unwrap();

        let written = fs::read_to_string(store.path()).unwrap();
        assert!(!written.contains("do-not-write-me"));
        assert!(!written.contains("secret"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.persistent(), config.persistent());
        assert_eq!(loaded.secret_key(), None);
    }

    #[test]
    fn test_control_characters_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(DEFAULT_CONFIG_FILE));
        let config = sample()
            .with(Field::Host, Some("vps\u{1}host"))
            .with(Field::UrlConf, Some("line\u{7f}end\u{1b}"));

        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap().persistent(), config.persistent());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nope.toml"));
        assert_eq!(store.load().unwrap(), DeployConfig::new());
    }

    #[test]
    fn test_loads_gunicorn_workers_key() {
        let config = parse("gunicorn_workers = 4\nhost = \"vps\"\n").unwrap();
        assert_eq!(config.get(Field::Workers), Some("4"));
        assert_eq!(config.get(Field::Host), Some("vps"));

        let saved = render(&config).unwrap();
        assert!(saved.contains("gunicorn_workers = 4"));
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_accepts_quoted_workers() {
        let config = parse("workers = \"4\"\ncolour = \"blue\"\n").unwrap();
        assert_eq!(config.get(Field::Workers), Some("4"));
        assert_eq!(config.persistent().len(), 1);
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        assert!(parse("[host]\nname = \"x\"\n").is_err());
    }
}
