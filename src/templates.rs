//! Deployment file templates, compiled into the binary.
//!
//! A directory passed with `--templates` overrides individual files by name;
//! anything it does not contain falls back to the embedded copy.

use crate::config::{DeployConfig, Field};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::PathBuf;

pub static DOCKERFILE: &str = include_str!("../templates/Dockerfile");
pub static DOCKERIGNORE: &str = include_str!("../templates/.dockerignore");
pub static ENTRYPOINT: &str = include_str!("../templates/docker-entrypoint.sh");
pub static ENV_FILE: &str = include_str!("../templates/env.template");
pub static BACKUP_SCRIPT: &str = include_str!("../templates/backup.sh");
pub static APP_SERVICE: &str = include_str!("../templates/app.service");
pub static BACKUP_SERVICE: &str = include_str!("../templates/backup.service");
pub static BACKUP_TIMER: &str = include_str!("../templates/backup.timer");
pub static NGINX_SITE: &str = include_str!("../templates/nginx.conf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Dockerfile,
    DockerIgnore,
    Entrypoint,
    EnvFile,
    BackupScript,
    AppService,
    BackupService,
    BackupTimer,
    NginxSite,
}

impl Template {
    pub const ALL: [Template; 9] = [
        Template::Dockerfile,
        Template::DockerIgnore,
        Template::Entrypoint,
        Template::EnvFile,
        Template::BackupScript,
        Template::AppService,
        Template::BackupService,
        Template::BackupTimer,
        Template::NginxSite,
    ];

    /// File name in the templates directory
    pub fn file_name(self) -> &'static str {
        match self {
            Template::Dockerfile => "Dockerfile",
            Template::DockerIgnore => ".dockerignore",
            Template::Entrypoint => "docker-entrypoint.sh",
            Template::EnvFile => "env.template",
            Template::BackupScript => "backup.sh",
            Template::AppService => "app.service",
            Template::BackupService => "backup.service",
            Template::BackupTimer => "backup.timer",
            Template::NginxSite => "nginx.conf",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            Template::Dockerfile => DOCKERFILE,
            Template::DockerIgnore => DOCKERIGNORE,
            Template::Entrypoint => ENTRYPOINT,
            Template::EnvFile => ENV_FILE,
            Template::BackupScript => BACKUP_SCRIPT,
            Template::AppService => APP_SERVICE,
            Template::BackupService => BACKUP_SERVICE,
            Template::BackupTimer => BACKUP_TIMER,
            Template::NginxSite => NGINX_SITE,
        }
    }
}

/// Where template text comes from for one run
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    override_dir: Option<PathBuf>,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: Some(dir.into()),
        }
    }

    pub fn load(&self, template: Template) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(template.file_name());
            if path.is_file() {
                tracing::debug!(path = %path.display(), "using template override");
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template: {}", path.display()))?;
                return Ok(Cow::Owned(content));
            }
        }
        Ok(Cow::Borrowed(template.builtin()))
    }

    /// Load and render in one step
    pub fn render(&self, template: Template, config: &DeployConfig) -> Result<String> {
        Ok(render(&self.load(template)?, config))
    }
}

const PLACEHOLDERS: [(&str, Field); 8] = [
    ("{{APP_NAME}}", Field::AppName),
    ("{{DOMAIN}}", Field::Domain),
    ("{{INSTALL_PATH}}", Field::InstallPath),
    ("{{GUNICORN_WORKERS}}", Field::Workers),
    // Short spelling accepted in override templates
    ("{{WORKERS}}", Field::Workers),
    ("{{WSGI_MODULE}}", Field::WsgiModule),
    ("{{URL_CONF}}", Field::UrlConf),
    ("{{EMAIL}}", Field::Email),
];

/// Literal placeholder substitution. Placeholders without a value, and any
/// this function does not know, are left as they are.
pub fn render(template: &str, config: &DeployConfig) -> String {
    let mut out = template.to_string();

    for (placeholder, field) in PLACEHOLDERS {
        if let Some(value) = config.get(field) {
            out = out.replace(placeholder, value);
        }
    }
    if let Some(secret) = config.secret_key() {
        out = out.replace("{{SECRET_KEY}}", secret);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DeployConfig {
        let mut config = DeployConfig::new()
            .with(Field::AppName, Some("mosaic"))
            .with(Field::Domain, Some("blog.example.com"))
            .with(Field::InstallPath, Some("/var/www/mosaic"))
            .with(Field::Workers, Some("3"))
            .with(Field::WsgiModule, Some("website.wsgi:application"))
            .with(Field::UrlConf, Some("website.urls"))
            .with(Field::Email, Some("me@example.com"));
        config.set_secret_key("s3cr3t");
        config
    }

    #[test]
    fn test_render_substitutes_every_known_placeholder() {
        let out = render(
            "{{APP_NAME}} {{DOMAIN}} {{INSTALL_PATH}} {{GUNICORN_WORKERS}} {{WSGI_MODULE}} \
             {{URL_CONF}} {{SECRET_KEY}} {{EMAIL}}",
            &config(),
        );
        assert_eq!(
            out,
            "mosaic blog.example.com /var/www/mosaic 3 website.wsgi:application \
             website.urls s3cr3t me@example.com"
        );
    }

    #[test]
    fn test_both_worker_spellings_render() {
        let out = render("--workers {{GUNICORN_WORKERS}} -w {{WORKERS}}", &config());
        assert_eq!(out, "--workers 3 -w 3");
    }

    #[test]
    fn test_unknown_and_missing_placeholders_stay() {
        let out = render("{{APP_NAME}} {{COLOUR}} {{SECRET_KEY}}", &DeployConfig::new());
        assert_eq!(out, "{{APP_NAME}} {{COLOUR}} {{SECRET_KEY}}");
    }

    #[test]
    fn test_builtins_render_fully() {
        let set = TemplateSet::builtin();
        for template in Template::ALL {
            let out = set.render(template, &config()).unwrap();
            assert!(!out.contains("{{"), "{} left a placeholder", template.file_name());
        }
    }

    #[test]
    fn test_override_dir_replaces_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nginx.conf"), "server_name {{DOMAIN}};").unwrap();
        let set = TemplateSet::with_overrides(dir.path());

        assert_eq!(
            set.render(Template::NginxSite, &config()).unwrap(),
            "server_name blog.example.com;"
        );
        assert_eq!(set.load(Template::Dockerfile).unwrap(), DOCKERFILE);
    }
}
