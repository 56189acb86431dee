use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// One named configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Host,
    User,
    SshKey,
    Domain,
    InstallPath,
    Email,
    AppName,
    Workers,
    WsgiModule,
    UrlConf,
}

impl Field {
    /// Every field, in prompt order
    pub const ALL: [Field; 10] = [
        Field::Host,
        Field::User,
        Field::SshKey,
        Field::Domain,
        Field::InstallPath,
        Field::Email,
        Field::AppName,
        Field::Workers,
        Field::WsgiModule,
        Field::UrlConf,
    ];

    /// Fields the status inspector needs
    pub const STATUS: [Field; 6] = [
        Field::Host,
        Field::User,
        Field::SshKey,
        Field::Domain,
        Field::InstallPath,
        Field::AppName,
    ];

    /// Key used in the persisted configuration file
    pub fn key(self) -> &'static str {
        match self {
            Field::Host => "host",
            Field::User => "user",
            Field::SshKey => "ssh_key",
            Field::Domain => "domain",
            Field::InstallPath => "install_path",
            Field::Email => "email",
            Field::AppName => "app_name",
            Field::Workers => "gunicorn_workers",
            Field::WsgiModule => "wsgi_module",
            Field::UrlConf => "url_conf",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn spec(self) -> FieldSpec {
        match self {
            Field::Host => FieldSpec {
                field: self,
                prompt: "VPS hostname or IP",
                default: None,
                validate: |v| !v.trim().is_empty(),
                error: "Host cannot be empty",
            },
            Field::User => FieldSpec {
                field: self,
                prompt: "SSH user",
                default: Some("root"),
                validate: is_single_word,
                error: "User cannot be empty or contain whitespace",
            },
            Field::SshKey => FieldSpec {
                field: self,
                prompt: "SSH private key path",
                default: Some("~/.ssh/id_rsa"),
                validate: |v| expand_tilde(v).map(|p| p.is_file()).unwrap_or(false),
                error: "SSH key file does not exist",
            },
            Field::Domain => FieldSpec {
                field: self,
                prompt: "Domain name (e.g., blog.example.com)",
                default: None,
                validate: |v| v.contains('.') && is_single_word(v),
                error: "Invalid domain format",
            },
            Field::InstallPath => FieldSpec {
                field: self,
                prompt: "Installation path",
                default: Some("/var/www/mosaic"),
                validate: |v| v.starts_with('/') && is_single_word(v),
                error: "Must be an absolute path without whitespace",
            },
            Field::Email => FieldSpec {
                field: self,
                prompt: "Email for SSL certificate notifications",
                default: None,
                validate: is_email,
                error: "Invalid email format",
            },
            Field::AppName => FieldSpec {
                field: self,
                prompt: "Application name",
                default: Some("mosaic"),
                validate: is_app_name,
                error: "Use lowercase letters, digits, '-' or '_'",
            },
            Field::Workers => FieldSpec {
                field: self,
                prompt: "Number of Gunicorn workers",
                default: Some("2"),
                validate: |v| v.parse::<u32>().map(|n| n > 0).unwrap_or(false),
                error: "Must be a positive integer",
            },
            Field::WsgiModule => FieldSpec {
                field: self,
                prompt: "WSGI module",
                default: Some("website.wsgi:application"),
                validate: is_module_reference,
                error: "Must be in format \"module.path:application\"",
            },
            Field::UrlConf => FieldSpec {
                field: self,
                prompt: "URL configuration module",
                default: Some("website.urls"),
                validate: is_single_word,
                error: "Must be a valid Python module path",
            },
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Prompt text, default and validator for a field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub prompt: &'static str,
    pub default: Option<&'static str>,
    pub validate: fn(&str) -> bool,
    pub error: &'static str,
}

impl FieldSpec {
    pub fn prompt_text(&self) -> String {
        match self.default {
            Some(default) => format!("{} [{}]: ", self.prompt, default),
            None => format!("{}: ", self.prompt),
        }
    }

    /// Turn a raw answer into a field value. A blank answer takes the default.
    pub fn accept(&self, raw: &str) -> Result<String, &'static str> {
        let value = match (raw.trim(), self.default) {
            ("", Some(default)) => default,
            (value, _) => value,
        };

        if (self.validate)(value) {
            Ok(value.to_string())
        } else {
            Err(self.error)
        }
    }

    pub fn check(&self, value: &str) -> Result<(), &'static str> {
        if (self.validate)(value) {
            Ok(())
        } else {
            Err(self.error)
        }
    }
}

fn is_single_word(v: &str) -> bool {
    !v.is_empty() && !v.chars().any(char::is_whitespace)
}

fn is_email(v: &str) -> bool {
    match v.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && is_single_word(v)
        }
        None => false,
    }
}

fn is_app_name(v: &str) -> bool {
    !v.is_empty()
        && v
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn is_module_reference(v: &str) -> bool {
    match v.split_once(':') {
        Some((module, attr)) => {
            !module.trim().is_empty() && !attr.trim().is_empty() && is_single_word(v)
        }
        None => false,
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(Path::new(path).to_path_buf()),
    }
}

fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE")) // Windows fallback
        .map(PathBuf::from)
        .with_context(|| "Could not determine home directory")
}
