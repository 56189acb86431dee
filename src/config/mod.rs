use crate::error::{DeployError, DeployResult};
use crate::utils::Console;
use std::collections::BTreeMap;

pub mod fields;
pub mod resolver;
pub mod secret;
pub mod store;

pub use fields::{Field, FieldSpec, expand_tilde};
pub use resolver::resolve;
pub use store::ConfigStore;

/// Deployment configuration: named field values plus the session-only secret.
///
/// `values` never holds the secret, so anything persisted from it is safe
/// to write to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployConfig {
    values: BTreeMap<Field, String>,
    secret_key: Option<String>,
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Builder-style `set`, skipping `None`
    pub fn with(mut self, field: Field, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    pub fn require(&self, field: Field) -> DeployResult<&str> {
        self.get(field).ok_or(DeployError::Validation {
            field: field.key(),
            message: "value is missing".to_string(),
        })
    }

    /// Copy every value from `other` over this configuration
    pub fn overlay(&mut self, other: &DeployConfig) {
        for (field, value) in &other.values {
            self.values.insert(*field, value.clone());
        }
    }

    /// Non-secret values, as written to the config file
    pub fn persistent(&self) -> &BTreeMap<Field, String> {
        &self.values
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn set_secret_key(&mut self, key: impl Into<String>) {
        self.secret_key = Some(key.into());
    }

    pub fn host(&self) -> DeployResult<&str> {
        self.require(Field::Host)
    }

    pub fn user(&self) -> DeployResult<&str> {
        self.require(Field::User)
    }

    pub fn domain(&self) -> DeployResult<&str> {
        self.require(Field::Domain)
    }

    pub fn app_name(&self) -> DeployResult<&str> {
        self.require(Field::AppName)
    }

    pub fn install_path(&self) -> DeployResult<&str> {
        self.require(Field::InstallPath)
    }
}

/// Load the saved configuration, merge `overrides` over it, prompt for the
/// gaps and write the non-secret result back when it changed.
pub fn load_and_resolve(
    store: &ConfigStore,
    overrides: &DeployConfig,
    required: &[Field],
    console: &Console,
) -> DeployResult<DeployConfig> {
    let persisted = match store.load() {
        Ok(config) => config,
        Err(e) => {
            console.warning(format!("Ignoring saved configuration: {:#}", e));
            DeployConfig::new()
        }
    };

    let config = resolve(&persisted, overrides, required, console)?;

    if config.persistent() != persisted.persistent() {
        console.section("💾 Saving configuration...");
        match store.save(&config) {
            Ok(()) => console.success(format!(
                "Configuration saved to {}",
                store.path().display()
            )),
            Err(e) => console.warning(format!("Failed to save configuration: {:#}", e)),
        }
    }

    Ok(config)
}
