use crate::config::{DeployConfig, Field, FieldSpec};
use crate::error::{DeployError, DeployResult};
use crate::utils::Console;

/// Merge configuration sources and prompt for whatever is still missing.
///
/// Precedence is CLI overrides, then the saved file, then prompts. A value
/// from either of the first two that fails its validator is reported and
/// prompted for like a missing one.
pub fn resolve(
    persisted: &DeployConfig,
    overrides: &DeployConfig,
    required: &[Field],
    console: &Console,
) -> DeployResult<DeployConfig> {
    let mut config = persisted.clone();
    config.overlay(overrides);

    for &field in required {
        let spec = field.spec();

        if let Some(value) = config.get(field) {
            match spec.check(value) {
                Ok(()) => continue,
                Err(message) => {
                    console.error(format!("{} '{}' is invalid: {}", field, value, message))
                }
            }
        }

        let value = prompt_until_valid(&spec, console)?;
        config.set(field, value);
    }

    Ok(config)
}

/// Ask for `spec` until an answer validates. Runs out only when input does.
pub fn prompt_until_valid(spec: &FieldSpec, console: &Console) -> DeployResult<String> {
    let prompt = spec.prompt_text();

    loop {
        let answer = console.ask(&prompt)?.ok_or_else(|| DeployError::Validation {
            field: spec.field.key(),
            message: "no input available to prompt for it".to_string(),
        })?;

        match spec.accept(&answer) {
            Ok(value) => return Ok(value),
            Err(message) => console.error(format!("{}. Please try again.", message)),
        }
    }
}
