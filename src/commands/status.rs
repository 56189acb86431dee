use crate::TargetArgs;
use crate::commands::{connect, exit_code};
use crate::config::{ConfigStore, Field, load_and_resolve};
use crate::session::{RemoteSession, SessionOptions};
use crate::status::inspect;
use crate::utils::Console;
use anyhow::Result;

/// Connect read-only, run every probe and print the report
pub fn handle_status(store: &ConfigStore, console: &Console, target: &TargetArgs) -> Result<i32> {
    console.header("=== Deployment Status ===");

    let config = match load_and_resolve(store, &target.overrides(), &Field::STATUS, console) {
        Ok(config) => config,
        Err(e) => {
            console.error(format!("Configuration error: {}", e));
            return Ok(exit_code(&e));
        }
    };

    console.section("📡 Connecting...");
    let connection = match connect(&config, console) {
        Ok(connection) => connection,
        Err(e) => {
            console.error(format!("Failed to check status: {}", e));
            return Ok(exit_code(&e));
        }
    };

    let user = config.user()?.to_string();
    let session = RemoteSession::new(connection, user, SessionOptions::read_only(), console.clone());
    let report = inspect(session, &config)?;
    report.render(console);
    Ok(0)
}
