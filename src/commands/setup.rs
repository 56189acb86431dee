use crate::SetupArgs;
use crate::commands::{connect, exit_code, report_error};
use crate::config::{ConfigStore, Field, load_and_resolve};
use crate::pipeline::{Outcome, Pipeline, PipelineOptions};
use crate::session::{RemoteSession, SessionOptions};
use crate::templates::TemplateSet;
use crate::utils::{Console, Style};
use anyhow::{Context, Result};

/// Resolve the configuration, connect and run the setup pipeline
pub fn handle_setup(store: &ConfigStore, console: &Console, args: &SetupArgs) -> Result<i32> {
    console.header("=== Mosaic Deployment Helper ===");
    if args.dry_run {
        console.styled(Style::Warning, "🔍 Dry run mode: no commands will be executed");
    }

    let config = match load_and_resolve(store, &args.target.overrides(), &Field::ALL, console) {
        Ok(config) => config,
        Err(e) => {
            console.error(format!("Configuration error: {}", e));
            return Ok(exit_code(&e));
        }
    };

    let project_dir = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let mut options = if args.skip_firewall {
        PipelineOptions::minimal(project_dir)
    } else {
        PipelineOptions::full(project_dir)
    };
    if let Some(dir) = &args.templates {
        options = options.with_templates(TemplateSet::with_overrides(dir));
    }

    console.section("📡 Testing SSH connection...");
    let connection = match connect(&config, console) {
        Ok(connection) => connection,
        Err(e) => {
            console.error(format!("Failed: {}", e));
            return Ok(exit_code(&e));
        }
    };

    let user = config.user()?.to_string();
    let session = RemoteSession::new(connection, user, session_options(args), console.clone());
    let mut pipeline = Pipeline::new(session, config, options)?;

    let outcome = pipeline.run();
    report_outcome(console, &outcome);
    Ok(outcome.exit_code())
}

fn session_options(args: &SetupArgs) -> SessionOptions {
    SessionOptions {
        confirm: !args.auto,
        explain: args.explain,
        dry_run: args.dry_run,
        review_uploads: !args.no_review,
        echo: true,
    }
}

/// Final line of a setup run
pub fn report_outcome(console: &Console, outcome: &Outcome) {
    console.blank();
    match outcome {
        Outcome::Completed { url } => {
            console.styled(Style::Success, format!("✅ Deployment complete! Visit {}", url));
        }
        Outcome::Cancelled { stage } => {
            console.styled(
                Style::Warning,
                format!("⚠ Deployment cancelled by user during {}", stage.name()),
            );
        }
        Outcome::Failed { stage, error } => {
            console.styled(
                Style::Error,
                format!("✗ Deployment failed at {}: {}", stage.name(), error),
            );
            report_error(console, error);
        }
    }
}
