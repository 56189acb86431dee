use super::*;
use crate::config::Field;
use crate::session::SessionOptions;
use crate::testing::FakeTransport;
use crate::utils::CommandOutput;

const DOMAIN: &str = "blog.example.com";

fn config() -> DeployConfig {
    DeployConfig::new()
        .with(Field::Host, Some("203.0.113.7"))
        .with(Field::User, Some("root"))
        .with(Field::SshKey, Some("~/.ssh/id_ed25519"))
        .with(Field::Domain, Some(DOMAIN))
        .with(Field::InstallPath, Some("/var/www/mosaic"))
        .with(Field::Email, Some("me@example.com"))
        .with(Field::AppName, Some("mosaic"))
        .with(Field::Workers, Some("2"))
        .with(Field::WsgiModule, Some("website.wsgi:application"))
        .with(Field::UrlConf, Some("website.urls"))
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("manage.py"), "import django\n").unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    dir
}

fn auto() -> SessionOptions {
    SessionOptions {
        confirm: false,
        ..SessionOptions::default()
    }
}

struct Run {
    outcome: Outcome,
    history: Vec<PipelineState>,
    pipeline: Pipeline<FakeTransport>,
}

fn run(fake: &FakeTransport, console: &Console, options: SessionOptions, firewall: bool) -> Run {
    let project = project();
    let session = RemoteSession::new(fake.clone(), "root", options, console.clone());
    let mut pipeline_options = PipelineOptions::full(project.path());
    pipeline_options.firewall = firewall;

    let mut pipeline = Pipeline::new(session, config(), pipeline_options).unwrap();
    let outcome = pipeline.run();
    Run {
        outcome,
        history: pipeline.history().to_vec(),
        pipeline,
    }
}

fn index_of(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no line contains {needle:?}"))
}

#[test]
fn test_fresh_host_runs_every_stage_in_order() {
    let fake = FakeTransport::new();
    let console = Console::captured();

    let result = run(&fake, &console, auto(), true);

    match &result.outcome {
        Outcome::Completed { url } => assert_eq!(url, "https://blog.example.com"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(result.outcome.exit_code(), 0);

    let mut expected = vec![PipelineState::Idle];
    expected.extend(Stage::ALL.into_iter().map(PipelineState::Running));
    expected.push(PipelineState::Completed);
    assert_eq!(result.history, expected);

    let lines = console.lines();
    let titles: Vec<usize> = Stage::ALL
        .iter()
        .map(|stage| index_of(&lines, stage.title()))
        .collect();
    assert!(titles.windows(2).all(|w| w[0] < w[1]));
    assert!(lines.contains(&"  ✓ Services started".to_string()));

    assert_eq!(fake.closes(), 1);
    assert!(result.pipeline.session.is_closed());
}

#[test]
fn test_uploads_land_in_expected_places() {
    let fake = FakeTransport::new();
    run(&fake, &Console::captured(), auto(), true);

    let uploads = fake.upload_paths();
    for path in [
        "/var/www/mosaic/build/Dockerfile",
        "/var/www/mosaic/build/.dockerignore",
        "/var/www/mosaic/build/docker-entrypoint.sh",
        "/tmp/mosaic-project.tar.gz",
        "/var/www/mosaic/.env",
        "/var/www/mosaic/backup.sh",
        "/tmp/mosaic-app.service",
        "/tmp/mosaic-backup.service",
        "/tmp/mosaic-backup.timer",
        "/tmp/mosaic",
    ] {
        assert!(uploads.iter().any(|u| u == path), "missing upload {path}");
    }

    let env = fake.upload_text("/var/www/mosaic/.env").unwrap();
    assert!(env.contains("ALLOWED_HOSTS=blog.example.com"));
    assert!(!env.contains("{{"));

    assert!(fake.ran("mv /tmp/mosaic-app.service /etc/systemd/system/mosaic-app.service"));
    assert!(fake.ran("ln -sf /etc/nginx/sites-available/mosaic /etc/nginx/sites-enabled/mosaic"));
    assert!(fake.ran("tar xzf /tmp/mosaic-project.tar.gz -C /var/www/mosaic/build"));
    assert!(fake.ran("rm -f /tmp/mosaic-project.tar.gz"));
    assert!(fake.ran("chmod 600 /var/www/mosaic/.env"));
}

#[test]
fn test_certificate_failure_only_warns() {
    let fake = FakeTransport::new();
    fake.respond("certbot --nginx", CommandOutput::failure(1, "DNS problem: NXDOMAIN"));
    let console = Console::captured();

    let result = run(&fake, &console, auto(), true);

    assert!(matches!(result.outcome, Outcome::Completed { .. }));
    assert!(console
        .lines()
        .contains(&"  ⚠ SSL setup failed (you may need to configure DNS first)".to_string()));

    let certbot = fake.position("certbot --nginx").unwrap();
    let restart = fake.position("systemctl restart mosaic-app.service").unwrap();
    assert!(certbot < restart);
    assert_eq!(result.pipeline.state(), PipelineState::Completed);
}

#[test]
fn test_declining_mid_pipeline_cancels_and_closes_once() {
    let fake = FakeTransport::new();
    // Dependencies (4), firewall (6) and file transfer (8) are accepted
    let mut answers = vec!["y"; 18];
    answers.push("n");
    let console = Console::scripted(answers);

    let result = run(&fake, &console, SessionOptions::default(), true);

    assert!(matches!(
        result.outcome,
        Outcome::Cancelled {
            stage: Stage::ImageBuild
        }
    ));
    assert_eq!(result.outcome.exit_code(), 130);
    assert!(!fake.ran("docker build"));
    assert_eq!(result.pipeline.state(), PipelineState::Cancelled);
    assert_eq!(fake.closes(), 1);

    drop(result);
    assert_eq!(fake.closes(), 1);
}

#[test]
fn test_ssh_is_allowed_before_default_deny() {
    let fake = FakeTransport::new();
    run(&fake, &Console::captured(), auto(), true);

    let allow_ssh = fake.position("ufw allow 22/tcp").unwrap();
    let deny = fake.position("ufw default deny incoming").unwrap();
    let enable = fake.position("ufw --force enable").unwrap();
    assert!(allow_ssh < deny);
    assert!(deny < enable);
}

#[test]
fn test_invalid_proxy_config_stops_the_run() {
    let fake = FakeTransport::new();
    fake.respond("nginx -t", CommandOutput::failure(1, "nginx: [emerg] unexpected \"}\""));
    let console = Console::captured();

    let result = run(&fake, &console, auto(), true);

    match &result.outcome {
        Outcome::Failed { stage, error } => {
            assert_eq!(*stage, Stage::ProxyConfig);
            assert!(matches!(error, DeployError::CommandFailed { status: 1, .. }));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(console
        .lines()
        .contains(&"  ✗ Nginx configuration is invalid".to_string()));
    assert!(!fake.ran("certbot --nginx"));
    assert!(!fake.ran("systemctl restart"));
    assert_eq!(result.pipeline.state(), PipelineState::Failed(Stage::ProxyConfig));
    assert_eq!(fake.closes(), 1);
}

#[test]
fn test_failed_build_skips_later_stages() {
    let fake = FakeTransport::new();
    fake.respond("docker build", CommandOutput::failure(1, "no space left on device"));

    let result = run(&fake, &Console::captured(), auto(), true);

    assert!(matches!(
        result.outcome,
        Outcome::Failed {
            stage: Stage::ImageBuild,
            ..
        }
    ));
    assert_eq!(result.outcome.exit_code(), 1);
    assert!(!fake.ran("mkdir -p /var/www/mosaic/media"));
    assert!(!fake.upload_paths().iter().any(|p| p.ends_with(".env")));
}

#[test]
fn test_dry_run_logs_same_intentions_without_remote_calls() {
    let intentions = |lines: Vec<String>| -> Vec<String> {
        lines
            .into_iter()
            .filter_map(|l| {
                if l.starts_with("  $ ") {
                    Some(l)
                } else {
                    l.split(" → ").nth(1).map(|remote| format!("upload {remote}"))
                }
            })
            .collect()
    };

    let live_fake = FakeTransport::new();
    let live_console = Console::captured();
    run(&live_fake, &live_console, auto(), true);

    let dry_fake = FakeTransport::new();
    let dry_console = Console::captured();
    let dry = run(
        &dry_fake,
        &dry_console,
        SessionOptions {
            dry_run: true,
            ..auto()
        },
        true,
    );

    assert!(matches!(dry.outcome, Outcome::Completed { .. }));
    assert!(dry_fake.commands().is_empty());
    assert!(dry_fake.upload_paths().is_empty());

    let live = intentions(live_console.lines());
    assert!(!live.is_empty());
    assert_eq!(intentions(dry_console.lines()), live);
}

#[test]
fn test_existing_secret_is_reused_and_masked() {
    let fake = FakeTransport::new();
    fake.respond(
        "grep '^SECRET_KEY='",
        CommandOutput::success("SECRET_KEY=\"kept-secret-value\"\n"),
    );
    let console = Console::captured();

    let result = run(&fake, &console, auto(), true);

    assert_eq!(result.pipeline.config().secret_key(), Some("kept-secret-value"));
    let env = fake.upload_text("/var/www/mosaic/.env").unwrap();
    assert!(env.contains("SECRET_KEY=kept-secret-value"));

    let lines = console.lines();
    assert!(lines.contains(&"  ℹ Reusing existing SECRET_KEY".to_string()));
    assert!(!lines.iter().any(|l| l.contains("kept-secret-value")));

    let lookup = fake.position("grep '^SECRET_KEY='").unwrap();
    let dirs = fake.position("mkdir -p /var/www/mosaic/backups/monthly").unwrap();
    assert!(dirs < lookup);
}

#[test]
fn test_generated_secret_never_echoed() {
    let fake = FakeTransport::new();
    let console = Console::captured();
    let result = run(&fake, &console, auto(), true);

    let secret = result.pipeline.config().secret_key().unwrap().to_string();
    assert_eq!(secret.len(), 50);
    assert!(fake.upload_text("/var/www/mosaic/.env").unwrap().contains(&secret));
    assert!(!console.lines().iter().any(|l| l.contains(&secret)));
}

#[test]
fn test_minimal_pipeline_never_touches_firewall() {
    let fake = FakeTransport::new();
    let result = run(&fake, &Console::captured(), auto(), false);

    assert!(matches!(result.outcome, Outcome::Completed { .. }));
    assert!(!fake.ran("ufw"));
    assert!(fake.ran("apt-get install -y docker.io nginx certbot python3-certbot-nginx"));
    assert!(!result.history.contains(&PipelineState::Running(Stage::Firewall)));
}
