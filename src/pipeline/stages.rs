use super::{Pipeline, Stage, archive};
use crate::config::{Field, secret};
use crate::error::{DeployError, DeployResult};
use crate::layout::BACKUP_TIERS;
use crate::templates::Template;
use crate::tools::{RemoteCommand, apt, certbot, docker, files, nginx, systemctl, ufw};
use crate::utils::{CommandOutput, RemoteTransport};
use anyhow::Context;
use std::path::PathBuf;

const BASE_PACKAGES: [&str; 4] = ["docker.io", "nginx", "certbot", "python3-certbot-nginx"];

impl<T: RemoteTransport> Pipeline<T> {
    pub(super) fn run_stage(&mut self, stage: Stage) -> DeployResult<()> {
        match stage {
            Stage::Dependencies => self.install_dependencies(),
            Stage::Firewall => self.configure_firewall(),
            Stage::FileTransfer => self.transfer_files(),
            Stage::ImageBuild => self.build_image(),
            Stage::ConfigUpload => self.upload_configuration(),
            Stage::ServiceInstall => self.install_services(),
            Stage::ProxyConfig => self.configure_proxy(),
            Stage::Certificate => self.issue_certificate(),
            Stage::ServiceStart => self.start_services(),
        }
    }

    fn install_dependencies(&mut self) -> DeployResult<()> {
        let mut packages = BASE_PACKAGES.to_vec();
        if self.options.firewall {
            packages.push("ufw");
        }

        self.session.run_privileged(&apt::update())?;
        self.session.run_privileged(&apt::install(&packages))?;
        self.session.run_privileged(&systemctl::enable("docker"))?;
        self.session.run_privileged(&systemctl::start("docker"))?;

        self.console.success("Dependencies installed");
        Ok(())
    }

    fn configure_firewall(&mut self) -> DeployResult<()> {
        use ufw::{Direction, Policy};

        // SSH goes first so enabling the deny policy cannot lock us out
        self.session.run_privileged(&ufw::allow_tcp(22, "SSH"))?;
        self.session.run_privileged(&ufw::allow_tcp(80, "HTTP"))?;
        self.session.run_privileged(&ufw::allow_tcp(443, "HTTPS"))?;
        self.session
            .run_privileged(&ufw::default_policy(Policy::Deny, Direction::Incoming))?;
        self.session
            .run_privileged(&ufw::default_policy(Policy::Allow, Direction::Outgoing))?;
        self.session.run_privileged(&ufw::enable())?;

        self.console.success("Firewall configured");
        Ok(())
    }

    fn transfer_files(&mut self) -> DeployResult<()> {
        let build_dir = self.layout.build_dir();
        let user = self.session.user().to_string();

        self.session.run_privileged(
            &files::mkdir_p(&build_dir).describe("Creating build directory on VPS"),
        )?;
        self.session.run_privileged(&files::chown_recursive(&user, &build_dir))?;

        for template in [Template::Dockerfile, Template::DockerIgnore, Template::Entrypoint] {
            let name = template.file_name();
            let local = self.render_to_scratch(template, name)?;
            self.session.transfer_file(
                &local,
                &format!("{}/{}", build_dir, name),
                &format!("Uploading {}", name),
            )?;
        }

        self.console.line("  Creating project archive...");
        let local_archive = self
            .scratch
            .path()
            .join(format!("{}-project.tar.gz", self.layout.app_name));
        let count = archive::build(&self.options.project_dir, &local_archive)?;
        tracing::info!(files = count, project = %self.options.project_dir.display(), "archived project");

        let remote_archive = self.layout.remote_archive();
        self.session
            .transfer_file(&local_archive, &remote_archive, "Uploading project archive")?;
        self.session
            .run(&files::extract_archive(&remote_archive, &build_dir))?;
        self.session.run(&files::remove(&remote_archive))?;

        self.console.success("Project files transferred");
        Ok(())
    }

    fn build_image(&mut self) -> DeployResult<()> {
        let build = docker::build(&self.layout.image_tag(), &self.layout.build_dir());
        let output = self.session.run_privileged(&build)?;
        self.ensure_success(&build, output, "Docker build failed")?;

        self.console.success("Docker image built on VPS");
        Ok(())
    }

    fn upload_configuration(&mut self) -> DeployResult<()> {
        let install_path = self.layout.install_path.clone();
        let user = self.session.user().to_string();

        self.session.run_privileged(
            &files::mkdir_p(&install_path).describe("Creating installation directory"),
        )?;
        self.session
            .run_privileged(&files::mkdir_p(&self.layout.media_dir()))?;
        self.session
            .run_privileged(&files::mkdir_p(&self.layout.static_dir()))?;
        for tier in BACKUP_TIERS {
            self.session
                .run_privileged(&files::mkdir_p(&self.layout.backup_tier_dir(tier)))?;
        }
        self.session
            .run_privileged(&files::chown_recursive(&user, &install_path))?;

        // The database is bind-mounted into the container, so it has to exist
        self.session.run(&files::touch(&self.layout.database()))?;

        let env_file = self.layout.env_file();
        self.reuse_existing_secret(&env_file)?;

        let local = self.render_to_scratch(Template::EnvFile, ".env")?;
        self.session
            .transfer_file(&local, &env_file, "Uploading .env configuration")?;
        self.session.run(&files::chmod("600", &env_file))?;

        let backup_script = self.layout.backup_script();
        let local = self.render_to_scratch(Template::BackupScript, "backup.sh")?;
        self.session
            .transfer_file(&local, &backup_script, "Uploading backup script")?;
        self.session.run(
            &files::chmod("+x", &backup_script).describe("Making backup script executable"),
        )?;

        self.console.success("Configuration files uploaded");
        Ok(())
    }

    /// Keep the secret of an earlier deployment so sessions survive reruns
    fn reuse_existing_secret(&mut self, env_file: &str) -> DeployResult<()> {
        let Some(output) = self.session.run(&files::secret_key_line(env_file))? else {
            return Ok(());
        };
        if !output.ok() {
            return Ok(());
        }

        if let Some(existing) = secret::extract_from_env(&output.stdout) {
            self.session.mask_secret(existing.as_str());
            self.config.set_secret_key(existing);
            self.console.info("Reusing existing SECRET_KEY");
        }
        Ok(())
    }

    fn install_services(&mut self) -> DeployResult<()> {
        let units = [
            (Template::AppService, self.layout.app_unit()),
            (Template::BackupService, self.layout.backup_unit()),
            (Template::BackupTimer, self.layout.backup_timer()),
        ];

        for (template, unit) in units {
            let local = self.render_to_scratch(template, &unit)?;
            let staged = format!("/tmp/{}", unit);
            self.session
                .transfer_file(&local, &staged, &format!("Uploading {}", unit))?;
            self.session.run_privileged(&files::move_into_place(
                &staged,
                &self.layout.unit_path(&unit),
            ))?;
        }
        self.session.run_privileged(&systemctl::daemon_reload())?;

        self.console.success("Systemd services created");
        Ok(())
    }

    fn configure_proxy(&mut self) -> DeployResult<()> {
        let site = self.layout.app_name.clone();
        let available = self.layout.nginx_available();
        let staged = format!("/tmp/{}", site);

        let local = self.render_to_scratch(Template::NginxSite, &site)?;
        self.session
            .transfer_file(&local, &staged, "Uploading nginx configuration")?;
        self.session
            .run_privileged(&files::move_into_place(&staged, &available))?;
        self.session.run_privileged(
            &files::symlink(&available, &self.layout.nginx_enabled())
                .describe("Enabling nginx site"),
        )?;

        let test = nginx::test_config();
        let output = self.session.run_privileged(&test)?;
        self.ensure_success(&test, output, "Nginx configuration is invalid")?;

        self.session.run_privileged(&systemctl::reload("nginx"))?;

        self.console.success("Nginx configured and reloaded");
        Ok(())
    }

    fn issue_certificate(&mut self) -> DeployResult<()> {
        let domain = self.config.domain()?.to_string();
        let email = self.config.require(Field::Email)?.to_string();

        let output = self.session.run_privileged(&certbot::issue(&domain, &email))?;
        if let Some(output) = output {
            if !output.ok() {
                return Err(DeployError::stage(
                    "SSL setup failed (you may need to configure DNS first)",
                ));
            }
        }

        self.console.success("SSL certificate obtained");
        Ok(())
    }

    fn start_services(&mut self) -> DeployResult<()> {
        let app = self.layout.app_unit();
        let timer = self.layout.backup_timer();

        self.session.run_privileged(&systemctl::enable(&app))?;
        self.session.run_privileged(&systemctl::restart(&app))?;
        self.session.run_privileged(&systemctl::enable(&timer))?;
        self.session.run_privileged(&systemctl::restart(&timer))?;
        self.session.run_privileged(&systemctl::reload("nginx"))?;

        self.console.success("Services started");
        Ok(())
    }

    fn render_to_scratch(&self, template: Template, name: &str) -> DeployResult<PathBuf> {
        let content = self.options.templates.render(template, &self.config)?;
        let path = self.scratch.path().join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to stage {}", path.display()))?;
        Ok(path)
    }

    /// Turn a non-zero exit of a command run with `allow_failure` into a
    /// stage failure. Dry runs (`None`) always pass.
    fn ensure_success(
        &self,
        command: &RemoteCommand,
        output: Option<CommandOutput>,
        reason: &str,
    ) -> DeployResult<()> {
        match output {
            Some(output) if !output.ok() => {
                self.console.error(reason);
                Err(DeployError::CommandFailed {
                    command: command.line().to_string(),
                    description: command
                        .description()
                        .filter(|_| self.session.options().explain)
                        .map(str::to_string),
                    status: output.status,
                    output: output.combined(),
                })
            }
            _ => Ok(()),
        }
    }
}
