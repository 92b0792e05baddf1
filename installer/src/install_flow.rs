//! The installation procedure.
//!
//! The procedure is a fixed, fail-fast sequence of steps chosen by the install
//! mode. Each step either succeeds or aborts the whole run; nothing is retried
//! and no partial result is reported.

use crate::artefact::locate_wheel;
use crate::commands::Toolset;
use crate::config::{ConfigOverrides, InstallerConfig, resolve_from_env};
use crate::error::{InstallerError, Result};
use crate::executor::CommandExecutor;
use crate::mode::InstallMode;
use crate::output::{InstallReport, write_stderr_line};
use crate::project::{ProjectDescriptor, inspect_project};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::io::Write;
use std::process::Output;

/// One step of the installation procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    /// Recreate the isolated virtual environment.
    CreateVenv,
    /// Upgrade the packaging tool itself.
    UpgradePip,
    /// Install the project in editable mode with extras.
    EditableInstall,
    /// Remove any previous build output directory.
    CleanBuildOutput,
    /// Install or upgrade the build frontend.
    EnsureBuildFrontend,
    /// Build a wheel without build isolation.
    BuildWheel,
    /// Install the single built wheel with extras.
    InstallWheel,
}

/// Returns the ordered steps for `mode`.
///
/// # Examples
///
/// ```
/// use conversai_installer::install_flow::{InstallStep, plan_steps};
/// use conversai_installer::mode::InstallMode;
///
/// assert_eq!(
///     plan_steps(&InstallMode::Dev, false),
///     vec![InstallStep::UpgradePip, InstallStep::EditableInstall]
/// );
/// ```
#[must_use]
pub fn plan_steps(mode: &InstallMode, isolated: bool) -> Vec<InstallStep> {
    let mut steps = Vec::with_capacity(6);
    if isolated {
        steps.push(InstallStep::CreateVenv);
    }
    steps.push(InstallStep::UpgradePip);
    if mode.is_editable() {
        steps.push(InstallStep::EditableInstall);
    } else {
        steps.extend([
            InstallStep::CleanBuildOutput,
            InstallStep::EnsureBuildFrontend,
            InstallStep::BuildWheel,
            InstallStep::InstallWheel,
        ]);
    }
    steps
}

/// Options that shape progress output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressOptions {
    /// Verbosity forwarded to pip; above zero, captured tool output is echoed.
    pub verbosity: u8,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Runs the installation procedure.
pub struct Installer<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a InstallerConfig,
    descriptor: &'a ProjectDescriptor,
    tools: Toolset,
    progress: ProgressOptions,
}

impl<'a> Installer<'a> {
    /// Creates an installer for an inspected project.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        config: &'a InstallerConfig,
        descriptor: &'a ProjectDescriptor,
        progress: ProgressOptions,
    ) -> Self {
        Self {
            executor,
            config,
            descriptor,
            tools: Toolset::from_config(config, progress.verbosity),
            progress,
        }
    }

    /// Returns the toolset in effect.
    #[must_use]
    pub const fn tools(&self) -> &Toolset {
        &self.tools
    }

    /// Describes each planned step without running anything.
    ///
    /// The wheel filename is unknown before the build, so the install step is
    /// rendered with a placeholder.
    #[must_use]
    pub fn describe(&self, mode: &InstallMode) -> Vec<String> {
        plan_steps(mode, self.config.venv.is_some())
            .into_iter()
            .map(|step| self.describe_step(step))
            .collect()
    }

    fn describe_step(&self, step: InstallStep) -> String {
        let dist = self.config.dist_path();
        match step {
            InstallStep::CreateVenv => self
                .config
                .venv
                .as_deref()
                .map(|venv| self.tools.create_venv(venv).to_string())
                .unwrap_or_default(),
            InstallStep::UpgradePip => self.tools.upgrade_pip().to_string(),
            InstallStep::EditableInstall => self
                .tools
                .editable_install(&self.editable_requirement())
                .to_string(),
            InstallStep::CleanBuildOutput => format!("remove {dist}"),
            InstallStep::EnsureBuildFrontend => self.tools.ensure_build_frontend().to_string(),
            InstallStep::BuildWheel => self
                .tools
                .build_wheel(&self.config.project_dir, &dist)
                .to_string(),
            InstallStep::InstallWheel => self
                .tools
                .wheel_install(&self.config.extras.requirement(&format!("{dist}/<wheel>")))
                .to_string(),
        }
    }

    /// Runs every step for `mode`, stopping at the first failure.
    ///
    /// The final confirmation is left to the caller, which decides between
    /// [`InstallReport::success_message`] and a JSON report.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub fn run(&self, mode: &InstallMode, stderr: &mut dyn Write) -> Result<InstallReport> {
        self.check_extras();

        if let Some(venv) = &self.config.venv {
            self.progress_line(stderr, format!("Creating virtual environment at {venv}..."));
            let cmd = self.tools.create_venv(venv);
            let output = cmd.run(self.executor, |message| InstallerError::EnvironmentCreation {
                path: venv.clone(),
                message,
            })?;
            self.echo(stderr, &output);
        }

        self.progress_line(stderr, format!("Upgrading {}...", self.tools.pip()));
        let output = self
            .tools
            .upgrade_pip()
            .run(self.executor, |message| InstallerError::ToolUpgrade {
                tool: "pip".to_owned(),
                message,
            })?;
        self.echo(stderr, &output);

        let report = if mode.is_editable() {
            self.install_editable(mode, stderr)?
        } else {
            self.install_wheel(mode, stderr)?
        };
        Ok(report)
    }

    fn install_editable(&self, mode: &InstallMode, stderr: &mut dyn Write) -> Result<InstallReport> {
        let requirement = self.editable_requirement();
        self.progress_line(
            stderr,
            format!("Installing {} in editable mode...", self.descriptor.display_name()),
        );
        let output = self
            .tools
            .editable_install(&requirement)
            .run(self.executor, |message| InstallerError::InstallFailed {
                target: requirement.clone(),
                message,
            })?;
        self.echo(stderr, &output);

        Ok(self.report(mode, requirement, None, self.descriptor.version()))
    }

    fn install_wheel(&self, mode: &InstallMode, stderr: &mut dyn Write) -> Result<InstallReport> {
        let dist = self.config.dist_path();

        self.progress_line(stderr, format!("Removing previous build output {dist}..."));
        remove_build_output(&dist)?;

        self.progress_line(stderr, "Ensuring the build frontend is installed...");
        let output = self
            .tools
            .ensure_build_frontend()
            .run(self.executor, |message| InstallerError::BuildFrontend { message })?;
        self.echo(stderr, &output);

        self.progress_line(
            stderr,
            format!("Building wheel for {} ({mode})...", self.descriptor.display_name()),
        );
        let output = self
            .tools
            .build_wheel(&self.config.project_dir, &dist)
            .run(self.executor, |message| InstallerError::BuildFailed {
                project: self.config.project_dir.clone(),
                message,
            })?;
        self.echo(stderr, &output);

        let wheel = locate_wheel(&dist)?;
        let requirement = self.config.extras.requirement(wheel.path.as_str());
        self.progress_line(stderr, format!("Installing {}...", wheel.path));
        let output = self
            .tools
            .wheel_install(&requirement)
            .run(self.executor, |message| InstallerError::InstallFailed {
                target: requirement.clone(),
                message,
            })?;
        self.echo(stderr, &output);

        let version = wheel.name.version().to_owned();
        let mut report = self.report(mode, requirement, Some(wheel.path), Some(&version));
        if report.package.is_none() {
            report.package = Some(wheel.name.distribution().to_owned());
        }
        Ok(report)
    }

    fn report(
        &self,
        mode: &InstallMode,
        target: String,
        wheel: Option<camino::Utf8PathBuf>,
        version: Option<&str>,
    ) -> InstallReport {
        InstallReport {
            mode: mode.clone(),
            descriptor: self.descriptor.kind(),
            package: self.descriptor.name().map(str::to_owned),
            version: version.map(str::to_owned),
            extras: self.config.extras.clone(),
            target,
            wheel,
            venv: self.config.venv.clone(),
        }
    }

    fn editable_requirement(&self) -> String {
        self.config
            .extras
            .requirement(self.config.project_dir.as_str())
    }

    fn check_extras(&self) {
        if self.descriptor.declares_extras(&self.config.extras) == Some(false) {
            warn!(
                "{} does not declare the `{}` extras group; pip will install the base package only",
                self.descriptor.root(),
                self.config.extras
            );
        }
    }

    fn progress_line(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.progress.quiet {
            write_stderr_line(stderr, message);
        }
    }

    fn echo(&self, stderr: &mut dyn Write, output: &Output) {
        if self.progress.quiet || self.progress.verbosity == 0 {
            return;
        }
        for stream in [&output.stdout, &output.stderr] {
            let text = String::from_utf8_lossy(stream);
            let trimmed = text.trim_end();
            if !trimmed.is_empty() {
                write_stderr_line(stderr, trimmed);
            }
        }
    }
}

/// One installation request, as issued by the CLI or a pipeline step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Project directory.
    pub project: Utf8PathBuf,
    /// Install mode.
    pub mode: InstallMode,
    /// Values that take precedence over environment and project settings.
    pub overrides: ConfigOverrides,
    /// Progress output options.
    pub progress: ProgressOptions,
}

/// An inspected project together with its resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInstall {
    /// What the project directory declares.
    pub descriptor: ProjectDescriptor,
    /// Settings resolved from every configuration layer.
    pub config: InstallerConfig,
}

impl PreparedInstall {
    /// Creates an installer for this project.
    #[must_use]
    pub fn installer<'a>(
        &'a self,
        executor: &'a dyn CommandExecutor,
        progress: ProgressOptions,
    ) -> Installer<'a> {
        Installer::new(executor, &self.config, &self.descriptor, progress)
    }
}

/// Inspects `project` and resolves its configuration against the process
/// environment.
///
/// Nothing is executed and no file is touched.
///
/// # Errors
///
/// Returns an error when the project has no descriptor, the manifest is
/// malformed, or a resolved setting is invalid.
pub fn prepare_install(project: &Utf8Path, overrides: &ConfigOverrides) -> Result<PreparedInstall> {
    let descriptor = inspect_project(project)?;
    let config = resolve_from_env(project, overrides, descriptor.settings())?;
    Ok(PreparedInstall { descriptor, config })
}

/// Inspects the project, resolves configuration and runs the procedure.
///
/// # Errors
///
/// Returns an error when the project cannot be inspected, the configuration
/// is invalid, or any installation step fails.
pub fn install_project(
    executor: &dyn CommandExecutor,
    request: &InstallRequest,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let prepared = prepare_install(&request.project, &request.overrides)?;
    prepared
        .installer(executor, request.progress)
        .run(&request.mode, stderr)
}

/// Removes the build output directory; a missing directory is not an error.
///
/// # Errors
///
/// Returns [`InstallerError::CleanFailed`] when the directory exists but
/// cannot be removed.
pub fn remove_build_output(dist: &Utf8Path) -> Result<()> {
    match std::fs::remove_dir_all(dist) {
        Ok(()) => {
            debug!("removed {dist}");
            Ok(())
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InstallerError::CleanFailed {
            path: dist.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
#[path = "install_flow_tests.rs"]
mod tests;
