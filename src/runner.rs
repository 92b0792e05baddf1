//! Sequential pipeline execution.
//!
//! Steps run strictly in declaration order. A failing fatal step marks every
//! later step as skipped; a failing tolerated step is recorded and the run
//! continues. Step failures never surface as `Err`: they are outcomes folded
//! into the report's verdict.

use crate::error::Result;
use crate::host::{Container, HostKind};
use crate::outcome::{PipelineReport, StepOutcome, StepPolicy, StepStatus};
use crate::workflow::{StepAction, StepSpec, Workflow};
use camino::Utf8PathBuf;
use conversai_installer::executor::{CommandExecutor, failure_detail};
use conversai_installer::install_flow::{InstallRequest, ProgressOptions, install_project};
use conversai_installer::mode::InstallMode;
use conversai_installer::output::write_stderr_line;
use log::{info, warn};
use std::io::Write;
use std::process::Output;

/// Options for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Repository directory.
    pub repo: Utf8PathBuf,
    /// Where step commands run.
    pub host: HostKind,
    /// Verbosity; above zero, step output is echoed.
    pub verbosity: u8,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Runs a workflow against a repository.
pub struct PipelineRunner<'a> {
    host: &'a dyn CommandExecutor,
    workflow: &'a Workflow,
    options: &'a RunOptions,
}

impl<'a> PipelineRunner<'a> {
    /// Creates a runner; `host` executes commands on this machine.
    #[must_use]
    pub const fn new(
        host: &'a dyn CommandExecutor,
        workflow: &'a Workflow,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            host,
            workflow,
            options,
        }
    }

    /// Runs every step and returns the report.
    ///
    /// In container mode the container is removed before this returns,
    /// whatever the verdict.
    ///
    /// # Errors
    ///
    /// Returns an error only when the execution host cannot be prepared.
    pub fn run(&self, stderr: &mut dyn Write) -> Result<PipelineReport> {
        info!(
            "running workflow {} on {} host",
            self.workflow.name, self.options.host
        );
        let (host_label, outcomes) = match self.options.host {
            HostKind::Local => (
                HostKind::Local.to_string(),
                self.run_steps(self.host, stderr),
            ),
            HostKind::Container => {
                self.progress(stderr, format!("Starting container from {}...", self.workflow.image));
                let container = Container::start(self.host, &self.workflow.image, &self.options.repo)?;
                let label = format!("container {}", container.image());
                let outcomes = self.run_steps(&container, stderr);
                drop(container);
                (label, outcomes)
            }
        };

        let report = PipelineReport::new(&self.workflow.name, host_label, outcomes);
        Ok(report)
    }

    fn run_steps(&self, executor: &dyn CommandExecutor, stderr: &mut dyn Write) -> Vec<StepOutcome> {
        let total = self.workflow.steps.len();
        let mut halted = false;
        let mut outcomes = Vec::with_capacity(total);

        for (index, step) in self.workflow.steps.iter().enumerate() {
            let status = if halted {
                StepStatus::Skipped
            } else {
                self.progress(stderr, format!("==> [{}/{total}] {}", index + 1, step.name));
                self.run_step(step, executor, stderr)
            };

            if let StepStatus::Failed { detail, .. } = &status {
                match step.policy {
                    StepPolicy::Fatal => {
                        self.progress(stderr, format!("Step `{}` failed: {detail}", step.name));
                        halted = true;
                    }
                    StepPolicy::Tolerated => {
                        warn!("tolerated failure in step `{}`: {detail}", step.name);
                        self.progress(
                            stderr,
                            format!("Step `{}` failed (tolerated): {detail}", step.name),
                        );
                    }
                }
            }

            outcomes.push(StepOutcome {
                name: step.name.clone(),
                policy: step.policy,
                status,
            });
        }
        outcomes
    }

    fn run_step(
        &self,
        step: &StepSpec,
        executor: &dyn CommandExecutor,
        stderr: &mut dyn Write,
    ) -> StepStatus {
        match &step.action {
            StepAction::Checkout => self.checkout(),
            StepAction::Install { mode } => self.install(mode, executor, stderr),
            StepAction::Run { script } => {
                let result = executor.run("sh", &["-c", script]);
                if let Ok(output) = &result {
                    self.echo(stderr, output);
                }
                status_from_command(result)
            }
        }
    }

    fn checkout(&self) -> StepStatus {
        let repo = self.options.repo.as_str();
        let result = self
            .host
            .run("git", &["-C", repo, "rev-parse", "--is-inside-work-tree"]);
        match result {
            Ok(output)
                if output.status.success()
                    && String::from_utf8_lossy(&output.stdout).trim() == "true" =>
            {
                StepStatus::Passed
            }
            Ok(output) if output.status.success() => StepStatus::Failed {
                code: output.status.code(),
                detail: format!("{repo} is not a git work tree"),
            },
            other => status_from_command(other),
        }
    }

    fn install(
        &self,
        mode: &InstallMode,
        executor: &dyn CommandExecutor,
        stderr: &mut dyn Write,
    ) -> StepStatus {
        let request = InstallRequest {
            project: self.options.repo.clone(),
            mode: mode.clone(),
            progress: ProgressOptions {
                verbosity: self.options.verbosity,
                quiet: self.options.quiet,
            },
            ..InstallRequest::default()
        };
        match install_project(executor, &request, stderr) {
            Ok(report) => {
                self.progress(stderr, report.success_message());
                StepStatus::Passed
            }
            Err(err) => StepStatus::Failed {
                code: None,
                detail: err.to_string(),
            },
        }
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.options.quiet {
            write_stderr_line(stderr, message);
        }
    }

    fn echo(&self, stderr: &mut dyn Write, output: &Output) {
        if self.options.quiet || self.options.verbosity == 0 {
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

fn status_from_command(result: conversai_installer::error::Result<Output>) -> StepStatus {
    match result {
        Ok(output) if output.status.success() => StepStatus::Passed,
        Ok(output) => StepStatus::Failed {
            code: output.status.code(),
            detail: failure_detail(&output),
        },
        Err(err) => StepStatus::Failed {
            code: None,
            detail: err.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
