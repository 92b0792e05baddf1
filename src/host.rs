//! Execution hosts for pipeline steps.
//!
//! Steps either run directly on the machine invoking the runner or inside a
//! container started from the workflow's pinned image. The container mounts
//! the repository at the same absolute path it has on the host, so paths
//! computed on the host stay valid inside the container.

use crate::error::{PipelineError, Result};
use crate::image::ImageRef;
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use conversai_installer::error::Result as CommandResult;
use conversai_installer::executor::{CommandExecutor, failure_detail};
use log::{debug, warn};
use std::fmt;
use std::process::Output;

/// Program used to manage containers.
pub const DOCKER: &str = "docker";

/// Where step commands run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HostKind {
    /// Directly on this machine, inside the repository directory.
    #[default]
    Local,
    /// Inside a container started from the workflow image.
    Container,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Container => "container",
        })
    }
}

/// A running container that owns its lifetime.
///
/// Dropping the value removes the container with `docker rm -f`. Removal is
/// best-effort: a failure is logged and never masks the pipeline result.
pub struct Container<'a> {
    docker: &'a dyn CommandExecutor,
    id: String,
    image: String,
    workdir: Utf8PathBuf,
}

impl<'a> Container<'a> {
    /// Starts a detached container with `repo` bind-mounted at the same path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Container`] when docker cannot be run, exits
    /// unsuccessfully or prints no container id.
    pub fn start(docker: &'a dyn CommandExecutor, image: &ImageRef, repo: &Utf8Path) -> Result<Self> {
        let image_name = image.to_string();
        let mount = format!("{repo}:{repo}");
        let container_error = |message: String| PipelineError::Container {
            image: image_name.clone(),
            message,
        };

        let output = docker
            .run(
                DOCKER,
                &[
                    "run",
                    "-d",
                    "-v",
                    &mount,
                    "-w",
                    repo.as_str(),
                    &image_name,
                    "sleep",
                    "infinity",
                ],
            )
            .map_err(|err| container_error(err.to_string()))?;
        if !output.status.success() {
            return Err(container_error(failure_detail(&output)));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if id.is_empty() {
            return Err(container_error("docker printed no container id".to_owned()));
        }
        debug!("started container {id} from {image_name}");

        Ok(Self {
            docker,
            id,
            image: image_name,
            workdir: repo.to_owned(),
        })
    }

    /// Returns the container id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the image the container was started from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }
}

impl CommandExecutor for Container<'_> {
    fn run(&self, cmd: &str, args: &[&str]) -> CommandResult<Output> {
        let mut exec_args = vec!["exec", "-w", self.workdir.as_str(), self.id.as_str(), cmd];
        exec_args.extend_from_slice(args);
        self.docker.run(DOCKER, &exec_args)
    }
}

impl Drop for Container<'_> {
    fn drop(&mut self) {
        match self.docker.run(DOCKER, &["rm", "-f", &self.id]) {
            Ok(output) if output.status.success() => debug!("removed container {}", self.id),
            Ok(output) => warn!(
                "failed to remove container {}: {}",
                self.id,
                failure_detail(&output)
            ),
            Err(err) => warn!("failed to remove container {}: {err}", self.id),
        }
    }
}
