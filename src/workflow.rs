//! Workflow definitions.
//!
//! A workflow names the pinned image, the triggers and the ordered steps of
//! a pipeline. The built-in workflow is used unless the repository carries
//! `.conversai/ci.toml` or a file is passed explicitly.
//!
//! ```toml
//! name = "CI"
//! image = "python:3.10.13-slim-bookworm"
//!
//! [triggers]
//! events = ["push", "pull_request"]
//! branches = ["main"]
//!
//! [[steps]]
//! name = "checkout"
//! uses = "checkout"
//!
//! [[steps]]
//! name = "install"
//! install = "dev"
//!
//! [[steps]]
//! name = "lint"
//! run = "pip install flake8 && flake8 ."
//! allow-failure = true
//! ```

use crate::error::{PipelineError, Result};
use crate::image::ImageRef;
use crate::outcome::StepPolicy;
use crate::trigger::Triggers;
use camino::{Utf8Path, Utf8PathBuf};
use conversai_installer::mode::InstallMode;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Workflow file looked up inside the repository.
pub const WORKFLOW_FILE: &str = ".conversai/ci.toml";
/// Repository of the built-in workflow's image.
pub const DEFAULT_IMAGE_REPOSITORY: &str = "python";
/// Tag of the built-in workflow's image.
pub const DEFAULT_IMAGE_TAG: &str = "3.10.13-slim-bookworm";
/// Name given to workflows that do not declare one.
pub const DEFAULT_WORKFLOW_NAME: &str = "CI";
/// Built-in action name for the checkout step.
const CHECKOUT_ACTION: &str = "checkout";
/// Source name used in errors about the built-in workflow.
const BUILT_IN: &str = "built-in";

const SYSTEM_PACKAGES: &[&str] = &["build-essential", "git", "libsndfile1", "ffmpeg", "sox"];
const LINT_SCRIPT: &str = "pip install flake8 && flake8 .";
const TEST_SCRIPT: &str = "bash ./run_tests.sh";

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Make the repository content available to later steps.
    Checkout,
    /// Run the installer procedure with a mode.
    Install {
        /// Install mode.
        mode: InstallMode,
    },
    /// Run a shell script.
    Run {
        /// Script passed to `sh -c`.
        script: String,
    },
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout => f.write_str(CHECKOUT_ACTION),
            Self::Install { mode } => write!(f, "install ({mode})"),
            Self::Run { script } => write!(f, "run: {script}"),
        }
    }
}

/// One declared step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct StepSpec {
    /// Unique step name.
    pub name: String,
    /// What the step does.
    pub action: StepAction,
    /// How a failure affects the pipeline.
    pub policy: StepPolicy,
}

impl StepSpec {
    fn new(name: &str, action: StepAction, policy: StepPolicy) -> Self {
        Self {
            name: name.to_owned(),
            action,
            policy,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawStep {
    name: String,
    uses: Option<String>,
    run: Option<String>,
    install: Option<String>,
    #[serde(default)]
    allow_failure: bool,
}

impl TryFrom<RawStep> for StepSpec {
    type Error = String;

    fn try_from(raw: RawStep) -> std::result::Result<Self, Self::Error> {
        let action = match (raw.uses, raw.run, raw.install) {
            (Some(uses), None, None) if uses == CHECKOUT_ACTION => StepAction::Checkout,
            (Some(uses), None, None) => {
                return Err(format!("step `{}` uses unknown action `{uses}`", raw.name));
            }
            (None, Some(script), None) if script.trim().is_empty() => {
                return Err(format!("step `{}` has an empty script", raw.name));
            }
            (None, Some(script), None) => StepAction::Run { script },
            (None, None, Some(mode)) => StepAction::Install {
                mode: InstallMode::from(mode.as_str()),
            },
            _ => {
                return Err(format!(
                    "step `{}` must set exactly one of `uses`, `run` or `install`",
                    raw.name
                ));
            }
        };
        Ok(Self {
            name: raw.name,
            action,
            policy: StepPolicy::from_allow_failure(raw.allow_failure),
        })
    }
}

/// A complete pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Pinned container image.
    pub image: ImageRef,
    /// Events and branches that start the pipeline.
    #[serde(default)]
    pub triggers: Triggers,
    /// Ordered steps.
    pub steps: Vec<StepSpec>,
}

fn default_name() -> String {
    DEFAULT_WORKFLOW_NAME.to_owned()
}

impl Workflow {
    /// Parses and validates a workflow from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidWorkflow`] for malformed TOML or an
    /// invalid definition, and [`PipelineError::UnpinnedImage`] when the
    /// image is not pinned.
    pub fn from_toml(source_name: &str, text: &str) -> Result<Self> {
        let workflow: Self = toml::from_str(text).map_err(|err| PipelineError::InvalidWorkflow {
            source_name: source_name.to_owned(),
            reason: err.message().to_owned(),
        })?;
        workflow.validate(source_name)?;
        Ok(workflow)
    }

    /// Reads a workflow file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WorkflowNotFound`] when the file is missing,
    /// or any error from [`Workflow::from_toml`].
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PipelineError::WorkflowNotFound {
                    path: path.to_owned(),
                }
            } else {
                PipelineError::Io(err)
            }
        })?;
        debug!("loaded workflow from {path}");
        Self::from_toml(path.as_str(), &text)
    }

    /// Checks the structural rules every workflow must satisfy.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty step list, blank or duplicate step
    /// names, or an unpinned image.
    pub fn validate(&self, source_name: &str) -> Result<()> {
        let invalid = |reason: String| PipelineError::InvalidWorkflow {
            source_name: source_name.to_owned(),
            reason,
        };

        if self.steps.is_empty() {
            return Err(invalid("a workflow needs at least one step".to_owned()));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(invalid("step names must not be empty".to_owned()));
            }
            if !names.insert(step.name.as_str()) {
                return Err(invalid(format!("duplicate step name `{}`", step.name)));
            }
        }

        self.image.require_pinned()
    }

    /// Returns the step with `name`, if declared.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Renders the workflow for `conversai-ci plan`.
    #[must_use]
    pub fn plan_text(&self) -> String {
        let events = self
            .triggers
            .events
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let pin = match (self.image.digest(), self.image.tag()) {
            (Some(digest), _) => format!("digest {digest}"),
            (None, Some(tag)) => format!("tag {tag}"),
            (None, None) => "nothing".to_owned(),
        };
        let mut lines = vec![
            format!("Workflow: {}", self.name),
            format!("Image: {} (pinned by {pin})", self.image),
            format!(
                "Triggers: {events} on {}",
                self.triggers.branches.join(", ")
            ),
            String::new(),
            "Steps:".to_owned(),
        ];
        lines.extend(self.steps.iter().enumerate().map(|(index, step)| {
            format!(
                "  {}. {} [{}] {}",
                index + 1,
                step.name,
                step.policy,
                step.action
            )
        }));
        lines.join("\n")
    }
}

/// Returns the built-in workflow.
///
/// # Examples
///
/// ```
/// use conversai_ci::outcome::StepPolicy;
/// use conversai_ci::workflow::default_workflow;
///
/// let workflow = default_workflow();
/// assert_eq!(workflow.steps.len(), 5);
/// assert_eq!(workflow.step("lint").map(|step| step.policy), Some(StepPolicy::Tolerated));
/// ```
#[must_use]
pub fn default_workflow() -> Workflow {
    let system_deps = format!(
        "apt-get update && apt-get install -y --no-install-recommends {}",
        SYSTEM_PACKAGES.join(" ")
    );
    Workflow {
        name: default_name(),
        image: ImageRef::tagged(DEFAULT_IMAGE_REPOSITORY, DEFAULT_IMAGE_TAG),
        triggers: Triggers::default(),
        steps: vec![
            StepSpec::new("checkout", StepAction::Checkout, StepPolicy::Fatal),
            StepSpec::new(
                "system-deps",
                StepAction::Run {
                    script: system_deps,
                },
                StepPolicy::Fatal,
            ),
            StepSpec::new(
                "install",
                StepAction::Install {
                    mode: InstallMode::Dev,
                },
                StepPolicy::Fatal,
            ),
            StepSpec::new(
                "lint",
                StepAction::Run {
                    script: LINT_SCRIPT.to_owned(),
                },
                StepPolicy::Tolerated,
            ),
            StepSpec::new(
                "tests",
                StepAction::Run {
                    script: TEST_SCRIPT.to_owned(),
                },
                StepPolicy::Fatal,
            ),
        ],
    }
}

/// Picks the workflow for a run.
///
/// An explicit path must exist. Otherwise `<repo>/.conversai/ci.toml` is used
/// when present, and the built-in workflow when it is not.
///
/// # Errors
///
/// Returns any error from [`Workflow::load`] or validation.
pub fn resolve_workflow(repo: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Workflow> {
    if let Some(path) = explicit {
        return Workflow::load(path);
    }
    let candidate: Utf8PathBuf = repo.join(WORKFLOW_FILE);
    if candidate.is_file() {
        return Workflow::load(&candidate);
    }
    debug!("no {WORKFLOW_FILE} in {repo}; using the built-in workflow");
    let workflow = default_workflow();
    workflow.validate(BUILT_IN)?;
    Ok(workflow)
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
