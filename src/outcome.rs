//! Step outcomes, the pipeline verdict and the run report.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// How a step's failure affects the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// A failure halts the pipeline and fails the verdict.
    #[default]
    Fatal,
    /// A failure is recorded but changes nothing.
    Tolerated,
}

impl StepPolicy {
    /// Maps an `allow-failure` flag onto a policy.
    #[must_use]
    pub const fn from_allow_failure(allow_failure: bool) -> Self {
        if allow_failure {
            Self::Tolerated
        } else {
            Self::Fatal
        }
    }
}

impl fmt::Display for StepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fatal => "fatal",
            Self::Tolerated => "tolerated",
        })
    }
}

/// What happened to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// The step completed successfully.
    Passed,
    /// The step ran and failed.
    Failed {
        /// Exit code, when the step was a process that exited normally.
        code: Option<i32>,
        /// Short diagnostic.
        detail: String,
    },
    /// The step never ran because an earlier fatal step failed.
    Skipped,
}

impl StepStatus {
    /// Returns whether the step failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// The recorded result of one declared step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step name.
    pub name: String,
    /// Policy the step ran under.
    pub policy: StepPolicy,
    /// What happened.
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepOutcome {
    /// Returns whether this outcome fails the pipeline.
    #[must_use]
    pub const fn is_fatal_failure(&self) -> bool {
        matches!(self.policy, StepPolicy::Fatal) && self.status.is_failure()
    }
}

/// Overall pipeline result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    /// No fatal step failed.
    Success,
    /// A fatal step failed.
    Failure {
        /// Name of the first fatal step that failed.
        step: String,
    },
}

impl Verdict {
    /// Folds step outcomes into a verdict.
    ///
    /// The pipeline fails iff some fatal step failed; tolerated failures and
    /// skipped steps never change the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_ci::outcome::{StepOutcome, StepPolicy, StepStatus, Verdict};
    ///
    /// let lint = StepOutcome {
    ///     name: "lint".to_owned(),
    ///     policy: StepPolicy::Tolerated,
    ///     status: StepStatus::Failed { code: Some(1), detail: "E501".to_owned() },
    /// };
    /// assert_eq!(Verdict::fold(&[lint]), Verdict::Success);
    /// ```
    #[must_use]
    pub fn fold(outcomes: &[StepOutcome]) -> Self {
        outcomes
            .iter()
            .find(|outcome| outcome.is_fatal_failure())
            .map_or(Self::Success, |outcome| Self::Failure {
                step: outcome.name.clone(),
            })
    }

    /// Returns whether the pipeline succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the process exit code for this verdict.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure { step } => write!(f, "failure (step `{step}`)"),
        }
    }
}

/// The record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Workflow name.
    pub workflow: String,
    /// Execution host description.
    pub host: String,
    /// One outcome per declared step, in declaration order.
    pub steps: Vec<StepOutcome>,
    /// Folded result.
    pub verdict: Verdict,
}

impl PipelineReport {
    /// Builds a report and folds its verdict.
    #[must_use]
    pub fn new(workflow: impl Into<String>, host: impl Into<String>, steps: Vec<StepOutcome>) -> Self {
        let verdict = Verdict::fold(&steps);
        Self {
            workflow: workflow.into(),
            host: host.into(),
            steps,
            verdict,
        }
    }

    /// Renders the human summary table.
    #[must_use]
    pub fn summary(&self) -> String {
        let width = self
            .steps
            .iter()
            .map(|step| step.name.len())
            .max()
            .unwrap_or(0)
            .max("step".len());

        let mut lines = vec![
            format!("Workflow {} on {}", self.workflow, self.host),
            String::new(),
            format!("  {:<width$}  {:<9}  {:<7}  detail", "step", "policy", "status"),
        ];
        for step in &self.steps {
            let detail = match &step.status {
                StepStatus::Failed { code, detail } => {
                    let first = detail.lines().next().unwrap_or_default();
                    code.map_or_else(|| first.to_owned(), |code| format!("exit {code}: {first}"))
                }
                StepStatus::Passed | StepStatus::Skipped => String::new(),
            };
            lines.push(
                format!(
                    "  {:<width$}  {:<9}  {:<7}  {detail}",
                    step.name,
                    step.policy.to_string(),
                    step.status.label()
                )
                .trim_end()
                .to_owned(),
            );
        }
        lines.push(String::new());
        lines.push(format!("Verdict: {}", self.verdict));
        lines.join("\n")
    }

    /// Writes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WriteFailed`] when the writer fails.
    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| PipelineError::WriteFailed { source: err.into() })?;
        writeln!(out, "{json}").map_err(|source| PipelineError::WriteFailed { source })
    }
}
