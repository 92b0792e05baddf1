//! Output formatting for the installer CLI.
//!
//! Progress lines go to an injected writer (stderr in the binary) so that
//! tests can capture them. The final report can be rendered either as a
//! human confirmation message or as JSON.

use crate::error::{InstallerError, Result};
use crate::mode::{ExtrasGroup, InstallMode};
use crate::project::DescriptorKind;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::io::Write;

/// Writes a line to `stderr`, ignoring write failures.
///
/// Progress output is best-effort; a closed stderr must not abort an install.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Summary of a completed installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Mode the project was installed with.
    pub mode: InstallMode,
    /// Descriptor kind found in the project.
    pub descriptor: DescriptorKind,
    /// Declared package name, when known.
    pub package: Option<String>,
    /// Installed version, from the wheel or the manifest.
    pub version: Option<String>,
    /// Extras group requested.
    pub extras: ExtrasGroup,
    /// Requirement handed to pip (editable path or wheel file).
    pub target: String,
    /// Wheel that was installed, for non-editable modes.
    pub wheel: Option<Utf8PathBuf>,
    /// Virtual environment used, if any.
    pub venv: Option<Utf8PathBuf>,
}

impl InstallReport {
    /// Formats the final confirmation message.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_installer::mode::{ExtrasGroup, InstallMode};
    /// use conversai_installer::output::InstallReport;
    /// use conversai_installer::project::DescriptorKind;
    ///
    /// let report = InstallReport {
    ///     mode: InstallMode::Dev,
    ///     descriptor: DescriptorKind::Pyproject,
    ///     package: Some("conversai".to_owned()),
    ///     version: Some("0.1.0".to_owned()),
    ///     extras: ExtrasGroup::default(),
    ///     target: ".[all]".to_owned(),
    ///     wheel: None,
    ///     venv: None,
    /// };
    /// assert_eq!(
    ///     report.success_message(),
    ///     "Successfully installed conversai 0.1.0 in editable mode with extras [all]"
    /// );
    /// ```
    #[must_use]
    pub fn success_message(&self) -> String {
        let subject = match (&self.package, &self.version) {
            (Some(package), Some(version)) => format!("{package} {version}"),
            (Some(package), None) => package.clone(),
            (None, _) => "the project".to_owned(),
        };
        let how = match &self.wheel {
            Some(wheel) => format!("from {wheel}"),
            None => "in editable mode".to_owned(),
        };
        let mut message = format!(
            "Successfully installed {subject} {how} with extras [{}]",
            self.extras
        );
        if let Some(venv) = &self.venv {
            message.push_str(&format!(" into {venv}"));
        }
        message
    }

    /// Writes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::WriteFailed`] when the writer fails.
    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| InstallerError::WriteFailed { source: err.into() })?;
        writeln!(out, "{json}").map_err(|source| InstallerError::WriteFailed { source })
    }
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Project directory.
    pub project: &'a str,
    /// Install mode.
    pub mode: &'a InstallMode,
    /// Packaging tool in effect.
    pub pip: &'a str,
    /// Interpreter in effect.
    pub python: &'a str,
    /// Extras group.
    pub extras: &'a ExtrasGroup,
    /// Build output directory.
    pub dist_dir: &'a str,
    /// Rendered commands and actions, in order.
    pub steps: &'a [String],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no commands will be executed".to_owned(),
            String::new(),
            format!("Project: {}", self.project),
            format!("Mode: {}", self.mode),
            format!("Pip: {}", self.pip),
            format!("Python: {}", self.python),
            format!("Extras: {}", self.extras),
            format!("Build output: {}", self.dist_dir),
            String::new(),
            "Steps:".to_owned(),
        ];
        lines.extend(
            self.steps
                .iter()
                .enumerate()
                .map(|(index, step)| format!("  {}. {step}", index + 1)),
        );
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn report() -> InstallReport {
        InstallReport {
            mode: InstallMode::from("prod"),
            descriptor: DescriptorKind::Pyproject,
            package: Some("conversai".to_owned()),
            version: Some("0.1.0".to_owned()),
            extras: ExtrasGroup::default(),
            target: "dist/conversai-0.1.0-py3-none-any.whl[all]".to_owned(),
            wheel: Some(Utf8PathBuf::from("dist/conversai-0.1.0-py3-none-any.whl")),
            venv: None,
        }
    }

    #[rstest]
    fn wheel_installs_name_the_wheel(report: InstallReport) {
        let message = report.success_message();
        assert!(message.starts_with("Successfully installed conversai 0.1.0"));
        assert!(message.contains("from dist/conversai-0.1.0-py3-none-any.whl"));
    }

    #[rstest]
    fn unnamed_projects_are_described_generically(mut report: InstallReport) {
        report.package = None;
        report.venv = Some(Utf8PathBuf::from(".venv"));
        let message = report.success_message();
        assert!(message.contains("the project"));
        assert!(message.ends_with("into .venv"));
    }

    #[rstest]
    fn json_report_is_structured(report: InstallReport) {
        let mut out = Vec::new();
        report.write_json(&mut out).expect("write json");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
        assert_eq!(value["mode"]["kind"], "dist");
        assert_eq!(value["mode"]["label"], "prod");
        assert_eq!(value["extras"], "all");
        assert_eq!(value["descriptor"], "pyproject");
    }

    #[test]
    fn dry_run_text_numbers_steps() {
        let steps = vec!["pip install -U pip".to_owned(), "pip install -e \".[all]\"".to_owned()];
        let info = DryRunInfo {
            project: ".",
            mode: &InstallMode::Dev,
            pip: "pip",
            python: "python",
            extras: &ExtrasGroup::default(),
            dist_dir: "./dist",
            steps: &steps,
        };

        let text = info.display_text();
        assert!(text.starts_with("Dry run"));
        assert!(text.contains("Mode: dev"));
        assert!(text.contains("  1. pip install -U pip"));
        assert!(text.contains("  2. pip install -e"));
    }
}
