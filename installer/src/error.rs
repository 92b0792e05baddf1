//! Error types for the conversai installer CLI.
//!
//! This module defines semantic error variants that provide actionable guidance
//! to users when installation fails. Each error names the failing step and,
//! where a command was involved, the trimmed diagnostic it printed.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Neither `pyproject.toml` nor `setup.py` exists in the project directory.
    #[error("no pyproject.toml or setup.py found in {path}; pass --project to select the project")]
    ProjectNotFound {
        /// Directory that was inspected.
        path: Utf8PathBuf,
    },

    /// The `pyproject.toml` file could not be parsed.
    #[error("invalid manifest at {path}: {reason}")]
    InvalidManifest {
        /// Path to the invalid manifest.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig {
        /// The configuration key that failed validation.
        key: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// An external program could not be started at all.
    #[error("failed to run {program}: {source}")]
    CommandSpawn {
        /// Program that failed to start.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Upgrading the packaging tool failed.
    #[error("failed to upgrade {tool}: {message}")]
    ToolUpgrade {
        /// Name of the tool being upgraded.
        tool: String,
        /// Description of the failure.
        message: String,
    },

    /// Creating the isolated virtual environment failed.
    #[error("failed to create virtual environment at {path}: {message}")]
    EnvironmentCreation {
        /// Target directory of the virtual environment.
        path: Utf8PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Installing the build frontend failed.
    #[error("failed to install the build frontend: {message}")]
    BuildFrontend {
        /// Description of the failure.
        message: String,
    },

    /// The wheel build failed.
    #[error("wheel build failed for {project}: {message}")]
    BuildFailed {
        /// Project directory being built.
        project: Utf8PathBuf,
        /// Description of the build failure.
        message: String,
    },

    /// The build finished without producing a wheel.
    #[error("no wheel found in {dir} after the build; check the build backend output")]
    NoWheelProduced {
        /// Directory that was searched.
        dir: Utf8PathBuf,
    },

    /// The build produced more than one wheel, so the target is ambiguous.
    #[error("expected exactly one wheel in {dir}, found {}: {}", .candidates.len(), join_paths(.candidates))]
    AmbiguousWheels {
        /// Directory that was searched.
        dir: Utf8PathBuf,
        /// All matching wheels in sorted order.
        candidates: Vec<Utf8PathBuf>,
    },

    /// A file ending in `.whl` does not follow the wheel naming convention.
    #[error("invalid wheel filename {name}: {reason}")]
    InvalidWheelName {
        /// Offending filename.
        name: String,
        /// Description of the problem.
        reason: String,
    },

    /// Installing the package (editable or wheel) failed.
    #[error("failed to install {target}: {message}")]
    InstallFailed {
        /// Requirement that pip was asked to install.
        target: String,
        /// Description of the failure.
        message: String,
    },

    /// Removing the previous build output failed.
    #[error("failed to remove build output {path}: {source}")]
    CleanFailed {
        /// Directory that could not be removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(Utf8PathBuf::as_path)
        .map(Utf8Path::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
