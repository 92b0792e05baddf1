//! Error types for the CI runner.
//!
//! Step failures are not errors: they become failed step outcomes and are
//! folded into the verdict. Errors here cover the infrastructure around the
//! steps, such as an unreadable workflow or a container that will not start.

use camino::Utf8PathBuf;
use conversai_installer::error::InstallerError;
use thiserror::Error;

/// Errors that can occur while loading or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The workflow file does not exist.
    #[error("workflow file not found at {path}")]
    WorkflowNotFound {
        /// Path that was looked up.
        path: Utf8PathBuf,
    },

    /// The workflow file could not be parsed or failed validation.
    #[error("invalid workflow {source_name}: {reason}")]
    InvalidWorkflow {
        /// File name or `built-in`.
        source_name: String,
        /// What is wrong.
        reason: String,
    },

    /// The container image is not pinned to a version.
    #[error(
        "container image `{image}` is not pinned; use an explicit tag other than `latest` or a digest"
    )]
    UnpinnedImage {
        /// Image reference as written.
        image: String,
    },

    /// The container could not be started.
    #[error("failed to start container from {image}: {message}")]
    Container {
        /// Image that was started.
        image: String,
        /// Diagnostic from docker.
        message: String,
    },

    /// An installer operation failed outside a step.
    #[error(transparent)]
    Install(#[from] InstallerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the report failed.
    #[error("failed to write pipeline report: {source}")]
    WriteFailed {
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
