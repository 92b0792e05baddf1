//! conversai installer library.
//!
//! This crate installs the conversai Python package either in editable mode
//! or by building a wheel and installing it, always with an extras group. It
//! is used by the `conversai-install` CLI binary and by the CI runner, which
//! drives the same procedure in-process.
//!
//! # Modules
//!
//! - [`artefact`] - Wheel discovery and filename parsing
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - Command-line construction for pip and the build frontend
//! - [`config`] - Layered configuration resolution
//! - [`error`] - Semantic error types with recovery hints
//! - [`executor`] - External command execution
//! - [`install_flow`] - The fail-fast installation procedure
//! - [`mode`] - Install modes and extras groups
//! - [`output`] - Progress output, reports and dry-run formatting
//! - [`project`] - Project descriptor inspection

pub mod artefact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod install_flow;
pub mod mode;
pub mod output;
pub mod project;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
