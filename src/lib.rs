//! conversai CI runner.
//!
//! Runs the conversai verification pipeline: check out the repository,
//! install system packages, install the project through the installer
//! library, lint, and run the tests. Steps run sequentially on this machine
//! or inside the workflow's pinned container image, and every step carries a
//! policy that decides whether its failure fails the pipeline.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Infrastructure errors
//! - [`host`] - Local and container execution hosts
//! - [`image`] - Container image references
//! - [`outcome`] - Step outcomes, verdict and report
//! - [`runner`] - Sequential step execution
//! - [`trigger`] - Event and branch matching
//! - [`workflow`] - Workflow definitions and loading

pub mod cli;
pub mod error;
pub mod host;
pub mod image;
pub mod outcome;
pub mod runner;
pub mod trigger;
pub mod workflow;
