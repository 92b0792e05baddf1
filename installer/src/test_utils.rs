//! Shared test utilities for the installer crate and its dependants.

use crate::error::{InstallerError, Result};
use crate::executor::CommandExecutor;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    output_with(0, "", "")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    output_with(0, stdout, "")
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    output_with(1, "", stderr)
}

/// Creates a command `Output` with an explicit exit code and streams.
#[must_use]
pub fn output_with(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
pub struct ExpectedCall {
    /// The command to execute (e.g., "pip").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    effect: Option<Box<dyn FnOnce()>>,
}

impl ExpectedCall {
    /// Expects `cmd args…` and answers with a successful, silent exit.
    #[must_use]
    pub fn new<I, S>(cmd: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            result: Ok(success_output()),
            effect: None,
        }
    }

    /// Replaces the result returned for this call.
    #[must_use]
    pub fn returning(mut self, result: Result<Output>) -> Self {
        self.result = result;
        self
    }

    /// Runs `effect` when the call is made, before the result is returned.
    ///
    /// Used to simulate side effects such as a build writing a wheel.
    #[must_use]
    pub fn with_effect(mut self, effect: impl FnOnce() + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }
}

impl fmt::Debug for ExpectedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedCall")
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .field("result", &self.result)
            .field("has_effect", &self.effect.is_some())
            .finish()
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replays expected command invocations in order and returns predefined
/// results, allowing tests to verify command execution without side effects.
/// Unexpected or mismatched invocations yield
/// [`InstallerError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns every invocation received so far, rendered as command lines.
    #[must_use]
    pub fn received(&self) -> Vec<String> {
        self.received.borrow().clone()
    }

    /// Returns the number of expected calls not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.expected.borrow().len()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.front()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let rendered = std::iter::once(cmd)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.received.borrow_mut().push(rendered.clone());

        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(InstallerError::StubMismatch {
                message: format!("unexpected command invocation: {rendered}"),
            });
        };

        if call.cmd != cmd || call.args.iter().map(String::as_str).ne(args.iter().copied()) {
            return Err(InstallerError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{rendered}`",
                    call.cmd,
                    call.args.join(" ")
                ),
            });
        }

        if let Some(effect) = call.effect {
            effect();
        }
        call.result
    }
}
