//! External command execution.
//!
//! Every program the installer and the CI runner invoke goes through the
//! [`CommandExecutor`] trait. Production code uses [`SystemCommandExecutor`];
//! tests substitute stubs so no real `pip` or `docker` is ever spawned.

use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use log::debug;
use std::process::{Command, Output};

/// Number of trailing diagnostic lines kept when a command fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be spawned. A command that
    /// runs and exits unsuccessfully is reported through `Output::status`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use conversai_installer::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("pip", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), conversai_installer::error::InstallerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// Commands inherit the current working directory unless the executor was
/// created with [`SystemCommandExecutor::in_dir`].
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor {
    working_dir: Option<Utf8PathBuf>,
}

impl SystemCommandExecutor {
    /// Creates an executor that runs every command inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running: {}", render_command(cmd, args));
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
            .output()
            .map_err(|source| InstallerError::CommandSpawn {
                program: cmd.to_owned(),
                source,
            })
    }
}

/// Runs a command and converts an unsuccessful exit into an error.
///
/// `on_failure` receives a short diagnostic built from the command's output
/// and must produce the step-specific error variant.
///
/// # Errors
///
/// Returns the spawn error unchanged, or the error built by `on_failure` when
/// the command exits unsuccessfully.
pub fn run_checked<F>(
    executor: &dyn CommandExecutor,
    cmd: &str,
    args: &[&str],
    on_failure: F,
) -> Result<Output>
where
    F: FnOnce(String) -> InstallerError,
{
    let output = executor.run(cmd, args)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(on_failure(failure_detail(&output)))
    }
}

/// Summarises a failed command's output for display.
///
/// Prefers the tail of stderr, falls back to the tail of stdout, and finally
/// to the exit status when the command printed nothing.
#[must_use]
pub fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let source = if stderr.trim().is_empty() {
        stdout
    } else {
        stderr
    };

    if source.trim().is_empty() {
        return match output.status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_owned(),
        };
    }

    tail_lines(source.trim(), FAILURE_TAIL_LINES)
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines.get(start..).unwrap_or_default().join("\n")
}

/// Renders a command line for progress and dry-run output.
///
/// Arguments containing whitespace or shell metacharacters are quoted.
///
/// # Examples
///
/// ```
/// use conversai_installer::executor::render_command;
///
/// assert_eq!(render_command("pip", &["install", "-e", ".[all]"]), "pip install -e \".[all]\"");
/// ```
#[must_use]
pub fn render_command(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .map(quote_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '*' | '?' | '&' | ';' | '|' | '$'));
    if needs_quotes {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_owned()
    }
}
