//! Command-line construction for pip, the build frontend and virtualenvs.
//!
//! Commands are built as data first so that dry runs can print exactly what a
//! real run would execute.

use crate::config::InstallerConfig;
use crate::error::{InstallerError, Result};
use crate::executor::{CommandExecutor, render_command, run_checked};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::process::Output;

/// Package name of the PEP 517 build frontend.
pub const BUILD_FRONTEND: &str = "build";

/// A program with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Creates a command line.
    #[must_use]
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn args(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }

    /// Runs the command, mapping an unsuccessful exit through `on_failure`.
    ///
    /// # Errors
    ///
    /// See [`run_checked`].
    pub fn run<F>(&self, executor: &dyn CommandExecutor, on_failure: F) -> Result<Output>
    where
        F: FnOnce(String) -> InstallerError,
    {
        run_checked(executor, &self.program, &self.args(), on_failure)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_command(&self.program, &self.args()))
    }
}

/// Programs and shared flags used to drive the packaging tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolset {
    base_python: String,
    pip: String,
    python: String,
    constraint: Option<Utf8PathBuf>,
    verbosity: u8,
}

impl Toolset {
    /// Derives the toolset from the configuration.
    ///
    /// With a virtualenv configured, `pip` and `python` are taken from the
    /// environment's script directory; the configured interpreter is only
    /// used to create it.
    #[must_use]
    pub fn from_config(config: &InstallerConfig, verbosity: u8) -> Self {
        let (pip, python) = match &config.venv {
            Some(venv) => (
                venv_program(venv, "pip").into_string(),
                venv_program(venv, "python").into_string(),
            ),
            None => (config.pip.clone(), config.python.clone()),
        };
        Self {
            base_python: config.python.clone(),
            pip,
            python,
            constraint: config.constraint.clone(),
            verbosity,
        }
    }

    /// Returns the packaging tool program in effect.
    #[must_use]
    pub fn pip(&self) -> &str {
        &self.pip
    }

    /// Returns the interpreter in effect.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// `python -m venv --clear <dir>`.
    #[must_use]
    pub fn create_venv(&self, dir: &Utf8Path) -> CommandLine {
        CommandLine::new(&self.base_python, ["-m", "venv", "--clear", dir.as_str()])
    }

    /// `pip install -U pip`.
    #[must_use]
    pub fn upgrade_pip(&self) -> CommandLine {
        self.pip_install(["-U", "pip"], false)
    }

    /// `pip install -e <project>[extras]`.
    #[must_use]
    pub fn editable_install(&self, requirement: &str) -> CommandLine {
        self.pip_install(["-e", requirement], true)
    }

    /// `pip install -U build`.
    #[must_use]
    pub fn ensure_build_frontend(&self) -> CommandLine {
        self.pip_install(["-U", BUILD_FRONTEND], false)
    }

    /// `python -m build --wheel --no-isolation --outdir <dist> <project>`.
    #[must_use]
    pub fn build_wheel(&self, project: &Utf8Path, dist: &Utf8Path) -> CommandLine {
        CommandLine::new(
            &self.python,
            [
                "-m",
                BUILD_FRONTEND,
                "--wheel",
                "--no-isolation",
                "--outdir",
                dist.as_str(),
                project.as_str(),
            ],
        )
    }

    /// `pip install <wheel>[extras]`.
    #[must_use]
    pub fn wheel_install(&self, requirement: &str) -> CommandLine {
        self.pip_install([requirement], true)
    }

    fn pip_install<'a>(
        &self,
        args: impl IntoIterator<Item = &'a str>,
        constrained: bool,
    ) -> CommandLine {
        let mut all = vec!["install".to_owned()];
        all.extend((0..self.verbosity).map(|_| "-v".to_owned()));
        if constrained {
            if let Some(constraint) = &self.constraint {
                all.push("-c".to_owned());
                all.push(constraint.to_string());
            }
        }
        all.extend(args.into_iter().map(str::to_owned));
        CommandLine::new(&self.pip, all)
    }
}

/// Returns the path of `program` inside a virtualenv.
#[must_use]
pub fn venv_program(venv: &Utf8Path, program: &str) -> Utf8PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join(format!("{program}.exe"))
    } else {
        venv.join("bin").join(program)
    }
}
