//! CLI argument definitions for the conversai installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::ConfigOverrides;
use crate::mode::InstallMode;
use camino::Utf8PathBuf;
use clap::Parser;

/// Install the conversai package with all optional extras.
#[derive(Parser, Debug, Clone)]
#[command(name = "conversai-install")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install the conversai package with all optional extras.\n\n",
    "In `dev` mode (the default) the project is installed in editable mode so ",
    "source edits take effect without reinstalling. Any other mode removes the ",
    "previous build output, builds a wheel without build isolation, and installs ",
    "that wheel.\n\n",
    "The procedure is fail-fast: the first failing step aborts the run with a ",
    "non-zero exit status.",
))]
#[command(after_help = concat!(
    "CONFIGURATION:\n",
    "  Settings are read from [tool.conversai-install] in pyproject.toml\n",
    "  (pip, python, extras, dist-dir, constraint). CONVERSAI_PIP and\n",
    "  CONVERSAI_PYTHON override the file; command-line flags override both.\n\n",
    "EXAMPLES:\n",
    "  Editable install of the current directory:\n",
    "    $ conversai-install\n\n",
    "  Build and install a wheel:\n",
    "    $ conversai-install prod\n\n",
    "  Install into a fresh virtual environment with pinned dependencies:\n",
    "    $ conversai-install --venv .venv --constraint constraints.txt\n\n",
    "  Preview the commands without running them:\n",
    "    $ conversai-install prod --dry-run",
))]
pub struct Cli {
    /// Install mode: `dev` installs in editable mode, anything else builds a wheel.
    #[arg(value_name = "MODE", default_value = "dev")]
    pub mode: InstallMode,

    /// Project directory containing pyproject.toml or setup.py.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub project: Utf8PathBuf,

    /// Packaging tool program [default: pip].
    #[arg(long, value_name = "PROGRAM")]
    pub pip: Option<String>,

    /// Python interpreter for the build frontend [default: python].
    #[arg(long, value_name = "PROGRAM")]
    pub python: Option<String>,

    /// Extras group to install with the package [default: all].
    #[arg(long, value_name = "NAME")]
    pub extras: Option<String>,

    /// Recreate a virtual environment here and install into it.
    #[arg(long, value_name = "DIR")]
    pub venv: Option<Utf8PathBuf>,

    /// Constraints file applied to every dependency install.
    #[arg(short, long, value_name = "FILE")]
    pub constraint: Option<Utf8PathBuf>,

    /// Show the planned commands and exit without running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the installation report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase pip output verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Returns the configuration values supplied on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            pip: self.pip.clone(),
            python: self.python.clone(),
            extras: self.extras.clone(),
            constraint: self.constraint.clone(),
            venv: self.venv.clone(),
        }
    }
}

impl Default for Cli {
    /// Creates a `Cli` equivalent to running without arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_installer::cli::Cli;
    /// use conversai_installer::mode::InstallMode;
    ///
    /// let cli = Cli::default();
    /// assert_eq!(cli.mode, InstallMode::Dev);
    /// assert!(!cli.dry_run);
    /// ```
    fn default() -> Self {
        Self {
            mode: InstallMode::Dev,
            project: Utf8PathBuf::from("."),
            pip: None,
            python: None,
            extras: None,
            venv: None,
            constraint: None,
            dry_run: false,
            json: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
