//! CLI argument definitions for the CI runner.

use crate::host::HostKind;
use crate::trigger::TriggerEvent;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Run the conversai verification pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "conversai-ci")]
#[command(version, about)]
#[command(long_about = concat!(
    "Run the conversai verification pipeline.\n\n",
    "The pipeline checks out the repository, installs system packages, installs ",
    "the project with its extras, lints the tree and runs the test script. Lint ",
    "failures are tolerated; any other failing step stops the run and fails it.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Run the built-in workflow on this machine:\n",
    "    $ conversai-ci run\n\n",
    "  Run inside the pinned container image:\n",
    "    $ conversai-ci run --host container\n\n",
    "  Run only if a push to the given ref should trigger the pipeline:\n",
    "    $ conversai-ci run --event push --ref refs/heads/main\n\n",
    "  Show the resolved workflow:\n",
    "    $ conversai-ci plan",
))]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the pipeline and report the verdict.
    Run(RunArgs),
    /// Print the resolved workflow without running it.
    Plan(PlanArgs),
}

/// Arguments for `conversai-ci run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Workflow file [default: <repo>/.conversai/ci.toml, else built-in].
    #[arg(short, long, value_name = "FILE")]
    pub workflow: Option<Utf8PathBuf>,

    /// Repository directory.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: Utf8PathBuf,

    /// Where step commands run.
    #[arg(long, value_enum, default_value_t = HostKind::Local)]
    pub host: HostKind,

    /// Event that triggered the run; omit for a manual run.
    #[arg(long, value_enum, requires = "git_ref")]
    pub event: Option<TriggerEvent>,

    /// Ref the event applies to (target branch for pull requests).
    #[arg(long = "ref", value_name = "REF", requires = "event")]
    pub git_ref: Option<String>,

    /// Print the pipeline report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Echo step output (repeatable; also raises pip verbosity).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (the summary is still printed).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            workflow: None,
            repo: Utf8PathBuf::from("."),
            host: HostKind::Local,
            event: None,
            git_ref: None,
            json: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

/// Arguments for `conversai-ci plan`.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Workflow file [default: <repo>/.conversai/ci.toml, else built-in].
    #[arg(short, long, value_name = "FILE")]
    pub workflow: Option<Utf8PathBuf>,

    /// Repository directory.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: Utf8PathBuf,
}
