//! conversai installer CLI entrypoint.
//!
//! This binary installs the conversai package in editable mode or as a
//! freshly built wheel, always with its extras group.

use clap::Parser;
use conversai_installer::cli::Cli;
use conversai_installer::error::Result;
use conversai_installer::executor::{CommandExecutor, SystemCommandExecutor};
use conversai_installer::install_flow::{ProgressOptions, prepare_install};
use conversai_installer::output::{DryRunInfo, write_stderr_line};
use std::io::Write;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let executor = SystemCommandExecutor::default();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &executor, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    executor: &dyn CommandExecutor,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let prepared = prepare_install(&cli.project, &cli.overrides())?;
    let progress = ProgressOptions {
        verbosity: cli.verbosity,
        quiet: cli.quiet,
    };
    let installer = prepared.installer(executor, progress);

    if cli.dry_run {
        let steps = installer.describe(&cli.mode);
        let dist_dir = prepared.config.dist_path();
        let info = DryRunInfo {
            project: prepared.config.project_dir.as_str(),
            mode: &cli.mode,
            pip: installer.tools().pip(),
            python: installer.tools().python(),
            extras: &prepared.config.extras,
            dist_dir: dist_dir.as_str(),
            steps: &steps,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let report = installer.run(&cli.mode, stderr)?;
    if cli.json {
        report.write_json(stdout)?;
    } else if !cli.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, report.success_message());
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
