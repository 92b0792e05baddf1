//! conversai CI runner entrypoint.

use clap::Parser;
use conversai_ci::cli::{Cli, Command, PlanArgs, RunArgs};
use conversai_ci::error::{PipelineError, Result};
use conversai_ci::runner::{PipelineRunner, RunOptions};
use conversai_ci::workflow::{Workflow, resolve_workflow};
use conversai_installer::executor::SystemCommandExecutor;
use conversai_installer::output::write_stderr_line;
use std::io::Write;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32> {
    match &cli.command {
        Command::Run(args) => run_pipeline(args, stdout, stderr),
        Command::Plan(args) => print_plan(args, stdout),
    }
}

fn run_pipeline(args: &RunArgs, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32> {
    let workflow = resolve_workflow(&args.repo, args.workflow.as_deref())?;

    if !is_triggered(&workflow, args) {
        write_stderr_line(
            stderr,
            format!("Workflow {} not triggered; nothing to do.", workflow.name),
        );
        return Ok(0);
    }

    let repo = args.repo.canonicalize_utf8()?;
    let host = SystemCommandExecutor::in_dir(repo.clone());
    let options = RunOptions {
        repo,
        host: args.host,
        verbosity: args.verbosity,
        quiet: args.quiet,
    };
    let report = PipelineRunner::new(&host, &workflow, &options).run(stderr)?;

    if args.json {
        report.write_json(stdout)?;
    } else {
        writeln!(stdout, "{}", report.summary())
            .map_err(|source| PipelineError::WriteFailed { source })?;
    }
    Ok(report.verdict.exit_code())
}

/// Manual runs, where no event is given, always proceed.
fn is_triggered(workflow: &Workflow, args: &RunArgs) -> bool {
    match (args.event, args.git_ref.as_deref()) {
        (Some(event), Some(git_ref)) => workflow.triggers.matches(event, git_ref),
        _ => true,
    }
}

fn print_plan(args: &PlanArgs, stdout: &mut dyn Write) -> Result<i32> {
    let workflow = resolve_workflow(&args.repo, args.workflow.as_deref())?;
    writeln!(stdout, "{}", workflow.plan_text())
        .map_err(|source| PipelineError::WriteFailed { source })?;
    Ok(0)
}

fn exit_code_for_run_result(result: Result<i32>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
