//! Behaviour-driven tests for the CI pipeline.
//!
//! Every command is answered by `StubExecutor`, so the scenarios exercise
//! step ordering, policies and container lifetime without docker or pip.

use camino::Utf8PathBuf;
use conversai_ci::error::PipelineError;
use conversai_ci::host::HostKind;
use conversai_ci::outcome::{PipelineReport, StepStatus, Verdict};
use conversai_ci::runner::{PipelineRunner, RunOptions};
use conversai_ci::workflow::{StepAction, Workflow, default_workflow, resolve_workflow};
use conversai_installer::test_utils::{ExpectedCall, StubExecutor, output_with, stdout_output};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};
use tempfile::TempDir;

const CONTAINER_ID: &str = "ctr1";

struct PipelineWorld {
    _temp: TempDir,
    repo: Utf8PathBuf,
    host: Cell<HostKind>,
    system_deps_code: Cell<i32>,
    lint_code: Cell<i32>,
    tests_code: Cell<i32>,
    received: RefCell<Vec<String>>,
    report: RefCell<Option<PipelineReport>>,
    resolved: RefCell<Option<conversai_ci::error::Result<Workflow>>>,
}

impl PipelineWorld {
    fn script(name: &str) -> String {
        match default_workflow().step(name).map(|step| step.action.clone()) {
            Some(StepAction::Run { script }) => script,
            other => panic!("step {name} is not a run step: {other:?}"),
        }
    }

    /// Wraps a step command for the configured host.
    fn step_call(&self, cmd: &str, args: &[&str], code: i32) -> ExpectedCall {
        let call = match self.host.get() {
            HostKind::Local => ExpectedCall::new(cmd, args.iter().copied()),
            HostKind::Container => {
                let mut exec = vec!["exec", "-w", self.repo.as_str(), CONTAINER_ID, cmd];
                exec.extend_from_slice(args);
                ExpectedCall::new("docker", exec)
            }
        };
        call.returning(Ok(output_with(code, "", if code == 0 { "" } else { "failed" })))
    }

    fn expected_calls(&self) -> Vec<ExpectedCall> {
        let container = self.host.get() == HostKind::Container;
        let mut calls = Vec::new();
        if container {
            let mount = format!("{0}:{0}", self.repo);
            calls.push(
                ExpectedCall::new(
                    "docker",
                    [
                        "run",
                        "-d",
                        "-v",
                        mount.as_str(),
                        "-w",
                        self.repo.as_str(),
                        "python:3.10.13-slim-bookworm",
                        "sleep",
                        "infinity",
                    ],
                )
                .returning(Ok(stdout_output(CONTAINER_ID))),
            );
        }
        calls.push(
            ExpectedCall::new(
                "git",
                ["-C", self.repo.as_str(), "rev-parse", "--is-inside-work-tree"],
            )
            .returning(Ok(stdout_output("true\n"))),
        );

        let system_deps = Self::script("system-deps");
        let system_deps_code = self.system_deps_code.get();
        calls.push(self.step_call("sh", &["-c", system_deps.as_str()], system_deps_code));
        if system_deps_code == 0 {
            let editable = format!("{}[all]", self.repo);
            let lint = Self::script("lint");
            let tests = Self::script("tests");
            calls.push(self.step_call("pip", &["install", "-U", "pip"], 0));
            calls.push(self.step_call("pip", &["install", "-e", editable.as_str()], 0));
            calls.push(self.step_call("sh", &["-c", lint.as_str()], self.lint_code.get()));
            calls.push(self.step_call("sh", &["-c", tests.as_str()], self.tests_code.get()));
        }

        if container {
            calls.push(ExpectedCall::new("docker", ["rm", "-f", CONTAINER_ID]));
        }
        calls
    }

    fn verdict(&self) -> Verdict {
        self.report
            .borrow()
            .as_ref()
            .map(|report| report.verdict.clone())
            .expect("pipeline has run")
    }
}

#[fixture]
fn pipeline_world() -> PipelineWorld {
    let temp = tempfile::tempdir().expect("create temp dir");
    let repo = Utf8PathBuf::try_from(temp.path().to_owned()).expect("UTF-8 temp dir");
    PipelineWorld {
        _temp: temp,
        repo,
        host: Cell::new(HostKind::Local),
        system_deps_code: Cell::new(0),
        lint_code: Cell::new(0),
        tests_code: Cell::new(0),
        received: RefCell::new(Vec::new()),
        report: RefCell::new(None),
        resolved: RefCell::new(None),
    }
}

#[given("a repository with a conversai project")]
fn given_repository(pipeline_world: &PipelineWorld) {
    std::fs::write(
        pipeline_world.repo.join("pyproject.toml"),
        "[project]\nname = \"conversai\"\n\n[project.optional-dependencies]\nall = [\"torch\"]\n",
    )
    .expect("write manifest");
}

#[given("the system package step fails")]
fn given_system_deps_fail(pipeline_world: &PipelineWorld) {
    pipeline_world.system_deps_code.set(100);
}

#[given("the linter reports violations")]
fn given_lint_fails(pipeline_world: &PipelineWorld) {
    pipeline_world.lint_code.set(1);
}

#[given("the test script fails")]
fn given_tests_fail(pipeline_world: &PipelineWorld) {
    pipeline_world.tests_code.set(1);
}

#[given("steps run in a container")]
fn given_container(pipeline_world: &PipelineWorld) {
    pipeline_world.host.set(HostKind::Container);
}

#[given("a workflow file using the latest image tag")]
fn given_floating_workflow(pipeline_world: &PipelineWorld) {
    let dir = pipeline_world.repo.join(".conversai");
    std::fs::create_dir_all(&dir).expect("create config dir");
    std::fs::write(
        dir.join("ci.toml"),
        "image = \"python:latest\"\n\n[[steps]]\nname = \"tests\"\nrun = \"bash ./run_tests.sh\"\n",
    )
    .expect("write workflow");
}

#[when("the default pipeline runs")]
fn when_pipeline_runs(pipeline_world: &PipelineWorld) {
    let host = StubExecutor::new(pipeline_world.expected_calls());
    let workflow = default_workflow();
    let options = RunOptions {
        repo: pipeline_world.repo.clone(),
        host: pipeline_world.host.get(),
        verbosity: 0,
        quiet: true,
    };

    let report = PipelineRunner::new(&host, &workflow, &options)
        .run(&mut Vec::new())
        .expect("pipeline runs");

    host.assert_finished();
    pipeline_world.received.replace(host.received());
    pipeline_world.report.replace(Some(report));
}

#[when("the workflow is resolved")]
fn when_workflow_resolved(pipeline_world: &PipelineWorld) {
    let resolved = resolve_workflow(&pipeline_world.repo, None);
    pipeline_world.resolved.replace(Some(resolved));
}

#[then("the installer is never invoked")]
fn then_installer_not_invoked(pipeline_world: &PipelineWorld) {
    assert!(
        !pipeline_world
            .received
            .borrow()
            .iter()
            .any(|call| call.contains("pip install"))
    );
}

#[then("the install, lint and tests steps are skipped")]
fn then_later_steps_skipped(pipeline_world: &PipelineWorld) {
    let borrowed = pipeline_world.report.borrow();
    let report = borrowed.as_ref().expect("pipeline has run");
    let skipped: Vec<&str> = report
        .steps
        .iter()
        .filter(|step| step.status == StepStatus::Skipped)
        .map(|step| step.name.as_str())
        .collect();
    assert_eq!(skipped, ["install", "lint", "tests"]);
}

#[then("every declared step has an outcome")]
fn then_every_step_recorded(pipeline_world: &PipelineWorld) {
    let report = pipeline_world.report.borrow();
    let names: Vec<&str> = report
        .as_ref()
        .expect("pipeline has run")
        .steps
        .iter()
        .map(|step| step.name.as_str())
        .collect();
    assert_eq!(names, ["checkout", "system-deps", "install", "lint", "tests"]);
}

#[then("the pipeline succeeds")]
fn then_success(pipeline_world: &PipelineWorld) {
    assert_eq!(pipeline_world.verdict(), Verdict::Success);
}

#[then("the pipeline fails at the system-deps step")]
fn then_fails_at_system_deps(pipeline_world: &PipelineWorld) {
    assert_eq!(
        pipeline_world.verdict(),
        Verdict::Failure {
            step: "system-deps".to_owned()
        }
    );
}

#[then("the pipeline fails at the tests step")]
fn then_fails_at_tests(pipeline_world: &PipelineWorld) {
    assert_eq!(
        pipeline_world.verdict(),
        Verdict::Failure {
            step: "tests".to_owned()
        }
    );
}

#[then("the container is removed")]
fn then_container_removed(pipeline_world: &PipelineWorld) {
    let expected = format!("docker rm -f {CONTAINER_ID}");
    assert_eq!(
        pipeline_world.received.borrow().last().map(String::as_str),
        Some(expected.as_str())
    );
}

#[then("the workflow is rejected as unpinned")]
fn then_rejected_unpinned(pipeline_world: &PipelineWorld) {
    let resolved = pipeline_world.resolved.borrow();
    assert!(matches!(
        resolved.as_ref(),
        Some(Err(PipelineError::UnpinnedImage { .. }))
    ));
}

#[scenario(path = "tests/features/pipeline.feature", index = 0)]
fn scenario_system_deps_failure_stops_pipeline(pipeline_world: PipelineWorld) {
    let _ = pipeline_world;
}

#[scenario(path = "tests/features/pipeline.feature", index = 1)]
fn scenario_lint_failure_is_tolerated(pipeline_world: PipelineWorld) {
    let _ = pipeline_world;
}

#[scenario(path = "tests/features/pipeline.feature", index = 2)]
fn scenario_test_failure_fails_pipeline(pipeline_world: PipelineWorld) {
    let _ = pipeline_world;
}

#[scenario(path = "tests/features/pipeline.feature", index = 3)]
fn scenario_container_removed_after_failure(pipeline_world: PipelineWorld) {
    let _ = pipeline_world;
}

#[scenario(path = "tests/features/pipeline.feature", index = 4)]
fn scenario_floating_image_rejected(pipeline_world: PipelineWorld) {
    let _ = pipeline_world;
}
