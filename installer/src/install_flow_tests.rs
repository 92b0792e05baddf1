//! Tests for the installation procedure.
//!
//! Every external command is replayed by `StubExecutor`; the filesystem side
//! of the wheel branch runs against a temporary project directory.

use super::*;
use crate::config::InstallerConfig;
use crate::project::{PYPROJECT_FILE, inspect_project};
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output};
use camino::Utf8PathBuf;
use logtest::Logger;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const WHEEL: &str = "conversai-0.1.0-py3-none-any.whl";

struct Project {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn dist(&self) -> Utf8PathBuf {
        self.root.join("dist")
    }

    fn config(&self) -> InstallerConfig {
        InstallerConfig::with_defaults(&self.root)
    }

    fn descriptor(&self) -> ProjectDescriptor {
        inspect_project(&self.root).expect("inspect project")
    }

    fn editable_call(&self) -> ExpectedCall {
        ExpectedCall::new("pip", ["install", "-e", format!("{}[all]", self.root).as_str()])
    }

    fn build_call(&self) -> ExpectedCall {
        ExpectedCall::new(
            "python",
            [
                "-m",
                "build",
                "--wheel",
                "--no-isolation",
                "--outdir",
                self.dist().as_str(),
                self.root.as_str(),
            ],
        )
    }

    fn wheel_install_call(&self, wheel: &str) -> ExpectedCall {
        ExpectedCall::new(
            "pip",
            ["install", format!("{}[all]", self.dist().join(wheel)).as_str()],
        )
    }
}

fn write_project(manifest: &str) -> Project {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("UTF-8 temp dir");
    std::fs::write(root.join(PYPROJECT_FILE), manifest).expect("write manifest");
    Project { _temp: temp, root }
}

#[fixture]
fn project() -> Project {
    write_project(
        "[project]\nname = \"conversai\"\nversion = \"0.1.0\"\n\n[project.optional-dependencies]\nall = [\"torch\"]\n",
    )
}

fn upgrade_call() -> ExpectedCall {
    ExpectedCall::new("pip", ["install", "-U", "pip"])
}

fn frontend_call() -> ExpectedCall {
    ExpectedCall::new("pip", ["install", "-U", "build"])
}

fn writes_wheels(dist: Utf8PathBuf, names: &'static [&'static str]) -> impl FnOnce() + 'static {
    move || {
        std::fs::create_dir_all(&dist).expect("create dist");
        for name in names {
            std::fs::write(dist.join(name), b"wheel").expect("write wheel");
        }
    }
}

fn run_install(
    project: &Project,
    executor: &StubExecutor,
    mode: &InstallMode,
    progress: ProgressOptions,
) -> (Result<InstallReport>, String) {
    let config = project.config();
    let descriptor = project.descriptor();
    let installer = Installer::new(executor, &config, &descriptor, progress);
    let mut stderr = Vec::new();
    let result = installer.run(mode, &mut stderr);
    (result, String::from_utf8(stderr).expect("UTF-8 output"))
}

#[rstest]
#[case::default_mode(InstallMode::default())]
#[case::explicit_dev(InstallMode::from("dev"))]
fn dev_mode_upgrades_pip_then_installs_editable(project: Project, #[case] mode: InstallMode) {
    let executor = StubExecutor::new(vec![upgrade_call(), project.editable_call()]);

    let (result, output) = run_install(&project, &executor, &mode, ProgressOptions::default());

    let report = result.expect("dev install succeeds");
    executor.assert_finished();
    assert!(report.wheel.is_none());
    assert_eq!(report.package.as_deref(), Some("conversai"));
    assert!(output.contains("Installing conversai 0.1.0 in editable mode..."));
    assert!(!output.contains("Successfully installed"));
    assert!(
        report
            .success_message()
            .starts_with("Successfully installed conversai 0.1.0 in editable mode")
    );
}

#[rstest]
fn dist_mode_replaces_previous_build_output(project: Project) {
    std::fs::create_dir_all(project.dist()).expect("create stale dist");
    std::fs::write(project.dist().join("conversai-0.0.9-py3-none-any.whl"), b"old")
        .expect("write stale wheel");

    let executor = StubExecutor::new(vec![
        upgrade_call(),
        frontend_call(),
        project
            .build_call()
            .with_effect(writes_wheels(project.dist(), &[WHEEL])),
        project.wheel_install_call(WHEEL),
    ]);

    let (result, output) = run_install(
        &project,
        &executor,
        &InstallMode::from("prod"),
        ProgressOptions::default(),
    );

    let report = result.expect("wheel install succeeds");
    executor.assert_finished();
    assert_eq!(report.wheel, Some(project.dist().join(WHEEL)));
    assert_eq!(report.version.as_deref(), Some("0.1.0"));
    assert!(!project.dist().join("conversai-0.0.9-py3-none-any.whl").exists());
    assert!(output.contains("Removing previous build output"));
}

#[rstest]
fn build_without_wheel_fails_before_install(project: Project) {
    let executor = StubExecutor::new(vec![upgrade_call(), frontend_call(), project.build_call()]);

    let (result, _) = run_install(
        &project,
        &executor,
        &InstallMode::from("prod"),
        ProgressOptions::default(),
    );

    assert!(matches!(result, Err(InstallerError::NoWheelProduced { .. })));
    executor.assert_finished();
}

#[rstest]
fn build_with_several_wheels_is_ambiguous(project: Project) {
    let executor = StubExecutor::new(vec![
        upgrade_call(),
        frontend_call(),
        project.build_call().with_effect(writes_wheels(
            project.dist(),
            &[WHEEL, "conversai-0.1.0-cp310-cp310-linux_x86_64.whl"],
        )),
    ]);

    let (result, _) = run_install(
        &project,
        &executor,
        &InstallMode::from("release"),
        ProgressOptions::default(),
    );

    let Err(InstallerError::AmbiguousWheels { candidates, .. }) = result else {
        panic!("expected AmbiguousWheels");
    };
    assert_eq!(candidates.len(), 2);
    executor.assert_finished();
}

#[rstest]
fn pip_upgrade_failure_stops_the_procedure(project: Project) {
    let executor = StubExecutor::new(vec![
        upgrade_call().returning(Ok(failure_output("Could not fetch URL"))),
        project.editable_call(),
    ]);

    let (result, output) =
        run_install(&project, &executor, &InstallMode::Dev, ProgressOptions::default());

    let err = result.expect_err("upgrade failure is fatal");
    assert!(matches!(err, InstallerError::ToolUpgrade { .. }));
    assert!(err.to_string().contains("Could not fetch URL"));
    assert_eq!(executor.remaining(), 1, "editable install must not run");
    assert!(!output.contains("Successfully installed"));
}

#[rstest]
fn build_failure_is_reported_with_project(project: Project) {
    let executor = StubExecutor::new(vec![
        upgrade_call(),
        frontend_call(),
        project
            .build_call()
            .returning(Ok(failure_output("ERROR Backend subprocess exited"))),
    ]);

    let (result, _) = run_install(
        &project,
        &executor,
        &InstallMode::from("prod"),
        ProgressOptions::default(),
    );

    assert!(matches!(result, Err(InstallerError::BuildFailed { .. })));
    executor.assert_finished();
}

#[rstest]
fn isolated_environment_is_created_first(project: Project) {
    let venv = project.root.join(".venv");
    let mut config = project.config();
    config.venv = Some(venv.clone());
    let pip = crate::commands::venv_program(&venv, "pip");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("python", ["-m", "venv", "--clear", venv.as_str()]),
        ExpectedCall::new(pip.as_str(), ["install", "-U", "pip"]),
        ExpectedCall::new(
            pip.as_str(),
            ["install", "-e", format!("{}[all]", project.root).as_str()],
        ),
    ]);
    let descriptor = project.descriptor();
    let installer = Installer::new(&executor, &config, &descriptor, ProgressOptions::default());

    let report = installer
        .run(&InstallMode::Dev, &mut Vec::new())
        .expect("isolated install succeeds");

    executor.assert_finished();
    assert_eq!(report.venv, Some(venv));
}

#[rstest]
fn quiet_mode_suppresses_progress(project: Project) {
    let executor = StubExecutor::new(vec![upgrade_call(), project.editable_call()]);
    let progress = ProgressOptions {
        verbosity: 0,
        quiet: true,
    };

    let (result, output) = run_install(&project, &executor, &InstallMode::Dev, progress);

    assert!(result.is_ok());
    assert!(output.is_empty());
}

#[rstest]
fn describe_lists_wheel_branch_without_running(project: Project) {
    let executor = StubExecutor::new(Vec::new());
    let config = project.config();
    let descriptor = project.descriptor();
    let installer = Installer::new(&executor, &config, &descriptor, ProgressOptions::default());

    let steps = installer.describe(&InstallMode::from("prod"));

    assert_eq!(steps.len(), 5);
    assert_eq!(steps.first().map(String::as_str), Some("pip install -U pip"));
    assert!(steps.iter().any(|step| step.starts_with("remove ")));
    assert!(executor.received().is_empty());
}

#[test]
fn missing_build_output_is_not_an_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dist = Utf8PathBuf::try_from(temp.path().join("dist")).expect("UTF-8 path");
    assert!(remove_build_output(&dist).is_ok());
}

#[test]
fn undeclared_extras_group_logs_a_warning() {
    let mut logger = Logger::start();
    let project = write_project("[project]\nname = \"conversai\"\n");
    let executor = StubExecutor::new(vec![upgrade_call(), project.editable_call()]);

    let (result, _) = run_install(&project, &executor, &InstallMode::Dev, ProgressOptions::default());
    assert!(result.is_ok());

    let mut warned = false;
    while let Some(record) = logger.pop() {
        if record.level() == log::Level::Warn
            && record.args().to_string().contains("does not declare the `all` extras group")
        {
            warned = true;
        }
    }
    assert!(warned, "expected a warning about the missing extras group");
}

#[test]
fn install_project_rejects_directory_without_descriptor() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("UTF-8 temp dir");
    let executor = StubExecutor::new(Vec::new());
    let request = InstallRequest {
        project: root,
        ..InstallRequest::default()
    };

    let result = install_project(&executor, &request, &mut Vec::new());

    assert!(matches!(result, Err(InstallerError::ProjectNotFound { .. })));
    assert!(executor.received().is_empty());
}

#[rstest]
fn install_project_applies_overrides(project: Project) {
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("pip3", ["install", "-U", "pip"]),
        ExpectedCall::new(
            "pip3",
            ["install", "-e", format!("{}[test]", project.root).as_str()],
        ),
    ]);
    let request = InstallRequest {
        project: project.root.clone(),
        mode: InstallMode::Dev,
        overrides: crate::config::ConfigOverrides {
            pip: Some("pip3".to_owned()),
            extras: Some("test".to_owned()),
            ..Default::default()
        },
        progress: ProgressOptions::default(),
    };

    let report = install_project(&executor, &request, &mut Vec::new()).expect("install succeeds");

    executor.assert_finished();
    assert_eq!(report.extras.as_str(), "test");
}

#[test]
fn project_root_as_build_output_is_rejected_before_anything_runs() {
    let project = write_project(
        "[project]\nname = \"conversai\"\n\n[tool.conversai-install]\ndist-dir = \".\"\n",
    );
    let source = project.root.join("conversai.py");
    std::fs::write(&source, b"print('hello')").expect("write source");
    let executor = StubExecutor::new(Vec::new());
    let request = InstallRequest {
        project: project.root.clone(),
        mode: InstallMode::from("prod"),
        ..InstallRequest::default()
    };

    let result = install_project(&executor, &request, &mut Vec::new());

    assert!(matches!(
        result,
        Err(InstallerError::InvalidConfig { key: "dist-dir", .. })
    ));
    assert!(executor.received().is_empty());
    assert!(source.exists());
    assert!(project.root.join(PYPROJECT_FILE).exists());
}

#[rstest]
fn prepare_install_resolves_settings_without_running(project: Project) {
    let overrides = crate::config::ConfigOverrides {
        pip: Some("pip3".to_owned()),
        ..Default::default()
    };

    let prepared = prepare_install(&project.root, &overrides).expect("project prepares");

    assert_eq!(prepared.config.pip, "pip3");
    assert_eq!(prepared.descriptor.name(), Some("conversai"));
    assert_eq!(prepared.config.dist_path(), project.dist());
}
