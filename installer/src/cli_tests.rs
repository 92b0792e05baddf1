//! Tests for installer CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["conversai-install"]);
    assert_eq!(cli.mode, InstallMode::Dev);
    assert_eq!(cli.project, Utf8PathBuf::from("."));
    assert!(cli.pip.is_none());
    assert!(cli.venv.is_none());
    assert!(!cli.dry_run);
    assert!(!cli.json);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn omitted_mode_equals_explicit_dev() {
    let implicit = Cli::parse_from(["conversai-install"]);
    let explicit = Cli::parse_from(["conversai-install", "dev"]);
    assert_eq!(implicit.mode, explicit.mode);
}

#[rstest]
#[case::prod("prod")]
#[case::release("release")]
#[case::wheel("wheel")]
fn other_modes_select_the_wheel_branch(#[case] label: &str) {
    let cli = Cli::parse_from(["conversai-install", label]);
    assert!(!cli.mode.is_editable());
    assert_eq!(cli.mode.label(), label);
}

#[test]
fn cli_collects_overrides() {
    let cli = Cli::parse_from([
        "conversai-install",
        "--pip",
        "pip3",
        "--python",
        "python3.10",
        "--extras",
        "test",
        "--venv",
        ".venv",
        "-c",
        "constraints.txt",
    ]);
    let overrides = cli.overrides();
    assert_eq!(overrides.pip.as_deref(), Some("pip3"));
    assert_eq!(overrides.python.as_deref(), Some("python3.10"));
    assert_eq!(overrides.extras.as_deref(), Some("test"));
    assert_eq!(overrides.venv, Some(Utf8PathBuf::from(".venv")));
    assert_eq!(overrides.constraint, Some(Utf8PathBuf::from("constraints.txt")));
}

#[test]
fn cli_counts_verbosity() {
    let cli = Cli::parse_from(["conversai-install", "-vv"]);
    assert_eq!(cli.verbosity, 2);
}

#[test]
fn quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["conversai-install", "-q", "-v"]);
    assert!(result.is_err());
}

#[test]
fn project_flag_sets_directory() {
    let cli = Cli::parse_from(["conversai-install", "prod", "--project", "/src/conversai"]);
    assert_eq!(cli.project, Utf8PathBuf::from("/src/conversai"));
    assert_eq!(cli.mode, InstallMode::from("prod"));
}
