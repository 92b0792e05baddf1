//! Project descriptor inspection.
//!
//! Before any command runs, the installer checks that the project directory
//! carries a packaging descriptor. `pyproject.toml` is parsed for the package
//! name, version, declared extras groups and the installer's own
//! `[tool.conversai-install]` settings; a bare `setup.py` is accepted without
//! further inspection.

use crate::error::{InstallerError, Result};
use crate::mode::ExtrasGroup;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the declarative project manifest.
pub const PYPROJECT_FILE: &str = "pyproject.toml";
/// File name of the legacy setuptools script.
pub const SETUP_PY_FILE: &str = "setup.py";

/// Which descriptor the project provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// A `pyproject.toml` manifest.
    Pyproject,
    /// A `setup.py` script without a `pyproject.toml`.
    SetupPy,
}

/// Installer settings stored under `[tool.conversai-install]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ToolSettings {
    /// Packaging tool program.
    pub pip: Option<String>,
    /// Python interpreter used for the build frontend and virtualenvs.
    pub python: Option<String>,
    /// Extras group to install.
    pub extras: Option<String>,
    /// Build output directory, relative to the project.
    pub dist_dir: Option<Utf8PathBuf>,
    /// Constraints file passed to pip, relative to the project.
    pub constraint: Option<Utf8PathBuf>,
}

/// What the installer learned from the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    kind: DescriptorKind,
    root: Utf8PathBuf,
    name: Option<String>,
    version: Option<String>,
    extras: Vec<String>,
    dynamic_extras: bool,
    settings: ToolSettings,
}

impl ProjectDescriptor {
    /// Returns the descriptor kind.
    #[must_use]
    pub const fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Returns the project directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the declared package name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the declared static version, if known.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the statically declared extras groups.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Returns the `[tool.conversai-install]` settings.
    #[must_use]
    pub const fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Returns a display name for progress output.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name.clone(),
            _ => self.root.to_string(),
        }
    }

    /// Reports whether `extras` is known to be declared.
    ///
    /// Returns `None` when the descriptor cannot tell: `setup.py` projects and
    /// manifests listing `optional-dependencies` as dynamic.
    #[must_use]
    pub fn declares_extras(&self, extras: &ExtrasGroup) -> Option<bool> {
        if self.kind == DescriptorKind::SetupPy || self.dynamic_extras {
            return None;
        }
        Some(self.extras.iter().any(|declared| extras.matches(declared)))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Pyproject {
    #[serde(default)]
    project: Option<ProjectTable>,
    #[serde(default)]
    tool: Option<ToolTable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProjectTable {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    dynamic: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolTable {
    #[serde(rename = "conversai-install", default)]
    conversai_install: Option<ToolSettings>,
}

/// Inspects the project directory and returns its descriptor.
///
/// # Errors
///
/// Returns [`InstallerError::ProjectNotFound`] when neither descriptor file
/// exists, [`InstallerError::InvalidManifest`] when `pyproject.toml` cannot
/// be parsed, and [`InstallerError::Io`] when it cannot be read.
pub fn inspect_project(root: &Utf8Path) -> Result<ProjectDescriptor> {
    let pyproject_path = root.join(PYPROJECT_FILE);
    if pyproject_path.is_file() {
        let contents = std::fs::read_to_string(&pyproject_path)?;
        return parse_pyproject(root, &pyproject_path, &contents);
    }

    if root.join(SETUP_PY_FILE).is_file() {
        return Ok(ProjectDescriptor {
            kind: DescriptorKind::SetupPy,
            root: root.to_owned(),
            name: None,
            version: None,
            extras: Vec::new(),
            dynamic_extras: false,
            settings: ToolSettings::default(),
        });
    }

    Err(InstallerError::ProjectNotFound {
        path: root.to_owned(),
    })
}

fn parse_pyproject(
    root: &Utf8Path,
    manifest_path: &Utf8Path,
    contents: &str,
) -> Result<ProjectDescriptor> {
    let parsed: Pyproject =
        toml::from_str(contents).map_err(|err| InstallerError::InvalidManifest {
            path: manifest_path.to_owned(),
            reason: err.message().to_owned(),
        })?;

    let project = parsed.project.unwrap_or_default();
    let settings = parsed
        .tool
        .and_then(|tool| tool.conversai_install)
        .unwrap_or_default();
    let dynamic_extras = project
        .dynamic
        .iter()
        .any(|field| field == "optional-dependencies");

    Ok(ProjectDescriptor {
        kind: DescriptorKind::Pyproject,
        root: root.to_owned(),
        name: project.name,
        version: project.version,
        extras: project.optional_dependencies.into_keys().collect(),
        dynamic_extras,
        settings,
    })
}
