//! Installer configuration resolution.
//!
//! Settings are layered with CLI flags taking precedence over environment
//! variables, which take precedence over `[tool.conversai-install]` in
//! `pyproject.toml`, which in turn override the built-in defaults.

use crate::error::{InstallerError, Result};
use crate::mode::ExtrasGroup;
use crate::project::ToolSettings;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Default packaging tool program.
pub const DEFAULT_PIP: &str = "pip";
/// Default Python interpreter.
pub const DEFAULT_PYTHON: &str = "python";
/// Default build output directory, relative to the project.
pub const DEFAULT_DIST_DIR: &str = "dist";
/// Environment variable overriding the packaging tool.
pub const PIP_ENV: &str = "CONVERSAI_PIP";
/// Environment variable overriding the Python interpreter.
pub const PYTHON_ENV: &str = "CONVERSAI_PYTHON";

/// Values supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Packaging tool program.
    pub pip: Option<String>,
    /// Python interpreter.
    pub python: Option<String>,
    /// Extras group.
    pub extras: Option<String>,
    /// Constraints file.
    pub constraint: Option<Utf8PathBuf>,
    /// Isolated virtual environment directory.
    pub venv: Option<Utf8PathBuf>,
}

/// Fully resolved installer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Project directory containing the descriptor.
    pub project_dir: Utf8PathBuf,
    /// Packaging tool used before any virtualenv is created.
    pub pip: String,
    /// Python interpreter used before any virtualenv is created.
    pub python: String,
    /// Extras group installed with the package.
    pub extras: ExtrasGroup,
    /// Build output directory, relative to the project.
    pub dist_dir: Utf8PathBuf,
    /// Constraints file passed to every dependency install.
    pub constraint: Option<Utf8PathBuf>,
    /// Isolated virtual environment directory.
    pub venv: Option<Utf8PathBuf>,
}

impl InstallerConfig {
    /// Creates a configuration with built-in defaults for `project_dir`.
    #[must_use]
    pub fn with_defaults(project_dir: &Utf8Path) -> Self {
        Self {
            project_dir: project_dir.to_owned(),
            pip: DEFAULT_PIP.to_owned(),
            python: DEFAULT_PYTHON.to_owned(),
            extras: ExtrasGroup::default(),
            dist_dir: Utf8PathBuf::from(DEFAULT_DIST_DIR),
            constraint: None,
            venv: None,
        }
    }

    /// Resolves the configuration from all layers.
    ///
    /// `env` looks up an environment variable by name; production callers
    /// use [`resolve_from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidConfig`] when a resolved value is
    /// empty or otherwise unusable.
    pub fn resolve<F>(
        project_dir: &Utf8Path,
        overrides: &ConfigOverrides,
        settings: &ToolSettings,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pip = pick(overrides.pip.clone(), env(PIP_ENV), settings.pip.clone())
            .unwrap_or_else(|| DEFAULT_PIP.to_owned());
        let python = pick(
            overrides.python.clone(),
            env(PYTHON_ENV),
            settings.python.clone(),
        )
        .unwrap_or_else(|| DEFAULT_PYTHON.to_owned());
        let extras = match overrides.extras.as_deref().or(settings.extras.as_deref()) {
            Some(name) => ExtrasGroup::new(name)?,
            None => ExtrasGroup::default(),
        };
        let dist_dir = settings
            .dist_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DIST_DIR));
        let constraint = overrides
            .constraint
            .clone()
            .or_else(|| settings.constraint.as_ref().map(|path| project_dir.join(path)));

        let config = Self {
            project_dir: project_dir.to_owned(),
            pip,
            python,
            extras,
            dist_dir,
            constraint,
            venv: overrides.venv.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the build output directory as a path under the project.
    #[must_use]
    pub fn dist_path(&self) -> Utf8PathBuf {
        self.project_dir.join(&self.dist_dir)
    }

    fn validate(&self) -> Result<()> {
        if self.pip.trim().is_empty() {
            return Err(InstallerError::InvalidConfig {
                key: "pip",
                reason: "program name is empty".to_owned(),
            });
        }
        if self.python.trim().is_empty() {
            return Err(InstallerError::InvalidConfig {
                key: "python",
                reason: "program name is empty".to_owned(),
            });
        }
        if self.dist_dir.as_str().is_empty() || self.dist_dir.is_absolute() {
            return Err(InstallerError::InvalidConfig {
                key: "dist-dir",
                reason: format!(
                    "`{}` must be a non-empty path relative to the project",
                    self.dist_dir
                ),
            });
        }
        if self
            .dist_dir
            .components()
            .any(|component| matches!(component, Utf8Component::ParentDir))
        {
            return Err(InstallerError::InvalidConfig {
                key: "dist-dir",
                reason: format!("`{}` must stay inside the project", self.dist_dir),
            });
        }
        // The wheel branch deletes this directory; it must not be the project.
        if !self
            .dist_dir
            .components()
            .any(|component| matches!(component, Utf8Component::Normal(_)))
        {
            return Err(InstallerError::InvalidConfig {
                key: "dist-dir",
                reason: format!(
                    "`{}` resolves to the project directory itself",
                    self.dist_dir
                ),
            });
        }
        Ok(())
    }
}

/// Resolves the configuration using the process environment.
///
/// # Errors
///
/// See [`InstallerConfig::resolve`].
pub fn resolve_from_env(
    project_dir: &Utf8Path,
    overrides: &ConfigOverrides,
    settings: &ToolSettings,
) -> Result<InstallerConfig> {
    InstallerConfig::resolve(project_dir, overrides, settings, |key| {
        std::env::var(key).ok()
    })
}

/// Returns the first non-blank value in precedence order.
fn pick(cli: Option<String>, env: Option<String>, file: Option<String>) -> Option<String> {
    [cli, env, file]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}
