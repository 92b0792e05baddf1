//! Install modes and extras groups.

use crate::error::{InstallerError, Result};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The mode label that selects an editable install.
pub const DEV_MODE: &str = "dev";

/// How the project is installed.
///
/// Only the literal `dev` is distinguished; every other label selects the
/// wheel build. The label is kept so progress output can echo it.
///
/// # Examples
///
/// ```
/// use conversai_installer::mode::InstallMode;
///
/// assert_eq!("dev".parse::<InstallMode>(), Ok(InstallMode::Dev));
/// assert_eq!(InstallMode::default(), InstallMode::Dev);
/// assert!(!"prod".parse::<InstallMode>().expect("infallible").is_editable());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallMode {
    /// Editable install of the working tree.
    #[default]
    Dev,
    /// Build a wheel and install it.
    Dist {
        /// The label the mode was selected with.
        label: String,
    },
}

impl InstallMode {
    /// Returns true when the project is installed in editable mode.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Dev)
    }

    /// Returns the label the mode was selected with.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Dev => DEV_MODE,
            Self::Dist { label } => label,
        }
    }
}

impl From<&str> for InstallMode {
    fn from(label: &str) -> Self {
        if label == DEV_MODE {
            Self::Dev
        } else {
            Self::Dist {
                label: label.to_owned(),
            }
        }
    }
}

impl FromStr for InstallMode {
    type Err = Infallible;

    fn from_str(label: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(label))
    }
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The default optional-dependency group installed alongside the package.
pub const DEFAULT_EXTRAS: &str = "all";

/// A validated extras group name.
///
/// Names follow the packaging rules for extras: ASCII letters, digits, `-`,
/// `_` and `.`, starting and ending with a letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtrasGroup(String);

impl ExtrasGroup {
    /// Validates and wraps an extras group name.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidConfig`] when the name is empty or
    /// contains characters not permitted in extras names.
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let valid_body = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        let valid_edges = trimmed
            .chars()
            .next()
            .zip(trimmed.chars().last())
            .is_some_and(|(first, last)| {
                first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric()
            });

        if valid_body && valid_edges {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(InstallerError::InvalidConfig {
                key: "extras",
                reason: format!("`{name}` is not a valid extras group name"),
            })
        }
    }

    /// Returns the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the requirement specifier `target[group]` for pip.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_installer::mode::ExtrasGroup;
    ///
    /// let extras = ExtrasGroup::default();
    /// assert_eq!(extras.requirement("."), ".[all]");
    /// ```
    #[must_use]
    pub fn requirement(&self, target: &str) -> String {
        format!("{target}[{}]", self.0)
    }

    /// Returns true when `declared` names this group.
    ///
    /// Comparison uses the normalised form, so `Dev_Tools` matches
    /// `dev-tools`.
    #[must_use]
    pub fn matches(&self, declared: &str) -> bool {
        normalise_extra(&self.0) == normalise_extra(declared)
    }
}

impl Default for ExtrasGroup {
    fn default() -> Self {
        Self(DEFAULT_EXTRAS.to_owned())
    }
}

impl fmt::Display for ExtrasGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalise_extra(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}
