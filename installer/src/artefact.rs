//! Wheel discovery and naming.
//!
//! After a build the output directory must contain exactly one wheel. Zero
//! or several matches fail loudly instead of silently picking one, and the
//! candidates are sorted so the diagnostic does not depend on directory
//! iteration order.

use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Serialize;

/// File extension of wheel archives.
pub const WHEEL_EXTENSION: &str = "whl";

/// Components parsed from a wheel filename.
///
/// Wheel names follow `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`.
///
/// # Examples
///
/// ```
/// use conversai_installer::artefact::WheelName;
///
/// let wheel = WheelName::parse("conversai-0.1.0rc0-py3-none-any.whl")?;
/// assert_eq!(wheel.distribution(), "conversai");
/// assert_eq!(wheel.version(), "0.1.0rc0");
/// assert_eq!(wheel.tag(), "py3-none-any");
/// # Ok::<(), conversai_installer::error::InstallerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelName {
    distribution: String,
    version: String,
    build: Option<String>,
    python: String,
    abi: String,
    platform: String,
}

impl WheelName {
    /// Parses a wheel filename.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidWheelName`] when the name lacks the
    /// `.whl` extension or does not have five or six dash-separated fields.
    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = |reason: &str| InstallerError::InvalidWheelName {
            name: file_name.to_owned(),
            reason: reason.to_owned(),
        };

        let stem = file_name
            .strip_suffix(".whl")
            .ok_or_else(|| invalid("missing .whl extension"))?;
        let parts: Vec<&str> = stem.split('-').collect();

        let (distribution, version, build, python, abi, platform) = match parts.as_slice() {
            [distribution, version, python, abi, platform] => {
                (distribution, version, None, python, abi, platform)
            }
            [distribution, version, build, python, abi, platform] => {
                (distribution, version, Some(build), python, abi, platform)
            }
            _ => return Err(invalid("expected name-version[-build]-python-abi-platform")),
        };

        if [distribution, version, python, abi, platform]
            .iter()
            .any(|part| part.is_empty())
        {
            return Err(invalid("empty filename component"));
        }
        if build.is_some_and(|tag| !tag.starts_with(|c: char| c.is_ascii_digit())) {
            return Err(invalid("build tag must start with a digit"));
        }

        Ok(Self {
            distribution: (*distribution).to_owned(),
            version: (*version).to_owned(),
            build: build.map(|tag| (*tag).to_owned()),
            python: (*python).to_owned(),
            abi: (*abi).to_owned(),
            platform: (*platform).to_owned(),
        })
    }

    /// Returns the distribution name (underscores as written in the file).
    #[must_use]
    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the optional build tag.
    #[must_use]
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Returns the compatibility tag `python-abi-platform`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}-{}-{}", self.python, self.abi, self.platform)
    }
}

/// A wheel selected for installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelArtefact {
    /// Location of the wheel.
    pub path: Utf8PathBuf,
    /// Parsed filename components.
    pub name: WheelName,
}

/// Lists wheel files directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns an error when the directory cannot be read or contains a wheel
/// whose path is not valid UTF-8.
pub fn find_wheels(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let pattern = format!(
        "{}/*.{WHEEL_EXTENSION}",
        glob::Pattern::escape(dir.as_str())
    );
    let entries = glob::glob(&pattern).map_err(|err| InstallerError::InvalidConfig {
        key: "dist-dir",
        reason: err.to_string(),
    })?;

    let mut wheels = Vec::new();
    for entry in entries {
        let path = entry.map_err(std::io::Error::from)?;
        if !path.is_file() {
            continue;
        }
        let utf8 = Utf8PathBuf::try_from(path).map_err(|err| InstallerError::InvalidWheelName {
            name: err.as_path().display().to_string(),
            reason: "path is not valid UTF-8".to_owned(),
        })?;
        wheels.push(utf8);
    }
    wheels.sort();
    debug!("found {} wheel(s) in {dir}", wheels.len());
    Ok(wheels)
}

/// Selects the single wheel from `candidates`.
///
/// # Errors
///
/// Returns [`InstallerError::NoWheelProduced`] for an empty list,
/// [`InstallerError::AmbiguousWheels`] for more than one candidate, and
/// [`InstallerError::InvalidWheelName`] when the sole candidate is misnamed.
pub fn select_wheel(dir: &Utf8Path, mut candidates: Vec<Utf8PathBuf>) -> Result<WheelArtefact> {
    candidates.sort();
    match candidates.as_slice() {
        [] => Err(InstallerError::NoWheelProduced {
            dir: dir.to_owned(),
        }),
        [only] => {
            let file_name = only.file_name().unwrap_or(only.as_str());
            let name = WheelName::parse(file_name)?;
            Ok(WheelArtefact {
                path: only.clone(),
                name,
            })
        }
        _ => Err(InstallerError::AmbiguousWheels {
            dir: dir.to_owned(),
            candidates,
        }),
    }
}

/// Finds and selects the single wheel in `dir`.
///
/// # Errors
///
/// See [`find_wheels`] and [`select_wheel`].
pub fn locate_wheel(dir: &Utf8Path) -> Result<WheelArtefact> {
    select_wheel(dir, find_wheels(dir)?)
}
