//! Container image references.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag that never identifies a fixed image.
const FLOATING_TAG: &str = "latest";

/// A parsed `repository[:tag][@digest]` image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    /// Parses an image reference.
    ///
    /// A colon only separates a tag when it follows the last `/`, so registry
    /// ports (`registry:5000/python`) are kept in the repository.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidWorkflow`] when a component is empty
    /// or contains whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_ci::image::ImageRef;
    ///
    /// let image = ImageRef::parse("registry:5000/python:3.10.13")?;
    /// assert_eq!(image.repository(), "registry:5000/python");
    /// assert_eq!(image.tag(), Some("3.10.13"));
    /// assert!(image.is_pinned());
    /// # Ok::<(), conversai_ci::error::PipelineError>(())
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| PipelineError::InvalidWorkflow {
            source_name: "image".to_owned(),
            reason: format!("`{reference}` {reason}"),
        };

        if reference.is_empty() || reference.chars().any(char::is_whitespace) {
            return Err(invalid("is not a valid image reference"));
        }

        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_owned())),
            Some(_) => return Err(invalid("has an empty digest")),
            None => (reference, None),
        };

        let (registry_path, last) = match name.rsplit_once('/') {
            Some((prefix, last)) => (Some(prefix), last),
            None => (None, name),
        };
        let (last_name, tag) = match last.rsplit_once(':') {
            Some((_, "")) => return Err(invalid("has an empty tag")),
            Some((last_name, tag)) => (last_name, Some(tag.to_owned())),
            None => (last, None),
        };
        if last_name.is_empty() {
            return Err(invalid("has an empty repository"));
        }
        let repository = registry_path.map_or_else(
            || last_name.to_owned(),
            |prefix| format!("{prefix}/{last_name}"),
        );

        Ok(Self {
            repository,
            tag,
            digest,
        })
    }

    /// Builds a reference from a repository and tag.
    #[must_use]
    pub fn tagged(repository: &str, tag: &str) -> Self {
        Self {
            repository: repository.to_owned(),
            tag: Some(tag.to_owned()),
            digest: None,
        }
    }

    /// Returns the repository, including any registry host.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the digest, if any.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Returns whether the reference identifies a fixed image.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.digest.is_some() || self.tag.as_deref().is_some_and(|tag| tag != FLOATING_TAG)
    }

    /// Fails unless the reference is pinned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnpinnedImage`] for a missing or `latest` tag
    /// without a digest.
    pub fn require_pinned(&self) -> Result<()> {
        if self.is_pinned() {
            Ok(())
        } else {
            Err(PipelineError::UnpinnedImage {
                image: self.to_string(),
            })
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ImageRef {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.to_string()
    }
}
