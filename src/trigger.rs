//! Pipeline trigger matching.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of fully qualified branch refs.
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Repository events that can start a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Commits pushed to a branch.
    Push,
    /// A pull request targeting a branch.
    PullRequest,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
        })
    }
}

/// Events and branches that start a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Triggers {
    /// Accepted events.
    #[serde(default = "default_events")]
    pub events: Vec<TriggerEvent>,
    /// Branch patterns; a trailing `*` matches any suffix.
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
}

fn default_events() -> Vec<TriggerEvent> {
    vec![TriggerEvent::Push, TriggerEvent::PullRequest]
}

fn default_branches() -> Vec<String> {
    vec!["main".to_owned()]
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            events: default_events(),
            branches: default_branches(),
        }
    }
}

impl Triggers {
    /// Checks whether `event` on `git_ref` should start the pipeline.
    ///
    /// The ref may be a bare branch (`main`), a short ref (`heads/main`) or a
    /// full ref (`refs/heads/main`); for pull requests it names the target
    /// branch.
    ///
    /// # Examples
    ///
    /// ```
    /// use conversai_ci::trigger::{TriggerEvent, Triggers};
    ///
    /// let triggers = Triggers::default();
    /// assert!(triggers.matches(TriggerEvent::Push, "refs/heads/main"));
    /// assert!(!triggers.matches(TriggerEvent::Push, "develop"));
    /// ```
    #[must_use]
    pub fn matches(&self, event: TriggerEvent, git_ref: &str) -> bool {
        if !self.events.contains(&event) {
            return false;
        }
        let Some(branch) = branch_name(git_ref) else {
            return false;
        };
        self.branches
            .iter()
            .any(|pattern| {
                pattern
                    .strip_suffix('*')
                    .map_or_else(|| branch == pattern.as_str(), |prefix| branch.starts_with(prefix))
            })
    }
}

/// Extracts the branch name from a ref; tags and other namespaces yield `None`.
fn branch_name(git_ref: &str) -> Option<&str> {
    if let Some(branch) = git_ref.strip_prefix(BRANCH_REF_PREFIX) {
        return Some(branch);
    }
    if git_ref.starts_with("refs/") {
        return None;
    }
    if let Some(branch) = git_ref.strip_prefix("heads/") {
        return Some(branch);
    }
    if git_ref.starts_with("tags/") || git_ref.is_empty() {
        return None;
    }
    Some(git_ref)
}
