//! Identity of one triggered pipeline run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run-scoped identifiers: a generated run id plus the trigger metadata
/// (commit SHA, actor) carried through events, image tags, and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique id for this run.
    pub run_id: Uuid,

    /// The commit SHA that triggered the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,

    /// Who (or what) triggered the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates an identity with a freshly generated run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            commit_sha: None,
            actor: None,
        }
    }

    /// Sets the commit SHA.
    #[must_use]
    pub fn with_commit_sha(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    /// Sets the trigger actor.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Returns the abbreviated commit SHA (first 12 characters), if set.
    #[must_use]
    pub fn short_sha(&self) -> Option<&str> {
        self.commit_sha
            .as_deref()
            .map(|sha| match sha.char_indices().nth(12) {
                Some((idx, _)) => &sha[..idx],
                None => sha,
            })
    }
}
