//! Run-scoped, write-once artifact sharing between stages.

use super::refs::ImageRef;
use crate::errors::StageError;
use parking_lot::RwLock;
use std::collections::HashMap;

const IMAGE_KEY: &str = "image";

/// Shared artifacts produced by stages for their dependents, keyed by name.
///
/// Keys are write-once: a second insert under the same key is an
/// [`StageError::ArtifactConflict`]. The bag lives for exactly one run.
#[derive(Debug, Default)]
pub struct ArtifactBag {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl ArtifactBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under a key. Fails if the key already exists.
    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) -> Result<(), StageError> {
        let key = key.into();
        let mut values = self.values.write();
        if values.contains_key(&key) {
            return Err(StageError::ArtifactConflict(key));
        }
        values.insert(key, value);
        Ok(())
    }

    /// Returns the value under a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().get(key).cloned()
    }

    /// Returns the number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if the bag holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Records the built image reference for downstream stages.
    pub fn record_image(&self, image: &ImageRef) -> Result<(), StageError> {
        let value = serde_json::to_value(image)
            .map_err(|e| StageError::Other(format!("cannot encode image ref: {e}")))?;
        self.insert(IMAGE_KEY, value)
    }

    /// Returns the image reference recorded by the build stage.
    pub fn image(&self) -> Result<ImageRef, StageError> {
        let value = self
            .get(IMAGE_KEY)
            .ok_or_else(|| StageError::MissingArtifact(IMAGE_KEY.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| StageError::Other(format!("cannot decode image ref: {e}")))
    }
}
