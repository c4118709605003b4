//! Durable record of processed comments.
//!
//! The whole state is a single JSON document that is loaded at the start of
//! a poll cycle and replaced at the end of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Comment ids whose discussion has been handled, keyed by page id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedState {
    /// Completion time of the last full poll cycle
    #[serde(default)]
    pub last_poll_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed: BTreeMap<String, BTreeSet<String>>,
}

impl ProcessedState {
    pub fn processed_ids(&self, page_id: &str) -> BTreeSet<String> {
        self.processed.get(page_id).cloned().unwrap_or_default()
    }

    pub fn is_processed(&self, page_id: &str, comment_id: &str) -> bool {
        self.processed
            .get(page_id)
            .is_some_and(|ids| ids.contains(comment_id))
    }

    /// Record a comment id. Ids are never removed.
    pub fn mark_processed(&mut self, page_id: &str, comment_id: &str) -> bool {
        self.processed
            .entry(page_id.to_string())
            .or_default()
            .insert(comment_id.to_string())
    }

    pub fn processed_count(&self) -> usize {
        self.processed.values().map(BTreeSet::len).sum()
    }
}

/// JSON file holding the `ProcessedState`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state; a missing or unreadable file yields an empty state.
    pub fn load(&self) -> ProcessedState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", self.path.display());
                return ProcessedState::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read state file {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return ProcessedState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "State file {} is corrupt ({}); starting fresh",
                    self.path.display(),
                    e
                );
                ProcessedState::default()
            }
        }
    }

    /// Replace the stored state with `state`.
    ///
    /// Writes a sibling temporary file and renames it over the target so a
    /// crash never leaves a half-written state behind.
    pub fn save(&self, state: &ProcessedState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(state)?;
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(
            "Saved state with {} processed comment(s) to {}",
            state.processed_count(),
            self.path.display()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
