use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::Dataset;
use crate::models::EnrichmentRecord;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("could not serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write checkpoint to {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Durable snapshot of enrichment progress. Every processed index has a
/// matching entry in the enrichment map, including terminal failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub processed_indices: HashSet<usize>,
    pub enrichments: HashMap<usize, EnrichmentRecord>,
}

impl CheckpointState {
    pub fn record(&mut self, index: usize, enrichment: EnrichmentRecord) {
        // Result first, index second: the processed set never claims an
        // index the map does not cover.
        self.enrichments.insert(index, enrichment);
        self.processed_indices.insert(index);
    }

    pub fn is_processed(&self, index: usize) -> bool {
        self.processed_indices.contains(&index)
    }
}

/// Whole-file checkpoint persistence. Saves replace the file atomically
/// (temp write + rename) under a lock, so concurrent callers cannot
/// interleave partial states: last writer wins on the full snapshot.
pub struct CheckpointStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last durable state, or empty when no checkpoint exists yet. A
    /// corrupt file also starts fresh rather than aborting the run.
    pub fn load(&self) -> CheckpointState {
        let _guard = self.lock.lock().unwrap();
        if !self.path.exists() {
            info!("No checkpoint found. Starting fresh.");
            return CheckpointState::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<CheckpointState>(&content) {
                Ok(state) => {
                    info!(
                        "Resumed checkpoint: {} leads already processed.",
                        state.processed_indices.len()
                    );
                    state
                }
                Err(e) => {
                    error!("Failed to parse checkpoint: {e}. Starting fresh.");
                    CheckpointState::default()
                }
            },
            Err(e) => {
                error!("Failed to read checkpoint: {e}. Starting fresh.");
                CheckpointState::default()
            }
        }
    }

    pub fn save(&self, state: &CheckpointState) -> Result<(), CheckpointError> {
        let _guard = self.lock.lock().unwrap();
        let json = serde_json::to_string(state)?;

        let display = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
                path: display.clone(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| CheckpointError::Io {
            path: display.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| CheckpointError::Io {
            path: display,
            source,
        })?;
        Ok(())
    }
}

/// Save-every-K counter. The driver still saves once more after the last
/// item so the final state always covers 100% of processed work.
pub struct CheckpointCadence {
    interval: usize,
    since_save: usize,
}

impl CheckpointCadence {
    pub fn new(interval: usize) -> Self {
        CheckpointCadence {
            interval: interval.max(1),
            since_save: 0,
        }
    }

    /// Returns true when a save is due; resets the counter when it is.
    pub fn completed_one(&mut self) -> bool {
        self.since_save += 1;
        if self.since_save >= self.interval {
            self.since_save = 0;
            true
        } else {
            false
        }
    }
}

/// Rows still needing enrichment: not yet processed and carrying a usable
/// contact name. Returns the pending row indices and how many rows were
/// skipped for having no name.
pub fn rows_to_enrich(
    dataset: &Dataset,
    state: &CheckpointState,
    name_column: &str,
) -> (Vec<usize>, usize) {
    let mut pending = Vec::new();
    let mut skipped = 0;

    for index in 0..dataset.len() {
        if state.is_processed(index) {
            continue;
        }
        match dataset.value(index, name_column) {
            Some(name) if name.to_lowercase() != "nan" => pending.push(index),
            _ => skipped += 1,
        }
    }

    (pending, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnrichmentRecord;
    use serde_json::json;

    fn record() -> EnrichmentRecord {
        EnrichmentRecord::from_search_value(&json!({
            "verified_at_company": "Yes",
            "verified_phone": "0400111222",
            "confidence": "High",
        }))
    }

    fn store_in(dir: &tempfile::TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("enrichment_checkpoint.json"))
    }

    #[test]
    fn save_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut state = CheckpointState::default();
        state.record(0, record());
        state.record(7, EnrichmentRecord::api_failure("timeout".to_string()));

        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn load_without_a_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = store_in(&dir).load();
        assert_eq!(state, CheckpointState::default());
    }

    #[test]
    fn save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut first = CheckpointState::default();
        first.record(0, record());
        store.save(&first).unwrap();

        let mut second = CheckpointState::default();
        second.record(1, record());
        store.save(&second).unwrap();

        let loaded = store.load();
        assert!(!loaded.is_processed(0));
        assert!(loaded.is_processed(1));
    }

    #[test]
    fn every_processed_index_has_an_enrichment() {
        let mut state = CheckpointState::default();
        state.record(3, EnrichmentRecord::parse_failure("bad".to_string(), "raw"));
        for index in &state.processed_indices {
            assert!(state.enrichments.contains_key(index));
        }
    }

    #[test]
    fn cadence_fires_every_k_completions() {
        let mut cadence = CheckpointCadence::new(2);
        assert!(!cadence.completed_one());
        assert!(cadence.completed_one());
        assert!(!cadence.completed_one());
        assert!(cadence.completed_one());
    }

    fn five_row_dataset() -> Dataset {
        let mut ds = Dataset::new(vec!["Contact Name".into()]);
        for name in ["Jane Doe", "Sam Lee", "Ana Kim", "Raj Patel", "Mia Wong"] {
            ds.push_row(vec![name.into()]);
        }
        ds
    }

    #[test]
    fn resume_skips_only_checkpointed_rows() {
        // Crash after item 3 completed but before a save: the durable
        // state covers the first batch of 2 only.
        let ds = five_row_dataset();
        let mut state = CheckpointState::default();
        state.record(0, record());
        state.record(1, record());

        let (pending, skipped) = rows_to_enrich(&ds, &state, "Contact Name");
        assert_eq!(pending, vec![2, 3, 4]);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn fully_processed_checkpoint_leaves_nothing_pending() {
        let ds = five_row_dataset();
        let mut state = CheckpointState::default();
        for index in 0..5 {
            state.record(index, record());
        }
        let (pending, _) = rows_to_enrich(&ds, &state, "Contact Name");
        assert!(pending.is_empty());
    }

    #[test]
    fn blank_and_nan_names_are_skipped() {
        let mut ds = Dataset::new(vec!["Contact Name".into()]);
        ds.push_row(vec!["Jane Doe".into()]);
        ds.push_row(vec!["".into()]);
        ds.push_row(vec!["NaN".into()]);

        let (pending, skipped) = rows_to_enrich(&ds, &CheckpointState::default(), "Contact Name");
        assert_eq!(pending, vec![0]);
        assert_eq!(skipped, 2);
    }
}
