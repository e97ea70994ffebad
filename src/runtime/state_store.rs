//! Durable per-unit state, sled-backed: state loaded from the
//! persistent store, or freshly initialised on first use, grounded on the
//! a sled-tree-per-concern
//! pattern: one DB per site, one tree, JSON-serialized values keyed by unit
//! id.

use crate::types::UnitState;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sled-backed `UnitState` store. Per-unit writes are additionally
/// serialized by a mutex as defense-in-depth beyond the dedup invariant.
pub struct StateStore {
    tree: sled::Tree,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(db_path)?;
        let tree = db.open_tree("unit_state")?;
        Ok(Self {
            tree,
            write_lock: Mutex::new(()),
        })
    }

    /// Wipe all stored state (`--reset-state`).
    pub fn reset(&self) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        self.tree.clear()?;
        Ok(())
    }

    /// Load a unit's state, creating a fresh zeroed one on first use.
    pub fn load(&self, unit_id: &str) -> Result<UnitState, StateStoreError> {
        match self.tree.get(unit_id)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(UnitState::new(unit_id)),
        }
    }

    pub fn store(&self, state: &UnitState) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let bytes = serde_json::to_vec(state)?;
        self.tree.insert(state.unit_id.as_str(), bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_unit_loads_as_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let state = store.load("fc-1").unwrap();
        assert_eq!(state.unit_id, "fc-1");
        assert!(state.last_invocation_instant.is_none());
    }

    #[test]
    fn stored_state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let mut state = UnitState::new("fc-1");
        state.record_invocation(123);
        store.store(&state).unwrap();

        let loaded = store.load("fc-1").unwrap();
        assert_eq!(loaded.last_invocation_instant, Some(123));
    }

    #[test]
    fn reset_clears_all_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        store.store(&UnitState::new("fc-1")).unwrap();
        store.reset().unwrap();
        let loaded = store.load("fc-1").unwrap();
        assert!(loaded.last_invocation_instant.is_none());
    }
}
