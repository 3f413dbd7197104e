#![deny(warnings)]

//! Append-only, checksummed turn storage.
//!
//! The engine itself does no I/O; this crate is the collaborator that keeps
//! the per-turn snapshots. Two rules are absolute:
//!
//!   - Append only: storing a (session, turn) that already exists fails
//!     rather than overwrites. Together with the resolution guard this is
//!     what makes concurrent double-resolves safe.
//!   - Verified reads: every stored record carries a SHA-256 checksum over
//!     its canonical JSON serialization, checked before the data is trusted.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use sim_core::TurnState;

/// Errors raised at the storage boundary. All are fatal to the calling
/// request; none may be silently recovered by overwriting or trusting
/// corrupted data.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("no stored state for session {session} turn {turn}")]
    NotFound { session: String, turn: u32 },
    #[error("state already exists for session {session} turn {turn}")]
    AlreadyExists { session: String, turn: u32 },
    #[error("checksum mismatch for session {session} turn {turn}")]
    ChecksumMismatch { session: String, turn: u32 },
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// One sealed turn snapshot as stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub session_id: String,
    pub turn: u32,
    pub engine_version: String,
    pub state: TurnState,
    /// Lowercase hex SHA-256 over the canonical serialization of the
    /// fields above.
    pub checksum: String,
}

/// Canonical serialization target: field order is fixed by declaration and
/// all maps inside `TurnState` are BTree-ordered, so the bytes are
/// deterministic across platforms.
#[derive(Serialize)]
struct ChecksumPayload<'a> {
    session_id: &'a str,
    turn: u32,
    engine_version: &'a str,
    state: &'a TurnState,
}

/// SHA-256 over the canonical JSON of a record's content, lowercase hex.
pub fn compute_checksum(
    session_id: &str,
    turn: u32,
    engine_version: &str,
    state: &TurnState,
) -> Result<String, StoreError> {
    let payload = ChecksumPayload {
        session_id,
        turn,
        engine_version,
        state,
    };
    let bytes = serde_json::to_vec(&payload).map_err(|e| StoreError::Serialize(e.to_string()))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

impl TurnRecord {
    /// Seal a snapshot into a record, computing its checksum.
    pub fn seal(
        session_id: &str,
        engine_version: &str,
        state: TurnState,
    ) -> Result<Self, StoreError> {
        let checksum = compute_checksum(session_id, state.turn, engine_version, &state)?;
        Ok(Self {
            session_id: session_id.to_string(),
            turn: state.turn,
            engine_version: engine_version.to_string(),
            state,
            checksum,
        })
    }

    /// Recompute and compare the checksum; reject the record on mismatch.
    pub fn verify(&self) -> Result<(), StoreError> {
        let expected =
            compute_checksum(&self.session_id, self.turn, &self.engine_version, &self.state)?;
        if expected != self.checksum {
            return Err(StoreError::ChecksumMismatch {
                session: self.session_id.clone(),
                turn: self.turn,
            });
        }
        Ok(())
    }
}

/// Storage collaborator the session layer talks to.
pub trait StateStore {
    /// Store a sealed record. Fails with `AlreadyExists` when the
    /// (session, turn) slot is taken — never overwrites.
    fn append(&mut self, record: TurnRecord) -> Result<(), StoreError>;

    /// Load and verify a record; the checksum is checked before the data
    /// is returned.
    fn load(&self, session: &str, turn: u32) -> Result<TurnRecord, StoreError>;

    /// Highest stored turn for a session, if any.
    fn last_turn(&self, session: &str) -> Option<u32>;
}

/// In-memory store, the default collaborator for campaigns and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<(String, u32), TurnRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn append(&mut self, record: TurnRecord) -> Result<(), StoreError> {
        record.verify()?;
        let key = (record.session_id.clone(), record.turn);
        if self.records.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                session: record.session_id,
                turn: record.turn,
            });
        }
        debug!(session = %record.session_id, turn = record.turn, "turn record stored");
        self.records.insert(key, record);
        Ok(())
    }

    fn load(&self, session: &str, turn: u32) -> Result<TurnRecord, StoreError> {
        let record = self
            .records
            .get(&(session.to_string(), turn))
            .ok_or_else(|| StoreError::NotFound {
                session: session.to_string(),
                turn,
            })?;
        record.verify()?;
        Ok(record.clone())
    }

    fn last_turn(&self, session: &str) -> Option<u32> {
        self.records
            .keys()
            .filter(|(s, _)| s == session)
            .map(|(_, t)| *t)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sim_core::{ProductLine, ENGINE_VERSION};

    fn state(turn: u32) -> TurnState {
        let mut s = TurnState::campaign_start(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![ProductLine::new("auto", "Auto")],
            Decimal::new(2_000_000, 0),
        );
        s.turn = turn;
        s
    }

    #[test]
    fn sealed_record_roundtrips_and_verifies() {
        let mut store = MemoryStore::new();
        let record = TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap();
        store.append(record.clone()).unwrap();
        let loaded = store.load("s1", 1).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(store.last_turn("s1"), Some(1));
    }

    #[test]
    fn checksums_are_deterministic() {
        let a = TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap();
        let b = TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap();
        assert_eq!(a.checksum, b.checksum);
        let c = TurnRecord::seal("s1", ENGINE_VERSION, state(2)).unwrap();
        assert_ne!(a.checksum, c.checksum);
    }

    #[test]
    fn duplicate_turn_is_refused() {
        let mut store = MemoryStore::new();
        store
            .append(TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap())
            .unwrap();
        let err = store
            .append(TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::AlreadyExists {
                session: "s1".to_string(),
                turn: 1,
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn tampered_record_fails_checksum() {
        let mut store = MemoryStore::new();
        let mut record = TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap();
        record.state.budget = Decimal::new(999, 0);
        // Tampered after sealing: append refuses it outright.
        let err = store.append(record).unwrap_err();
        assert_eq!(
            err,
            StoreError::ChecksumMismatch {
                session: "s1".to_string(),
                turn: 1,
            }
        );
    }

    #[test]
    fn missing_turn_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.load("s1", 3).unwrap_err(),
            StoreError::NotFound {
                session: "s1".to_string(),
                turn: 3,
            }
        );
        assert_eq!(store.last_turn("s1"), None);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut store = MemoryStore::new();
        store
            .append(TurnRecord::seal("s1", ENGINE_VERSION, state(1)).unwrap())
            .unwrap();
        store
            .append(TurnRecord::seal("s2", ENGINE_VERSION, state(4)).unwrap())
            .unwrap();
        assert_eq!(store.last_turn("s1"), Some(1));
        assert_eq!(store.last_turn("s2"), Some(4));
        assert!(store.load("s2", 1).is_err());
    }
}
