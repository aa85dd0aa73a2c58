//! Durable address store abstraction.
//!
//! [`StoreGateway`] is the only thing the scan engine knows about persistence:
//! an idempotent insert-if-absent keyed on the address within one
//! classification's collection, plus a count used for reporting. The
//! [`MemoryStore`] backend keeps everything in process and backs `--dry-run`;
//! the MongoDB backend lives in [`crate::mongo`].
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{address::Address, classify::Classification};

pub const DEFAULT_DATABASE: &str = "ip_database";
pub const PUBLIC_COLLECTION: &str = "public_ips";
pub const PRIVATE_COLLECTION: &str = "private_ips";

/// Name of the collection holding records of the given classification.
pub fn collection_name(classification: Classification) -> &'static str {
    match classification {
        Classification::Public => PUBLIC_COLLECTION,
        Classification::Private => PRIVATE_COLLECTION,
    }
}

/// Document shape persisted per distinct address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub ip: String,
    #[serde(rename = "type")]
    pub classification: Classification,
    /// Reserved; always null.
    pub first_seen: Option<String>,
}

impl StoredRecord {
    pub fn new(classification: Classification, addr: &Address) -> Self {
        Self {
            ip: addr.to_string(),
            classification,
            first_seen: None,
        }
    }
}

/// Result of a successful insert-if-absent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This call created the record.
    Inserted,
    /// A record for the address already existed.
    AlreadyExists,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store configuration: {0}")]
    Config(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store not connected")]
    NotConnected,
    #[error("{op} failed for {target}: {reason}")]
    Operation {
        op: &'static str,
        target: String,
        reason: String,
    },
}

/// Persistence seam used by the scan engine.
///
/// `connect` must succeed before `insert_if_absent` or `count` are called.
/// `close` may be called at any time, including when `connect` never ran or
/// failed. Inserts and counts take `&self` so independent scans can share one
/// connected store; uniqueness is enforced by the store, not the caller.
pub trait StoreGateway {
    fn connect(&mut self) -> Result<(), StoreError>;

    fn insert_if_absent(
        &self,
        classification: Classification,
        addr: &Address,
    ) -> Result<InsertOutcome, StoreError>;

    fn count(&self, classification: Classification) -> Result<u64, StoreError>;

    fn close(&mut self);
}

#[derive(Debug, Default)]
struct MemoryState {
    connected: bool,
    collections: HashMap<Classification, HashSet<Address>>,
    insert_calls: HashMap<Address, usize>,
    close_calls: usize,
}

/// In-process store with the same uniqueness semantics as the durable one.
///
/// Also records how it was driven (insert calls per address, close calls) and
/// can be told to fail, which the engine tests rely on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unavailable: bool,
    failing: HashSet<Address>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `connect` always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Make every insert for `addr` fail with a `StoreError`.
    pub fn fail_inserts_for(mut self, addr: Address) -> Self {
        self.failing.insert(addr);
        self
    }

    /// Pre-populate a record as if written by an earlier run.
    pub fn seed(&self, classification: Classification, addr: Address) {
        self.lock()
            .collections
            .entry(classification)
            .or_default()
            .insert(addr);
    }

    /// Number of `insert_if_absent` calls made for `addr`, including failed ones.
    pub fn insert_calls(&self, addr: &Address) -> usize {
        self.lock().insert_calls.get(addr).copied().unwrap_or(0)
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn contains(&self, classification: Classification, addr: &Address) -> bool {
        self.lock()
            .collections
            .get(&classification)
            .is_some_and(|set| set.contains(addr))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // every mutation is a single set/map insert, so a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StoreGateway for MemoryStore {
    fn connect(&mut self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        self.lock().connected = true;
        Ok(())
    }

    fn insert_if_absent(
        &self,
        classification: Classification,
        addr: &Address,
    ) -> Result<InsertOutcome, StoreError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        *state.insert_calls.entry(*addr).or_insert(0) += 1;
        if self.failing.contains(addr) {
            return Err(StoreError::Operation {
                op: "insert",
                target: addr.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        if state
            .collections
            .entry(classification)
            .or_default()
            .insert(*addr)
        {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    fn count(&self, classification: Classification) -> Result<u64, StoreError> {
        let state = self.lock();
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        Ok(state
            .collections
            .get(&classification)
            .map_or(0, |set| set.len() as u64))
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.connected = false;
        state.close_calls += 1;
    }
}
