use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;

use super::domain::{PendingResult, SlotKey};

/// Storage abstraction for buffered callback results so the service and
/// router can be exercised against fakes.
///
/// Implementations must provide a single mutual-exclusion domain for the
/// whole store: a consuming `get` removes the entry during the same critical
/// section as the read, so of two racing consumers exactly one observes the
/// payload.
pub trait ResultStore: Send + Sync {
    /// Store a payload, overwriting any existing entry for the key.
    fn put(&self, key: SlotKey, payload: Value) -> Result<PendingResult, StoreError>;

    /// Return the stored result, removing it as part of the read when
    /// `consume` is set.
    fn get(&self, key: &SlotKey, consume: bool) -> Result<Option<PendingResult>, StoreError>;

    /// Remove the entry unconditionally. Deleting an absent key is a no-op.
    fn delete(&self, key: &SlotKey) -> Result<(), StoreError>;
}

/// Error enumeration for store failures. The in-memory store never fails;
/// the variant exists for fallible backends behind the same trait.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store: one mutex over one map, covering the singleton slot
/// and every request-keyed slot. Nothing survives process restart.
#[derive(Default)]
pub struct InMemoryResultStore {
    slots: Mutex<HashMap<SlotKey, PendingResult>>,
}

impl ResultStore for InMemoryResultStore {
    fn put(&self, key: SlotKey, payload: Value) -> Result<PendingResult, StoreError> {
        let record = PendingResult {
            payload,
            received_at: Utc::now(),
        };
        let mut guard = self.slots.lock().expect("result store mutex poisoned");
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn get(&self, key: &SlotKey, consume: bool) -> Result<Option<PendingResult>, StoreError> {
        let mut guard = self.slots.lock().expect("result store mutex poisoned");
        if consume {
            Ok(guard.remove(key))
        } else {
            Ok(guard.get(key).cloned())
        }
    }

    fn delete(&self, key: &SlotKey) -> Result<(), StoreError> {
        let mut guard = self.slots.lock().expect("result store mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}
