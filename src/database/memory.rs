//! In-memory store for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{EntityKind, Store};
use crate::core::error::IndexerResult;

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(EntityKind, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable snapshot of every document; replay tests compare these
    /// byte-for-byte.
    pub fn dump(&self) -> Vec<((EntityKind, String), Vec<u8>)> {
        self.entries
            .lock()
            .expect("memory store poisoned")
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get_raw(&self, kind: EntityKind, key: &str) -> IndexerResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("memory store poisoned");
        Ok(entries.get(&(kind, key.to_string())).cloned())
    }

    fn put_raw(&self, kind: EntityKind, key: &str, value: &[u8]) -> IndexerResult<()> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.insert((kind, key.to_string()), value.to_vec());
        Ok(())
    }
}
