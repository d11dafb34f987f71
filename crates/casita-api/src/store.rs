// ── Keyed local storage ──
//
// Cold-start cache abstraction. Browser hosts back this with local
// storage; everything else (tests, native shells) uses `MemoryStore`.

use dashmap::DashMap;

/// A minimal persistent key/value string store.
///
/// The sync core uses this only as a cold-start cache: values are
/// JSON-serialized payloads written on successful fetches and read once at
/// service construction. Implementations that do not persist across
/// restarts are acceptable — the interface shape is the contract.
pub trait KeyedStore: Send + Sync {
    /// Read a value, `None` if absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write or overwrite a value.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory [`KeyedStore`] for non-browser hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
