//! Lookup memoisation for Conduit queries.

use std::collections::HashMap;
use std::sync::Mutex;

/// Key/value store for memoised API lookups.
///
/// Keys are case-insensitive.
pub trait LookupCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
    fn reset(&self);
}

/// In-process [`LookupCache`] living as long as one command.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LookupCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(&key.to_lowercase()).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries().insert(key.to_lowercase(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.entries().remove(&key.to_lowercase());
    }

    fn reset(&self) {
        self.entries().clear();
    }
}
