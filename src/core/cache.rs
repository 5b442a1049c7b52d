use crate::domain::model::ResourceId;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Hierarchical cache key, e.g. `["suppliers", "/api/masters/suppliers/?page=2"]`
/// or `["supplier", "7"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryKey(parts.into_iter().map(Into::into).collect())
    }

    pub fn list(collection: &str, page: Option<&str>) -> Self {
        QueryKey::new([collection, page.unwrap_or("")])
    }

    pub fn detail(singular: &str, id: ResourceId) -> Self {
        QueryKey::new([singular.to_string(), id.to_string()])
    }

    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.0.len() >= prefix.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

/// Read cache shared by every view built from the same handle. Writes never
/// patch entries; they mark them stale so the next read goes to the server.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached value only while it is fresh.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key).filter(|entry| !entry.stale)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Stores a fresh value. Stale entries are dropped here; they are only
    /// kept until the next write so callers can observe the invalidation.
    pub fn put<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries();
        entries.retain(|_, entry| !entry.stale);
        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
        Ok(())
    }

    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.entries().get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Marks every entry under `prefix` stale and returns how many were hit.
    pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let mut hits = 0;
        for (key, entry) in self.entries().iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                hits += 1;
            }
        }
        tracing::debug!("Invalidated {} cached queries under {:?}", hits, prefix);
        hits
    }

    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.entries().get(key).map(|entry| entry.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries().get(key).map(|entry| entry.fetched_at)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
