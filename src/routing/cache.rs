//! Reverse index from subscriber to registered paths.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::routing::subscriber::{SubscriberHandle, SubscriberId};

/// Paths one subscriber is registered under.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Keeps the subscriber alive so its identity cannot be reused.
    pub subscriber: SubscriberHandle,
    pub paths: Vec<String>,
}

/// A thread-safe map of subscriber identity -> registered paths.
///
/// A subscriber may hold the same path more than once if it was registered
/// twice; each registration is removed separately.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    inner: Arc<DashMap<SubscriberId, RouteEntry>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` was registered under `path`.
    pub fn add(&self, subscriber: &SubscriberHandle, path: &str) {
        self.inner
            .entry(subscriber.id())
            .or_insert_with(|| RouteEntry {
                subscriber: subscriber.clone(),
                paths: Vec::new(),
            })
            .paths
            .push(path.to_string());
    }

    /// Forget one registration of `path`. Returns false if it was unknown.
    pub fn remove(&self, subscriber: &SubscriberHandle, path: &str) -> bool {
        let id = subscriber.id();
        let removed = match self.inner.get_mut(&id) {
            Some(mut entry) => match entry.paths.iter().position(|p| p == path) {
                Some(index) => {
                    entry.paths.swap_remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };
        self.inner.remove_if(&id, |_, entry| entry.paths.is_empty());
        removed
    }

    /// Paths `subscriber` is registered under, if any.
    pub fn find(&self, subscriber: &SubscriberHandle) -> Option<Vec<String>> {
        self.inner
            .get(&subscriber.id())
            .map(|entry| entry.value().paths.clone())
    }

    /// Every registered path, sorted and de-duplicated.
    pub fn all_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .inner
            .iter()
            .flat_map(|entry| entry.value().paths.clone())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Number of distinct registered paths.
    pub fn path_count(&self) -> usize {
        let mut paths = HashSet::new();
        for entry in self.inner.iter() {
            paths.extend(entry.value().paths.iter().cloned());
        }
        paths.len()
    }

    /// Number of subscribers with at least one registration.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}
