//! In-memory response cache
//!
//! Entries are keyed by a structured [`RequestKey`] rather than a string
//! built from method, URL and body, so distinct requests never collide.
//! Freshness is decided at lookup time against the caller's max age. Each
//! entry also keeps the max age it was stored with, and `insert` sweeps out
//! entries past theirs, so one-off URLs do not pile up.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::transport::Method;

/// Identity of a request for caching and in-flight deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
    /// Serialized JSON body
    pub body: Option<String>,
}

impl RequestKey {
    pub fn new(method: Method, url: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body,
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone)]
struct CachedResponse {
    body: Value,
    fetched_at: Instant,
    max_age: Duration,
}

impl CachedResponse {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.elapsed() < max_age
    }
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<RequestKey, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached body if it is younger than `max_age`; a stale entry is dropped
    pub fn get(&mut self, key: &RequestKey, max_age: Duration) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(max_age) {
            return Some(entry.body.clone());
        }
        self.entries.remove(key);
        None
    }

    /// Store `body`, first sweeping entries older than their own max age
    pub fn insert(&mut self, key: RequestKey, body: Value, max_age: Duration) {
        self.prune();
        self.entries.insert(
            key,
            CachedResponse {
                body,
                fetched_at: Instant::now(),
                max_age,
            },
        );
    }

    /// Drop every entry past the max age it was stored with
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(entry.max_age));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.entries.keys().map(ToString::to_string).collect();
        keys.sort();
        CacheStats {
            entries: self.entries.len(),
            keys,
        }
    }
}
