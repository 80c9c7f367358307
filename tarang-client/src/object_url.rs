//! Object URL lifecycle
//!
//! An object URL is a transient local reference that lets an in-memory audio
//! payload act as a playable media source. Each owner (the playback
//! controller, the upload preview) holds its own registry; `release` is
//! idempotent and tolerates `None`, so teardown paths never need to check
//! whether a URL is still live.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

const SCHEME_PREFIX: &str = "blob:tarang/";

/// Handle to a live in-memory payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and revokes object URLs for binary payloads
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: HashMap<ObjectUrl, Bytes>,
    acquired_total: u64,
    released_total: u64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a payload and return its URL
    pub fn acquire(&mut self, payload: Bytes) -> ObjectUrl {
        let url = ObjectUrl(format!("{}{}", SCHEME_PREFIX, Uuid::new_v4()));
        tracing::debug!(url = %url, bytes = payload.len(), "Object URL acquired");
        self.live.insert(url.clone(), payload);
        self.acquired_total += 1;
        url
    }

    /// Revoke a URL
    ///
    /// Safe on `None` and on already-released URLs. Returns true if a live
    /// URL was actually revoked.
    pub fn release(&mut self, url: Option<&ObjectUrl>) -> bool {
        let Some(url) = url else {
            return false;
        };
        if self.live.remove(url).is_some() {
            self.released_total += 1;
            tracing::debug!(url = %url, "Object URL released");
            true
        } else {
            false
        }
    }

    /// Revoke everything still live; returns how many were revoked
    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        self.released_total += count as u64;
        self.live.clear();
        count
    }

    /// Payload behind a live URL
    pub fn resolve(&self, url: &ObjectUrl) -> Option<&Bytes> {
        self.live.get(url)
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.live.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired_total
    }

    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}
