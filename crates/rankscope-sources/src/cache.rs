//! Read-through cache of validated payloads.
//!
//! Entries are immutable snapshots keyed by `(url, keyword, kind, device,
//! time bucket)`. The bucket is the wall-clock time divided by the cache
//! window, so entries expire when the window rolls over. Narrative requests
//! are never cached.

use crate::adapter::SourceRequest;
use crate::payload::SourcePayload;
use chrono::Utc;
use rankscope_core::{Device, SourceKind};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    url: String,
    keyword: String,
    kind: SourceKind,
    device: Option<Device>,
    bucket: u64,
}

/// Payload cache shared by every governor call of a process.
#[derive(Debug)]
pub struct PayloadCache {
    window: Duration,
    entries: RwLock<HashMap<CacheKey, SourcePayload>>,
}

impl PayloadCache {
    /// Cache reusing payloads within `window`. A zero window disables caching.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the cache stores anything at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.window.as_secs() > 0
    }

    /// Cached payload for `request` in the current window.
    pub async fn get(&self, request: &SourceRequest) -> Option<SourcePayload> {
        let key = self.key(request, now_secs())?;
        self.entries.read().await.get(&key).cloned()
    }

    /// Store `payload` for `request` in the current window.
    pub async fn insert(&self, request: &SourceRequest, payload: SourcePayload) {
        let now = now_secs();
        let Some(key) = self.key(request, now) else {
            return;
        };
        let mut entries = self.entries.write().await;
        entries.retain(|k, _| k.bucket == key.bucket);
        entries.insert(key, payload);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn key(&self, request: &SourceRequest, now: u64) -> Option<CacheKey> {
        let window = self.window.as_secs();
        if window == 0 || !request.is_cacheable() {
            return None;
        }
        Some(CacheKey {
            url: request.url().to_string(),
            keyword: request.keyword().to_string(),
            kind: request.kind(),
            device: request.device(),
            bucket: now / window,
        })
    }
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
