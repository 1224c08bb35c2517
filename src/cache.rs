//! Process-wide caches shared by concurrent resolutions.
//!
//! Both caches tolerate stale reads: an expired token is simply exchanged
//! again, an outdated preview is at worst a slightly different snippet.
//! Locks are plain `std` mutexes held only for map operations, never
//! across an await.

use crate::models::PreviewAsset;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tokens are reused only while at least this much lifetime remains.
pub const TOKEN_EXPIRY_MARGIN_MS: i64 = 20_000;

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Cached data is always safe to reuse or overwrite after a panic elsewhere.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at_ms: i64,
}

/// Single-slot access token cache.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, now_ms: i64) -> Option<String> {
        let slot = lock(&self.slot);
        slot.as_ref()
            .filter(|t| now_ms + TOKEN_EXPIRY_MARGIN_MS < t.expires_at_ms)
            .map(|t| t.token.clone())
    }

    pub fn store(&self, token: String, expires_at_ms: i64) {
        *lock(&self.slot) = Some(CachedToken {
            token,
            expires_at_ms,
        });
    }
}

/// Outcome of a completed preview search.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewLookup {
    Found(PreviewAsset),
    NoMatch,
}

#[derive(Debug, Default)]
struct PreviewEntries {
    map: HashMap<String, (PreviewLookup, i64)>,
    order: VecDeque<String>,
}

/// Bounded "title::artist" -> preview cache with a time-to-live.
/// Oldest insertions are evicted first once `capacity` is exceeded.
pub struct PreviewCache {
    entries: Mutex<PreviewEntries>,
    capacity: usize,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl PreviewCache {
    pub fn new(capacity: usize, ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(PreviewEntries::default()),
            capacity: capacity.max(1),
            ttl_ms,
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<PreviewLookup> {
        let now = self.clock.now_ms();
        let mut entries = lock(&self.entries);
        let (lookup, stored_at) = entries.map.get(key)?.clone();
        if now - stored_at >= self.ttl_ms {
            entries.map.remove(key);
            entries.order.retain(|k| k != key);
            return None;
        }
        Some(lookup)
    }

    pub fn insert(&self, key: String, lookup: PreviewLookup) {
        let now = self.clock.now_ms();
        let mut entries = lock(&self.entries);
        if entries.map.insert(key.clone(), (lookup, now)).is_some() {
            // a rewrite counts as the newest insertion
            entries.order.retain(|k| k != &key);
        }
        entries.order.push_back(key);
        while entries.map.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.map.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(n: u32) -> PreviewLookup {
        PreviewLookup::Found(PreviewAsset {
            stream_url: format!("https://cdn/{n}.mp3"),
            duration_sec: 30.0,
            cover_url: None,
        })
    }

    #[test]
    fn token_respects_expiry_margin() {
        let cache = TokenCache::new();
        assert_eq!(cache.get(0), None);
        cache.store("tok".into(), 100_000);
        assert_eq!(cache.get(79_999).as_deref(), Some("tok"));
        assert_eq!(cache.get(80_000), None);
    }

    #[test]
    fn preview_cache_evicts_oldest() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = PreviewCache::new(2, 60_000, clock);
        cache.insert("a::x".into(), asset(1));
        cache.insert("b::x".into(), PreviewLookup::NoMatch);
        cache.insert("c::x".into(), asset(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a::x"), None);
        assert_eq!(cache.get("b::x"), Some(PreviewLookup::NoMatch));
        assert_eq!(cache.get("c::x"), Some(asset(3)));
    }

    #[test]
    fn rewritten_key_moves_to_back_of_eviction_order() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = PreviewCache::new(2, 60_000, clock);
        cache.insert("a::x".into(), PreviewLookup::NoMatch);
        cache.insert("b::x".into(), PreviewLookup::NoMatch);
        cache.insert("a::x".into(), asset(1));
        cache.insert("c::x".into(), asset(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b::x"), None);
        assert_eq!(cache.get("a::x"), Some(asset(1)));
        assert_eq!(cache.get("c::x"), Some(asset(3)));
    }

    #[test]
    fn preview_cache_entries_expire() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = PreviewCache::new(10, 5_000, clock.clone());
        cache.insert("k".into(), asset(1));
        clock.advance(4_999);
        assert!(cache.get("k").is_some());
        clock.advance(1);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());

        // re-inserting an expired key must not leave a stale eviction slot behind
        cache.insert("k".into(), asset(2));
        assert_eq!(cache.get("k"), Some(asset(2)));
    }
}
