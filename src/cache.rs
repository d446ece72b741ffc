//! Time-bounded memo for installed/availability probes.
//!
//! `dpkg` and `flatpak` queries are slow enough to make repeated catalog
//! queries sluggish, so probe results are cached for a short window. The
//! cache is a latency optimization, not a correctness mechanism: an expired
//! or missing entry merely triggers a fresh probe, and probes are idempotent
//! reads of system state, so last-writer-wins on concurrent updates is fine.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// How long a probe result stays trustworthy.
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// The kind of system state a probe inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// `dpkg` package database entry.
    NativePackage,
    /// Flatpak application list entry.
    SandboxedApp,
    /// Program-specific configuration marker on disk.
    CustomConfig,
}

/// A single cached probe result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// When this result was recorded.
    pub checked_at: DateTime<Utc>,
    /// When the result stops being trusted.
    pub expires_at: DateTime<Utc>,
    /// The probe outcome.
    pub value: bool,
}

impl CacheEntry {
    fn new(value: bool, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            checked_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            value,
        }
    }

    /// Check if the entry has expired based on TTL.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory store of probe results keyed by `(kind, subject)`.
///
/// Owned by the probe service instance; there is deliberately no global
/// cache, so tests get isolation by constructing a fresh one.
pub struct StatusCache {
    ttl_seconds: i64,
    entries: Mutex<HashMap<(ProbeKind, String), CacheEntry>>,
}

impl StatusCache {
    /// Create a cache with the default 300 second TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_SECONDS)
    }

    /// Create a cache with a custom TTL in seconds.
    pub fn with_ttl(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a still-valid probe result. An expired entry is treated as
    /// absent so the caller re-probes and overwrites it.
    pub fn get(&self, kind: ProbeKind, key: &str) -> Option<bool> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&(kind, key.to_string()))?;
        if entry.is_expired() {
            None
        } else {
            Some(entry.value)
        }
    }

    /// Record a probe result, replacing any previous entry for the key.
    pub fn set(&self, kind: ProbeKind, key: &str, value: bool) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            (kind, key.to_string()),
            CacheEntry::new(value, self.ttl_seconds),
        );
    }

    /// Number of stored entries, valid or expired.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_after_set_returns_value() {
        let cache = StatusCache::new();
        cache.set(ProbeKind::NativePackage, "gimp", true);
        assert_eq!(cache.get(ProbeKind::NativePackage, "gimp"), Some(true));
    }

    #[test]
    fn missing_key_returns_none() {
        let cache = StatusCache::new();
        assert_eq!(cache.get(ProbeKind::NativePackage, "gimp"), None);
    }

    #[test]
    fn expired_entry_is_absent() {
        // Zero TTL expires immediately regardless of the stored value.
        let cache = StatusCache::with_ttl(0);
        cache.set(ProbeKind::NativePackage, "gimp", true);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(cache.get(ProbeKind::NativePackage, "gimp"), None);
    }

    #[test]
    fn kinds_do_not_collide() {
        let cache = StatusCache::new();
        cache.set(ProbeKind::NativePackage, "gimp", true);
        cache.set(ProbeKind::SandboxedApp, "gimp", false);
        assert_eq!(cache.get(ProbeKind::NativePackage, "gimp"), Some(true));
        assert_eq!(cache.get(ProbeKind::SandboxedApp, "gimp"), Some(false));
        assert_eq!(cache.get(ProbeKind::CustomConfig, "gimp"), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let cache = StatusCache::new();
        cache.set(ProbeKind::CustomConfig, "GIMP", false);
        cache.set(ProbeKind::CustomConfig, "GIMP", true);
        assert_eq!(cache.get(ProbeKind::CustomConfig, "GIMP"), Some(true));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entry_expiration_flag() {
        let live = CacheEntry::new(true, 3600);
        assert!(!live.is_expired());
        let dead = CacheEntry::new(true, -1);
        assert!(dead.is_expired());
    }

    #[test]
    fn concurrent_access_does_not_corrupt_entries() {
        use std::sync::Arc;

        let cache = Arc::new(StatusCache::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                let key = format!("pkg-{}", i % 4);
                for _ in 0..100 {
                    cache.set(ProbeKind::NativePackage, &key, i % 2 == 0);
                    let _ = cache.get(ProbeKind::NativePackage, &key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // Every surviving entry is one of the four keys with a valid bool.
        assert!(cache.len() <= 4);
    }
}
