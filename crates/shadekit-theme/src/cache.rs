//! Memoization of transformed colors.
//!
//! One entry per distinct (input color, config fingerprint) pair. Entries
//! under superseded fingerprints are never returned again; `prune_stale`
//! reclaims them when the engine swaps configs.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, info, trace};

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct TransformCacheConfig {
    /// Maximum number of cached transforms.
    pub max_entries: usize,
}

impl Default for TransformCacheConfig {
    fn default() -> Self {
        Self { max_entries: 8192 }
    }
}

/// Cache key: the normalized input color text plus the fingerprint hash of
/// the config that produced the output.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TransformKey {
    color: String,
    fingerprint: u64,
}

/// Memoization cache for the transform pipeline.
pub struct TransformCache {
    entries: RwLock<HashMap<TransformKey, String>>,
    config: TransformCacheConfig,
    stats: RwLock<TransformCacheStats>,
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct TransformCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub prunes: u64,
}

impl TransformCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl TransformCache {
    /// Create a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(TransformCacheConfig::default())
    }

    /// Create a new cache with custom configuration.
    pub fn with_config(config: TransformCacheConfig) -> Self {
        info!(max_entries = config.max_entries, "Transform cache initialized");
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            stats: RwLock::new(TransformCacheStats::default()),
        }
    }

    /// Get a cached transform result.
    pub fn get(&self, color: &str, fingerprint: u64) -> Option<String> {
        let key = TransformKey {
            color: color.to_string(),
            fingerprint,
        };
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).cloned());

        if let Ok(mut stats) = self.stats.write() {
            if found.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }

        match &found {
            Some(output) => trace!(color, output, "Transform cache hit"),
            None => trace!(color, "Transform cache miss"),
        }
        found
    }

    /// Store a transform result.
    ///
    /// When the cache is full, entries under stale fingerprints are pruned
    /// first; if every entry belongs to the active fingerprint the insert is
    /// skipped rather than evicting live entries.
    pub fn put(&self, color: &str, fingerprint: u64, output: String) {
        if self.len() >= self.config.max_entries {
            let pruned = self.prune_stale(fingerprint);
            if pruned == 0 {
                debug!(
                    max_entries = self.config.max_entries,
                    "Transform cache full, skipping insert"
                );
                return;
            }
        }

        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                TransformKey {
                    color: color.to_string(),
                    fingerprint,
                },
                output,
            );
            if let Ok(mut stats) = self.stats.write() {
                stats.insertions += 1;
            }
        }
    }

    /// Drop every entry whose fingerprint differs from `active`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_stale(&self, active: u64) -> usize {
        let mut entries = match self.entries.write() {
            Ok(e) => e,
            Err(_) => return 0,
        };

        let before = entries.len();
        entries.retain(|key, _| key.fingerprint == active);
        let pruned = before - entries.len();

        if pruned > 0 {
            if let Ok(mut stats) = self.stats.write() {
                stats.prunes += pruned as u64;
            }
            debug!(pruned, remaining = entries.len(), "Pruned stale transforms");
        }
        pruned
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        info!("Transform cache cleared");
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> TransformCacheStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_get() {
        let cache = TransformCache::new();
        cache.put("#ffffff", 1, "#181a1b".to_string());
        assert_eq!(cache.get("#ffffff", 1), Some("#181a1b".to_string()));
    }

    #[test]
    fn test_fingerprint_isolates_entries() {
        let cache = TransformCache::new();
        cache.put("#ffffff", 1, "#181a1b".to_string());
        assert_eq!(cache.get("#ffffff", 2), None);
    }

    #[test]
    fn test_prune_stale() {
        let cache = TransformCache::new();
        cache.put("#ffffff", 1, "#181a1b".to_string());
        cache.put("#000000", 1, "#e8e6e3".to_string());
        cache.put("#ffffff", 2, "#101112".to_string());

        let pruned = cache.prune_stale(2);
        assert_eq!(pruned, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("#ffffff", 2), Some("#101112".to_string()));
        assert_eq!(cache.get("#ffffff", 1), None);
    }

    #[test]
    fn test_full_cache_skips_live_insert() {
        let cache = TransformCache::with_config(TransformCacheConfig { max_entries: 2 });
        cache.put("#000001", 1, "a".to_string());
        cache.put("#000002", 1, "b".to_string());
        cache.put("#000003", 1, "c".to_string());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("#000003", 1), None);
    }

    #[test]
    fn test_full_cache_prunes_stale_first() {
        let cache = TransformCache::with_config(TransformCacheConfig { max_entries: 2 });
        cache.put("#000001", 1, "a".to_string());
        cache.put("#000002", 1, "b".to_string());
        cache.put("#000003", 2, "c".to_string());
        assert_eq!(cache.get("#000003", 2), Some("c".to_string()));
        assert_eq!(cache.get("#000001", 1), None);
    }

    #[test]
    fn test_cache_stats() {
        let cache = TransformCache::new();
        let _ = cache.get("#ffffff", 1);
        cache.put("#ffffff", 1, "#181a1b".to_string());
        let _ = cache.get("#ffffff", 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.insertions, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }
}
