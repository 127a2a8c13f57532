//! Auto-strategy decision cache (§4.3's `Auto` strategy): remembers which
//! `Strategy` was chosen for documents with a matching size bucket,
//! structure fingerprint, and options fingerprint, skipping re-analysis.
//!
//! Generalized from `the_agency`'s SQLite-backed `LlmCache`: same
//! hash-key idiom, but in-memory and FIFO-evicted rather than
//! TTL-expired, since auto-strategy decisions are cheap to recompute and
//! don't need cross-process persistence.

use crate::config::Strategy;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Caching configuration for the `Auto` strategy's decision cache.
#[derive(Debug, Clone)]
pub struct AutoStrategyCacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AutoStrategyCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// Inputs that determine an `Auto` strategy decision, hashed into a single
/// cache key. Two documents with the same bucket/fingerprints are assumed
/// to analyze to the same strategy.
pub struct AutoStrategyCacheKey<'a> {
    pub document_size_bucket: &'a str,
    pub structure_fingerprint: &'a str,
    pub options_fingerprint: &'a str,
}

fn hash_key(key: &AutoStrategyCacheKey<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.document_size_bucket.hash(&mut hasher);
    key.structure_fingerprint.hash(&mut hasher);
    key.options_fingerprint.hash(&mut hasher);
    hasher.finish()
}

/// Bucket a document's char length into coarse size classes, so documents
/// of similar scale share a cache entry instead of each needing its own.
pub fn size_bucket(char_count: usize) -> &'static str {
    match char_count {
        0..=1_000 => "tiny",
        1_001..=10_000 => "small",
        10_001..=100_000 => "medium",
        100_001..=1_000_000 => "large",
        _ => "huge",
    }
}

/// A coarse fingerprint of a document's structural shape: presence of
/// tables/code/headings and rough heading density.
pub fn structure_fingerprint(has_tables: bool, has_code: bool, heading_count: usize, char_count: usize) -> String {
    let density = if char_count == 0 {
        0
    } else {
        (heading_count * 10_000 / char_count).min(9999)
    };
    format!("t{}c{}h{}d{}", has_tables as u8, has_code as u8, heading_count.min(999), density)
}

/// In-memory, process-wide cache of `Auto` strategy decisions. Synchronized
/// with a single mutex since decisions are cheap and contention is
/// expected to be low (§5: "process-wide with init-on-first-use").
pub struct AutoStrategyCache {
    config: AutoStrategyCacheConfig,
    entries: Mutex<HashMap<u64, Strategy>>,
    order: Mutex<VecDeque<u64>>,
}

impl AutoStrategyCache {
    pub fn new(config: AutoStrategyCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, key: &AutoStrategyCacheKey<'_>) -> Option<Strategy> {
        if !self.config.enabled {
            return None;
        }
        let hashed = hash_key(key);
        self.entries.lock().unwrap().get(&hashed).copied()
    }

    pub fn put(&self, key: &AutoStrategyCacheKey<'_>, strategy: Strategy) {
        if !self.config.enabled {
            return;
        }
        let hashed = hash_key(key);
        let mut entries = self.entries.lock().unwrap();
        let mut order = self.order.lock().unwrap();

        if !entries.contains_key(&hashed) {
            while entries.len() >= self.config.max_entries {
                if let Some(oldest) = order.pop_front() {
                    entries.remove(&oldest);
                } else {
                    break;
                }
            }
            order.push_back(hashed);
        }
        entries.insert(hashed, strategy);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AutoStrategyCache {
    fn default() -> Self {
        Self::new(AutoStrategyCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_retrieves_a_decision() {
        let cache = AutoStrategyCache::default();
        let key = AutoStrategyCacheKey {
            document_size_bucket: "small",
            structure_fingerprint: "t0c0h2d10",
            options_fingerprint: "default",
        };
        assert!(cache.get(&key).is_none());
        cache.put(&key, Strategy::Intelligent);
        assert_eq!(cache.get(&key), Some(Strategy::Intelligent));
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache = AutoStrategyCache::new(AutoStrategyCacheConfig {
            enabled: false,
            max_entries: 10,
        });
        let key = AutoStrategyCacheKey {
            document_size_bucket: "small",
            structure_fingerprint: "fp",
            options_fingerprint: "opts",
        };
        cache.put(&key, Strategy::FixedSize);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn evicts_oldest_entry_once_full() {
        let cache = AutoStrategyCache::new(AutoStrategyCacheConfig {
            enabled: true,
            max_entries: 2,
        });
        let k1 = AutoStrategyCacheKey {
            document_size_bucket: "a",
            structure_fingerprint: "a",
            options_fingerprint: "a",
        };
        let k2 = AutoStrategyCacheKey {
            document_size_bucket: "b",
            structure_fingerprint: "b",
            options_fingerprint: "b",
        };
        let k3 = AutoStrategyCacheKey {
            document_size_bucket: "c",
            structure_fingerprint: "c",
            options_fingerprint: "c",
        };
        cache.put(&k1, Strategy::FixedSize);
        cache.put(&k2, Strategy::Paragraph);
        cache.put(&k3, Strategy::Semantic);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&k1).is_none());
    }

    #[test]
    fn size_bucket_classifies_by_length() {
        assert_eq!(size_bucket(500), "tiny");
        assert_eq!(size_bucket(50_000), "medium");
        assert_eq!(size_bucket(2_000_000), "huge");
    }
}
