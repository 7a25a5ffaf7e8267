use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::constants::{Address, Word};

/// Hit, miss and eviction counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Fixed-capacity associative store keyed by address, with strict
/// least-recently-used eviction.
///
/// The recency queue holds exactly one position per resident address, least
/// recently used at the front. Every hit (read or write) and every insertion
/// moves the address to the back.
///
/// Disabling the cache makes every read a miss and every write a no-op, but
/// preserves the resident entries: re-enabling sees the prior contents unless
/// [`Cache::flush`] was called in between.
pub struct Cache {
    capacity: usize,
    entries: HashMap<Address, Word>,
    recency: VecDeque<Address>,
    enabled: bool,
    stats: CacheStats,
}

impl Cache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
            enabled: true,
            stats: CacheStats::default(),
        }
    }

    /// Look up an address.
    ///
    /// `Some(value)` means the address is resident; it is promoted to most
    /// recently used. `None` means a miss, either because the address is
    /// absent or because the cache is disabled. A resident value of zero is a
    /// hit like any other.
    pub fn read(&mut self, address: Address) -> Option<Word> {
        if !self.enabled {
            return None;
        }

        if let Some(&value) = self.entries.get(&address) {
            self.touch(address);
            self.stats.hits += 1;
            Some(value)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Insert or update an address, promoting it to most recently used.
    ///
    /// When the cache is full, the least recently used entry is evicted
    /// first. While disabled this is a no-op.
    pub fn write(&mut self, address: Address, value: Word) {
        if !self.enabled {
            return;
        }

        if self.entries.contains_key(&address) {
            let _ = self.entries.insert(address, value);
            self.touch(address);
            return;
        }

        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                let _ = self.entries.remove(&oldest);
                self.stats.evictions += 1;
                debug!(address = oldest, "evicted least recently used entry");
            }
        }

        let _ = self.entries.insert(address, value);
        self.recency.push_back(address);
    }

    /// Move a resident address to the most recently used position
    fn touch(&mut self, address: Address) {
        if let Some(position) = self.recency.iter().position(|&a| a == address) {
            let _ = self.recency.remove(position);
        }
        self.recency.push_back(address);
    }

    /// Drop every resident entry. The enabled/disabled mode is unchanged.
    pub fn flush(&mut self) {
        self.entries.clear();
        self.recency.clear();
        debug!("cache flushed");
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of resident entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Residency check, without promoting the address
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.entries.contains_key(&address)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn capacity_bound_test() {
        let mut cache = Cache::new(3);
        for address in 0..100 {
            cache.write(address, 1);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn lru_eviction_test() {
        // inserting capacity + 1 distinct addresses evicts the first one
        let mut cache = Cache::new(2);
        cache.write(10, 1);
        cache.write(11, 2);
        cache.write(12, 3);

        assert!(!cache.contains(10));
        assert_eq!(cache.read(10), None);
        assert_eq!(cache.read(11), Some(2));
        assert_eq!(cache.read(12), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn read_promotes_test() {
        let mut cache = Cache::new(2);
        cache.write(1, 10);
        cache.write(2, 20);

        // touching 1 makes 2 the eviction victim
        assert_eq!(cache.read(1), Some(10));
        cache.write(3, 30);

        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn write_promotes_test() {
        let mut cache = Cache::new(2);
        cache.write(1, 10);
        cache.write(2, 20);

        // updating 1 refreshes its recency and does not evict
        cache.write(1, 11);
        assert_eq!(cache.len(), 2);

        cache.write(3, 30);
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert_eq!(cache.read(1), Some(11));
    }

    #[test]
    fn disabled_cache_test() {
        let mut cache = Cache::new(2);
        cache.write(1, 10);

        cache.disable();
        assert_eq!(cache.read(1), None);
        cache.write(2, 20);
        assert!(!cache.contains(2));

        // contents survive a disable/enable cycle
        cache.enable();
        assert_eq!(cache.read(1), Some(10));
    }

    #[test]
    fn flush_test() {
        let mut cache = Cache::new(2);
        cache.write(1, 10);
        cache.write(2, 20);

        cache.flush();
        assert!(cache.is_empty());
        assert_eq!(cache.read(1), None);

        // flushing while disabled also clears
        cache.write(1, 10);
        cache.disable();
        cache.flush();
        assert!(cache.is_empty());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn zero_value_hit_test() {
        // a resident zero must not look like a miss
        let mut cache = Cache::new(2);
        cache.write(5, 0);
        assert_eq!(cache.read(5), Some(0));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }
}
