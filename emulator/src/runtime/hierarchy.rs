use tracing::trace;

use super::cache::Cache;
use super::memory::{MemoryBus, MemoryError};
use crate::constants::{Address, Word};

/// The two-level memory hierarchy the execution engine reads and writes
/// through: an LRU [`Cache`] logically in front of a flat [`MemoryBus`].
pub struct MemoryHierarchy {
    pub cache: Cache,
    pub bus: MemoryBus,
}

impl MemoryHierarchy {
    pub(crate) fn new(cache_capacity: usize, memory_size: usize) -> Self {
        Self {
            cache: Cache::new(cache_capacity),
            bus: MemoryBus::new(memory_size),
        }
    }

    /// Read a word, cache first. Returns the value and whether it was a
    /// cache hit.
    ///
    /// On a miss (including while the cache is disabled) the word is read
    /// from the bus and promoted into the cache; the promotion is a no-op
    /// while disabled.
    ///
    /// # Errors
    ///
    /// Fails if the address is out of bounds.
    pub fn load(&mut self, address: Address) -> Result<(Word, bool), MemoryError> {
        if let Some(value) = self.cache.read(address) {
            trace!(address, value, "cache hit");
            return Ok((value, true));
        }

        let value = self.bus.read(address)?;
        trace!(address, value, "cache miss");
        self.cache.write(address, value);
        Ok((value, false))
    }

    /// Write-through: the bus is always updated, so backing memory stays
    /// current whatever the cache state. The bus write goes first so that a
    /// faulting store leaves no cache entry behind.
    ///
    /// # Errors
    ///
    /// Fails if the address is out of bounds.
    pub fn store(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        self.bus.write(address, value)?;
        self.cache.write(address, value);
        Ok(())
    }
}
