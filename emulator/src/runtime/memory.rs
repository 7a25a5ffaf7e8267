use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word, MEMORY_ACCESS_COST};

/// Represents errors related to backing memory accesses
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The address was negative or past the end of memory
    #[error("address {0} out of bounds")]
    OutOfBounds(Address),
}

/// Flat backing memory: a fixed-size store of words, all zero until written.
///
/// Each access charges a fixed cost to an internal counter, standing in for
/// the physical latency of the slower tier. The counter never affects
/// execution order or results.
pub struct MemoryBus {
    cells: Vec<Word>,
    cost: usize,
}

impl MemoryBus {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
            cost: 0,
        }
    }

    fn index(&self, address: Address) -> Result<usize, MemoryError> {
        usize::try_from(address)
            .ok()
            .filter(|&index| index < self.cells.len())
            .ok_or(MemoryError::OutOfBounds(address))
    }

    /// Read the word at an address.
    ///
    /// # Errors
    ///
    /// Fails if the address is out of bounds.
    pub fn read(&mut self, address: Address) -> Result<Word, MemoryError> {
        let index = self.index(address)?;
        self.cost += MEMORY_ACCESS_COST;
        Ok(self.cells[index])
    }

    /// Write a word at an address.
    ///
    /// # Errors
    ///
    /// Fails if the address is out of bounds.
    pub fn write(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        let index = self.index(address)?;
        self.cost += MEMORY_ACCESS_COST;
        self.cells[index] = value;
        Ok(())
    }

    /// Apply `(address, value)` initialization pairs in order, overwriting
    /// defaults. This is the setup step and charges no access cost.
    ///
    /// # Errors
    ///
    /// Fails on the first out-of-bounds address.
    pub fn load_image(&mut self, image: &[(Address, Word)]) -> Result<(), MemoryError> {
        for &(address, value) in image {
            let index = self.index(address)?;
            self.cells[index] = value;
            debug!(address, value, "initialized memory");
        }
        Ok(())
    }

    /// Accumulated simulated access cost
    #[must_use]
    pub fn cost(&self) -> usize {
        self.cost
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn read_write_test() {
        let mut bus = MemoryBus::new(16);
        assert_eq!(bus.read(3), Ok(0));

        bus.write(3, -7).unwrap();
        assert_eq!(bus.read(3), Ok(-7));
    }

    #[test]
    fn out_of_bounds_test() {
        let mut bus = MemoryBus::new(16);
        assert_eq!(bus.read(16), Err(MemoryError::OutOfBounds(16)));
        assert_eq!(bus.read(-1), Err(MemoryError::OutOfBounds(-1)));
        assert_eq!(bus.write(100, 1), Err(MemoryError::OutOfBounds(100)));
    }

    #[test]
    fn load_image_test() {
        let mut bus = MemoryBus::new(16);
        bus.load_image(&[(0, 10), (1, 20), (0, 30)]).unwrap();
        assert_eq!(bus.read(0), Ok(30));
        assert_eq!(bus.read(1), Ok(20));

        assert_eq!(
            bus.load_image(&[(99, 1)]),
            Err(MemoryError::OutOfBounds(99))
        );
    }

    #[test]
    fn access_cost_test() {
        let mut bus = MemoryBus::new(16);
        bus.load_image(&[(0, 10)]).unwrap();
        assert_eq!(bus.cost(), 0);

        let _ = bus.read(0).unwrap();
        bus.write(1, 2).unwrap();
        assert_eq!(bus.cost(), 2 * MEMORY_ACCESS_COST);

        // a faulting access charges nothing
        let _ = bus.read(-1);
        assert_eq!(bus.cost(), 2 * MEMORY_ACCESS_COST);
    }
}
