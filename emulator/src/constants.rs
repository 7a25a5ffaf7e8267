/// Machine word. Registers and memory cells hold one of these; arithmetic
/// wraps at 32 bits.
pub type Word = i32;

/// Effective addresses are computed in 64 bits so that `R[rs] + offset`
/// cannot overflow before the bounds check. Negative addresses always fault.
pub type Address = i64;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 32;

/// Index of the register written by `jal` with the return index
pub const LINK_REGISTER: u8 = 7;

/// Simulated cost charged for each backing memory access. Purely an
/// accounting figure, it never delays execution.
pub const MEMORY_ACCESS_COST: usize = 10;

/// Default number of entries the cache can hold
pub const DEFAULT_CACHE_CAPACITY: usize = 4;

/// Default size of the backing memory, in words
pub const DEFAULT_MEMORY_SIZE: usize = 1024;
