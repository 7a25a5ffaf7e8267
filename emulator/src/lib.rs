pub mod constants;
pub mod parser;
pub mod runtime;

pub use self::parser::{parse_memory_image, Program};
pub use self::runtime::{Config, Cpu};
