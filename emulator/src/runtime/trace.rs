//! Structured trace of an execution
//!
//! The engine emits one [`TraceEvent`] per decoded instruction (and one per
//! invalid line). Events carry the decoded instruction and its effect; they
//! render as human-readable lines through `Display`, so presenters never need
//! to know the machine's internals and the core never formats logs itself.

use parse_display::Display;

use super::instructions::Instruction;
use super::registers::Reg;
use crate::constants::{Address, Word};

/// Cache control operation selected by the `cache` instruction's code operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum CacheControl {
    Disable,
    Enable,
    Flush,
}

impl CacheControl {
    /// Codes as the instruction set defines them: 0, 1 and 2
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Disable),
            1 => Some(Self::Enable),
            2 => Some(Self::Flush),
            _ => None,
        }
    }
}

/// The state change produced by one executed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A register received a new value
    RegisterWrite { reg: Reg, value: Word },

    /// A conditional branch, with the offset it applies when taken
    Branch { taken: bool, offset: i64 },

    /// An unconditional jump. The target is the value written into the
    /// program counter, before the post-increment.
    Jump { target: i64 },

    /// A jump that also wrote the return index into the link register
    JumpAndLink { link: Word, target: i64 },

    /// A load through the memory hierarchy
    Load {
        reg: Reg,
        address: Address,
        value: Word,
        hit: bool,
    },

    /// A write-through store
    Store { address: Address, value: Word },

    /// A cache mode or flush operation
    CacheUpdate(CacheControl),

    /// The machine reached the halted state
    Halt,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegisterWrite { reg, value } => write!(f, "{reg} = {value}"),
            Self::Branch { taken: true, offset } => write!(f, "branch taken ({offset:+})"),
            Self::Branch { taken: false, .. } => write!(f, "branch not taken"),
            Self::Jump { target } => write!(f, "pc = {target}"),
            Self::JumpAndLink { link, target } => {
                write!(f, "{} = {link}, pc = {target}", Reg::LINK)
            }
            Self::Load {
                reg,
                address,
                value,
                hit,
            } => {
                let outcome = if *hit { "hit" } else { "miss" };
                write!(f, "{reg} = mem[{address}] = {value} ({outcome})")
            }
            Self::Store { address, value } => write!(f, "mem[{address}] = {value}"),
            Self::CacheUpdate(CacheControl::Disable) => write!(f, "cache disabled"),
            Self::CacheUpdate(CacheControl::Enable) => write!(f, "cache enabled"),
            Self::CacheUpdate(CacheControl::Flush) => write!(f, "cache flushed"),
            Self::Halt => write!(f, "halted"),
        }
    }
}

/// One entry of the execution trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// An instruction was decoded and executed
    Executed {
        /// Index of the line it was fetched from
        pc: i64,
        instruction: Instruction,
        effect: Effect,
    },

    /// The line could not be decoded; execution continued on the next one
    Invalid { pc: i64, line: String },
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executed {
                pc,
                instruction,
                effect,
            } => write!(f, "{pc:4}  {instruction} ; {effect}"),
            Self::Invalid { pc, line } => write!(f, "{pc:4}  invalid instruction: {line:?}"),
        }
    }
}
