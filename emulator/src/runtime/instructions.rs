use parse_display::Display;
use thiserror::Error;
use tracing::debug;

use super::registers::{Reg, RegisterOutOfRange};
use super::trace::{CacheControl, Effect};
use super::{Cpu, ProcessorError};
use crate::constants::Word;

/// The M32 instruction set, in decoded form.
///
/// Branch offsets and jump targets stay 64-bit: the reference model puts no
/// bound on them, and the program-counter range check at fetch time is what
/// catches a wild value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    /// R\[d\] ← R\[s\] + R\[t\]
    #[display("add  {0}, {1}, {2}")]
    Add(Reg, Reg, Reg),

    /// R\[t\] ← R\[s\] + imm
    #[display("addi {0}, {1}, {2}")]
    Addi(Reg, Reg, Word),

    /// R\[d\] ← R\[s\] − R\[t\]
    #[display("sub  {0}, {1}, {2}")]
    Sub(Reg, Reg, Reg),

    /// R\[d\] ← 1 if R\[s\] < R\[t\] else 0
    #[display("slt  {0}, {1}, {2}")]
    Slt(Reg, Reg, Reg),

    /// Add the offset to the program counter when the registers differ
    #[display("bne  {0}, {1}, {2}")]
    Bne(Reg, Reg, i64),

    /// Unconditional jump to `target × 4`
    #[display("j    {0}")]
    J(i64),

    /// Jump to `target × 4`, writing the return index into the link register
    #[display("jal  {0}")]
    Jal(i64),

    /// Load through the memory hierarchy: R\[t\] ← mem\[R\[s\] + offset\]
    #[display("lw   {0}, {1}({2})")]
    Lw(Reg, i64, Reg),

    /// Write-through store: mem\[R\[s\] + offset\] ← R\[t\]
    #[display("sw   {0}, {1}({2})")]
    Sw(Reg, i64, Reg),

    /// Disable, enable or flush the cache
    #[display("cache {0}")]
    Cache(CacheControl),

    /// Stop execution
    #[display("halt")]
    Halt,
}

/// Reasons a lexed line failed to decode into an [`Instruction`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown mnemonic {0:?}")]
    UnknownMnemonic(String),

    #[error("{mnemonic} expects {expected} operands, got {got}")]
    WrongOperandCount {
        mnemonic: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Register(#[from] RegisterOutOfRange),

    #[error("immediate {0} does not fit in a machine word")]
    ImmediateOutOfRange(i64),

    #[error("unknown cache control code {0}")]
    InvalidCacheCode(i64),
}

/// Check operand arity for a mnemonic
fn operands<const N: usize>(
    mnemonic: &'static str,
    operands: &[i64],
) -> Result<[i64; N], DecodeError> {
    <[i64; N]>::try_from(operands).map_err(|_| DecodeError::WrongOperandCount {
        mnemonic,
        expected: N,
        got: operands.len(),
    })
}

/// Narrow an operand to a machine word
fn immediate(value: i64) -> Result<Word, DecodeError> {
    Word::try_from(value).map_err(|_| DecodeError::ImmediateOutOfRange(value))
}

impl Instruction {
    /// Decode a lexed line. The mnemonic is case-insensitive; operands are
    /// checked for arity and range here, so execution never sees an invalid
    /// register index.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first problem found.
    pub fn decode(mnemonic: &str, raw: &[i64]) -> Result<Self, DecodeError> {
        match mnemonic.to_uppercase().as_str() {
            "ADD" => {
                let [d, s, t] = operands::<3>("ADD", raw)?;
                Ok(Self::Add(d.try_into()?, s.try_into()?, t.try_into()?))
            }
            "ADDI" => {
                let [t, s, imm] = operands::<3>("ADDI", raw)?;
                Ok(Self::Addi(t.try_into()?, s.try_into()?, immediate(imm)?))
            }
            "SUB" => {
                let [d, s, t] = operands::<3>("SUB", raw)?;
                Ok(Self::Sub(d.try_into()?, s.try_into()?, t.try_into()?))
            }
            "SLT" => {
                let [d, s, t] = operands::<3>("SLT", raw)?;
                Ok(Self::Slt(d.try_into()?, s.try_into()?, t.try_into()?))
            }
            "BNE" => {
                let [s, t, offset] = operands::<3>("BNE", raw)?;
                Ok(Self::Bne(s.try_into()?, t.try_into()?, offset))
            }
            "J" => {
                let [target] = operands::<1>("J", raw)?;
                Ok(Self::J(target))
            }
            "JAL" => {
                let [target] = operands::<1>("JAL", raw)?;
                Ok(Self::Jal(target))
            }
            "LW" => {
                let [t, offset, s] = operands::<3>("LW", raw)?;
                Ok(Self::Lw(t.try_into()?, offset, s.try_into()?))
            }
            "SW" => {
                let [t, offset, s] = operands::<3>("SW", raw)?;
                Ok(Self::Sw(t.try_into()?, offset, s.try_into()?))
            }
            "CACHE" => {
                let [code] = operands::<1>("CACHE", raw)?;
                let control =
                    CacheControl::from_code(code).ok_or(DecodeError::InvalidCacheCode(code))?;
                Ok(Self::Cache(control))
            }
            "HALT" => {
                let [] = operands::<0>("HALT", raw)?;
                Ok(Self::Halt)
            }
            _ => Err(DecodeError::UnknownMnemonic(mnemonic.to_owned())),
        }
    }

    /// Execute the instruction against the engine's state.
    ///
    /// Jump targets are scaled by 4, as if the program were byte-addressed,
    /// even though the program counter indexes lines directly. Together with
    /// the engine's unconditional post-increment, a jump lands one line past
    /// `target × 4`. Both behaviors are kept from the reference model.
    pub(crate) fn execute(self, cpu: &mut Cpu) -> Result<Effect, ProcessorError> {
        match self {
            Self::Add(d, s, t) => {
                let a = cpu.registers.get(s);
                let b = cpu.registers.get(t);
                let value = a.wrapping_add(b);
                debug!("{a} + {b} = {value}");
                cpu.registers.set(d, value);
                Ok(Effect::RegisterWrite { reg: d, value })
            }

            Self::Addi(t, s, imm) => {
                let a = cpu.registers.get(s);
                let value = a.wrapping_add(imm);
                debug!("{a} + {imm} = {value}");
                cpu.registers.set(t, value);
                Ok(Effect::RegisterWrite { reg: t, value })
            }

            Self::Sub(d, s, t) => {
                let a = cpu.registers.get(s);
                let b = cpu.registers.get(t);
                let value = a.wrapping_sub(b);
                debug!("{a} - {b} = {value}");
                cpu.registers.set(d, value);
                Ok(Effect::RegisterWrite { reg: d, value })
            }

            Self::Slt(d, s, t) => {
                let value = Word::from(cpu.registers.get(s) < cpu.registers.get(t));
                cpu.registers.set(d, value);
                Ok(Effect::RegisterWrite { reg: d, value })
            }

            Self::Bne(s, t, offset) => {
                let taken = cpu.registers.get(s) != cpu.registers.get(t);
                if taken {
                    cpu.pc = cpu.pc.saturating_add(offset);
                    debug!(pc = cpu.pc, "branch taken");
                }
                Ok(Effect::Branch { taken, offset })
            }

            Self::J(target) => {
                cpu.pc = target.saturating_mul(4);
                debug!(pc = cpu.pc, "jump");
                Ok(Effect::Jump { target: cpu.pc })
            }

            Self::Jal(target) => {
                let link = Word::try_from(cpu.pc + 1)
                    .map_err(|_| ProcessorError::ProgramCounter(cpu.pc + 1))?;
                cpu.registers.set(Reg::LINK, link);
                cpu.pc = target.saturating_mul(4);
                debug!(pc = cpu.pc, link, "jump and link");
                Ok(Effect::JumpAndLink {
                    link,
                    target: cpu.pc,
                })
            }

            Self::Lw(t, offset, s) => {
                let address = i64::from(cpu.registers.get(s)) + offset;
                let (value, hit) = cpu.memory.load(address)?;
                cpu.registers.set(t, value);
                Ok(Effect::Load {
                    reg: t,
                    address,
                    value,
                    hit,
                })
            }

            Self::Sw(t, offset, s) => {
                let address = i64::from(cpu.registers.get(s)) + offset;
                let value = cpu.registers.get(t);
                cpu.memory.store(address, value)?;
                Ok(Effect::Store { address, value })
            }

            Self::Cache(control) => {
                match control {
                    CacheControl::Disable => cpu.memory.cache.disable(),
                    CacheControl::Enable => cpu.memory.cache.enable(),
                    CacheControl::Flush => cpu.memory.cache.flush(),
                }
                Ok(Effect::CacheUpdate(control))
            }

            Self::Halt => {
                cpu.halted = true;
                Ok(Effect::Halt)
            }
        }
    }
}
