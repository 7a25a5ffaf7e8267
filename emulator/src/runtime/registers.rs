use parse_display::Display;
use thiserror::Error;

use crate::constants::{Word, LINK_REGISTER, REGISTER_COUNT};

/// A general purpose register index, guaranteed to be in range once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("R{0}")]
pub struct Reg(u8);

impl Reg {
    /// The register written by `jal` with the return index
    pub const LINK: Reg = Reg(LINK_REGISTER);

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("register index {0} out of range")]
pub struct RegisterOutOfRange(pub i64);

impl TryFrom<i64> for Reg {
    type Error = RegisterOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|&index| usize::from(index) < REGISTER_COUNT)
            .map(Reg)
            .ok_or(RegisterOutOfRange(value))
    }
}

/// The register file: 32 words, zero-initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    inner: [Word; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            inner: [0; REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    #[must_use]
    pub fn get(&self, reg: Reg) -> Word {
        self.inner[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: Word) {
        self.inner[reg.index()] = value;
    }
}

impl std::fmt::Display for RegisterFile {
    /// Shows only the registers holding a non-zero value
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (index, value) in self.inner.iter().enumerate() {
            if *value == 0 {
                continue;
            }
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "R{index} = {value}")?;
            first = false;
        }
        if first {
            write!(f, "(all zero)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reg_range_test() {
        assert_eq!(Reg::try_from(0).unwrap().index(), 0);
        assert_eq!(Reg::try_from(31).unwrap().index(), 31);
        assert_eq!(Reg::try_from(32), Err(RegisterOutOfRange(32)));
        assert_eq!(Reg::try_from(-1), Err(RegisterOutOfRange(-1)));
    }

    #[test]
    fn reg_display_test() {
        assert_eq!(Reg::LINK.to_string(), "R7");
    }

    #[test]
    fn register_file_test() {
        let mut registers = RegisterFile::default();
        let r2 = Reg::try_from(2).unwrap();
        assert_eq!(registers.get(r2), 0);

        registers.set(r2, -42);
        assert_eq!(registers.get(r2), -42);
    }

    #[test]
    fn register_file_display_test() {
        let mut registers = RegisterFile::default();
        assert_eq!(registers.to_string(), "(all zero)");

        registers.set(Reg::try_from(2).unwrap(), 30);
        registers.set(Reg::try_from(5).unwrap(), 1);
        assert_eq!(registers.to_string(), "R2 = 30 | R5 = 1");
    }
}
