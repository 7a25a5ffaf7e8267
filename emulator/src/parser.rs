//! Program and memory image parsing
//!
//! Programs are sequences of instruction lines, each either blank or of the
//! form `MNEMONIC [operand ...]` with whitespace-separated signed decimal
//! operands. Memory images are sequences of `address value` pairs, one per
//! line. The parsing is handled by the `nom` library.
//!
//! Lines are parsed lazily: a [`Program`] keeps its lines as text, and the
//! runtime parses each one when the program counter reaches it, so a
//! malformed line only surfaces as an event during execution.

use std::convert::Infallible;
use std::str::FromStr;

use nom::character::complete::{alpha1, digit1, one_of, space1};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded, separated_pair};
use nom::{Finish, IResult};
use thiserror::Error;

use crate::constants::{Address, Word};

/// An ordered sequence of instruction lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<String>,
}

impl Program {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Number of lines, blank ones included. The program counter indexes
    /// into this range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl FromStr for Program {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.lines().map(str::to_owned).collect()))
    }
}

/// A lexed instruction line: the mnemonic and its integer operands, before
/// any arity or range checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction<'a> {
    pub mnemonic: &'a str,
    pub operands: Vec<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed instruction line: {0:?}")]
pub struct LineParseError(pub String);

/// Errors encountered while parsing a memory image
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageParseError {
    #[error("malformed memory image line {line_number}: {text:?}")]
    Malformed { line_number: usize, text: String },

    #[error("value {value} on line {line_number} does not fit in a machine word")]
    ValueOutOfRange { line_number: usize, value: i64 },
}

/// Parse a signed decimal integer
fn parse_integer(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(preceded(opt(one_of("+-")), digit1)),
        str::parse,
    )(input)
}

/// Parse a mnemonic followed by its whitespace-separated operands
fn parse_instruction(input: &str) -> IResult<&str, RawInstruction<'_>> {
    let (input, (mnemonic, operands)) =
        pair(alpha1, many0(preceded(space1, parse_integer)))(input)?;
    Ok((input, RawInstruction { mnemonic, operands }))
}

/// Lex one instruction line.
///
/// Blank and whitespace-only lines yield `Ok(None)`.
///
/// # Errors
///
/// Fails if the line is not a mnemonic followed by integer operands.
pub fn parse_line(input: &str) -> Result<Option<RawInstruction<'_>>, LineParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (_, raw) = all_consuming(parse_instruction)(trimmed)
        .finish()
        .map_err(|_| LineParseError(input.to_owned()))?;
    Ok(Some(raw))
}

/// Parse a memory image: one `address value` pair per line, applied in order
/// to the backing memory before execution. Blank lines are ignored.
///
/// # Errors
///
/// Fails on any line that is not a pair of integers, or whose value does not
/// fit in a machine word.
pub fn parse_memory_image(input: &str) -> Result<Vec<(Address, Word)>, ImageParseError> {
    let mut image = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (_, (address, value)) =
            all_consuming(separated_pair(parse_integer, space1, parse_integer))(trimmed)
                .finish()
                .map_err(|_| ImageParseError::Malformed {
                    line_number,
                    text: line.to_owned(),
                })?;

        let value = Word::try_from(value)
            .map_err(|_| ImageParseError::ValueOutOfRange { line_number, value })?;

        image.push((address, value));
    }

    Ok(image)
}
