use std::fs;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};

use m32_emulator::parser::parse_line;
use m32_emulator::runtime::Instruction;
use m32_emulator::Program;

#[derive(Parser, Debug)]
pub struct PrintOpt {
    /// Program file, one instruction per line
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,
}

impl PrintOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let source = fs::read_to_string(&self.program)
            .with_context(|| format!("could not read program {}", self.program))?;
        let program: Program = source.parse().expect("infallible");

        for (index, line) in program.lines().enumerate() {
            match parse_line(line) {
                Ok(None) => println!("{index:4}"),
                Ok(Some(raw)) => match Instruction::decode(raw.mnemonic, &raw.operands) {
                    Ok(instruction) => println!("{index:4}  {instruction}"),
                    Err(error) => println!("{index:4}  ? {line}  ; {error}"),
                },
                Err(_) => println!("{index:4}  ? {line}"),
            }
        }

        Ok(())
    }
}
