//! The execution engine and the machine state it owns
//!
//! A [`Cpu`] owns the register file, the program counter, the halted flag and
//! the memory hierarchy. Nothing is process-wide: several engines can run
//! side by side, and a fresh engine starts from zeroed state.

use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word, DEFAULT_CACHE_CAPACITY, DEFAULT_MEMORY_SIZE};
use crate::parser::{self, Program};

mod cache;
mod hierarchy;
mod instructions;
mod memory;
mod registers;
mod trace;

pub use self::cache::{Cache, CacheStats};
pub use self::hierarchy::MemoryHierarchy;
pub use self::instructions::{DecodeError, Instruction};
pub use self::memory::{MemoryBus, MemoryError};
pub use self::registers::{Reg, RegisterFile, RegisterOutOfRange};
pub use self::trace::{CacheControl, Effect, TraceEvent};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("memory fault: {0}")]
    Memory(#[from] MemoryError),

    #[error("program counter {0} out of range")]
    ProgramCounter(i64),
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// Construction-time parameters, fixed for the lifetime of a [`Cpu`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of entries the cache can hold, at least 1
    pub cache_capacity: usize,

    /// Size of the backing memory in words, at least 1
    pub memory_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            memory_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cache capacity must be at least 1")]
    CacheCapacity,

    #[error("memory size must be at least 1")]
    MemorySize,
}

/// Outcome of a single execution step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// An instruction line was handled, successfully or not
    Trace(TraceEvent),

    /// The line at the program counter was blank
    Blank,

    /// The machine is halted or ran past the end of the program
    Done,
}

/// The execution engine
pub struct Cpu {
    pub registers: RegisterFile,
    pub memory: MemoryHierarchy,
    pc: i64,
    halted: bool,
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cpu {{ pc: {}, halted: {}, registers: {} }}",
            self.pc, self.halted, self.registers
        )
    }
}

impl Cpu {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Rejects a zero cache capacity or memory size before any execution
    /// can start.
    pub fn new(config: Config) -> std::result::Result<Self, ConfigError> {
        if config.cache_capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }
        if config.memory_size == 0 {
            return Err(ConfigError::MemorySize);
        }

        Ok(Self {
            registers: RegisterFile::default(),
            memory: MemoryHierarchy::new(config.cache_capacity, config.memory_size),
            pc: 0,
            halted: false,
        })
    }

    /// Apply memory initialization pairs, in order, before execution.
    ///
    /// # Errors
    ///
    /// Fails on the first out-of-bounds address.
    pub fn load_image(&mut self, image: &[(Address, Word)]) -> std::result::Result<(), MemoryError> {
        self.memory.bus.load_image(image)
    }

    #[must_use]
    pub fn pc(&self) -> i64 {
        self.pc
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Accumulated simulated cost of backing memory accesses
    #[must_use]
    pub fn memory_cost(&self) -> usize {
        self.memory.bus.cost()
    }

    /// Fetch, decode and execute the line at the program counter.
    ///
    /// The program counter is incremented unconditionally afterwards, even
    /// when the instruction itself assigned it: a taken branch or jump lands
    /// one line past the index it wrote. This is kept from the reference
    /// model.
    ///
    /// Lines that fail to lex or decode produce an [`TraceEvent::Invalid`]
    /// and execution continues on the next line.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-bounds memory access or a negative program
    /// counter; both abort the run.
    #[tracing::instrument(skip_all, fields(pc = self.pc), level = "debug")]
    pub fn step(&mut self, program: &Program) -> Result<Step> {
        if self.halted {
            return Ok(Step::Done);
        }

        let Ok(index) = usize::try_from(self.pc) else {
            return Err(ProcessorError::ProgramCounter(self.pc));
        };
        let Some(line) = program.line(index) else {
            return Ok(Step::Done);
        };

        let pc = self.pc;
        let step = match parser::parse_line(line) {
            Ok(None) => Step::Blank,
            Ok(Some(raw)) => match Instruction::decode(raw.mnemonic, &raw.operands) {
                Ok(instruction) => {
                    debug!(%instruction, "executing");
                    let effect = instruction.execute(self)?;
                    Step::Trace(TraceEvent::Executed {
                        pc,
                        instruction,
                        effect,
                    })
                }
                Err(error) => {
                    debug!(%error, "skipping undecodable line");
                    Step::Trace(TraceEvent::Invalid {
                        pc,
                        line: line.to_owned(),
                    })
                }
            },
            Err(error) => {
                debug!(%error, "skipping unparseable line");
                Step::Trace(TraceEvent::Invalid {
                    pc,
                    line: line.to_owned(),
                })
            }
        };

        self.pc += 1;
        Ok(step)
    }

    /// Run until the machine halts or the program counter leaves the
    /// program, collecting the trace.
    ///
    /// # Errors
    ///
    /// Aborts on the first memory or program-counter fault.
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self, program: &Program) -> Result<Vec<TraceEvent>> {
        let mut events = Vec::new();
        loop {
            match self.step(program)? {
                Step::Trace(event) => events.push(event),
                Step::Blank => {}
                Step::Done => return Ok(events),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cpu() -> Cpu {
        Cpu::new(Config::default()).unwrap()
    }

    fn reg(index: i64) -> Reg {
        Reg::try_from(index).unwrap()
    }

    fn program(source: &str) -> Program {
        source.parse().unwrap()
    }

    #[test]
    fn config_validation_test() {
        assert!(Cpu::new(Config::default()).is_ok());
        assert_eq!(
            Cpu::new(Config {
                cache_capacity: 0,
                memory_size: 1024
            })
            .unwrap_err(),
            ConfigError::CacheCapacity
        );
        assert_eq!(
            Cpu::new(Config {
                cache_capacity: 4,
                memory_size: 0
            })
            .unwrap_err(),
            ConfigError::MemorySize
        );
    }

    #[test]
    fn arithmetic_test() {
        let mut cpu = cpu();
        cpu.load_image(&[(0, 10), (1, 20)]).unwrap();

        let program = program(indoc::indoc! {"
            LW 1 1 0
            LW 0 0 0
            ADD 2 0 1
            ADDI 3 2 5
            SUB 4 3 1
            SLT 5 4 0
            HALT
        "});
        let events = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(0)), 10);
        assert_eq!(cpu.registers.get(reg(1)), 20);
        assert_eq!(cpu.registers.get(reg(2)), 30);
        assert_eq!(cpu.registers.get(reg(3)), 35);
        assert_eq!(cpu.registers.get(reg(4)), 15);
        assert_eq!(cpu.registers.get(reg(5)), 0);
        assert!(cpu.is_halted());
        assert_eq!(events.len(), 7);
    }

    #[test]
    fn load_store_test() {
        let mut cpu = cpu();
        cpu.load_image(&[(0, 10), (1, 20)]).unwrap();

        // R1 stays 0, so both accesses resolve to address 0
        let program = program(indoc::indoc! {"
            LW 6 0 1
            ADDI 6 6 1
            SW 6 0 1
            HALT
        "});
        let events = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(6)), 11);
        assert_eq!(cpu.memory.bus.read(0), Ok(11));
        assert!(matches!(
            events[0],
            TraceEvent::Executed {
                effect: Effect::Load {
                    value: 10,
                    hit: false,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn halt_stops_execution_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            ADDI 1 0 1
            HALT
            ADDI 1 0 99
        "});
        let events = cpu.run(&program).unwrap();

        // nothing past the halt executed, and the post-increment still ran
        assert_eq!(cpu.registers.get(reg(1)), 1);
        assert_eq!(cpu.pc(), 2);
        assert!(cpu.is_halted());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn branch_taken_test() {
        let mut cpu = cpu();
        // BNE skips the next two lines when R1 != R0
        let program = program(indoc::indoc! {"
            ADDI 1 0 1
            BNE 1 0 2
            ADDI 2 0 50
            ADDI 3 0 60
            HALT
        "});
        let _ = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(2)), 0);
        assert_eq!(cpu.registers.get(reg(3)), 0);
        assert!(cpu.is_halted());
    }

    #[test]
    fn branch_not_taken_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            BNE 1 0 2
            ADDI 2 0 50
            HALT
        "});
        let _ = cpu.run(&program).unwrap();
        assert_eq!(cpu.registers.get(reg(2)), 50);
    }

    #[test]
    fn jump_scaling_test() {
        // j 1 writes pc = 4, and the post-increment lands on line 5
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            J 1
            ADDI 1 0 1
            ADDI 2 0 1
            ADDI 3 0 1
            ADDI 4 0 1
            HALT
        "});
        let _ = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(1)), 0);
        assert_eq!(cpu.registers.get(reg(4)), 0);
        assert!(cpu.is_halted());
    }

    #[test]
    fn jump_and_link_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            JAL 1
            ADDI 1 0 1
            ADDI 2 0 1
            ADDI 3 0 1
            ADDI 4 0 1
            HALT
        "});
        let events = cpu.run(&program).unwrap();

        // link register holds the index after the jal
        assert_eq!(cpu.registers.get(Reg::LINK), 1);
        assert!(matches!(
            events[0],
            TraceEvent::Executed {
                effect: Effect::JumpAndLink { link: 1, target: 4 },
                ..
            }
        ));
    }

    #[test]
    fn invalid_instruction_continues_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            MUL 1 2 3
            ADD 2, 0, 1
            ADDI 1 0 7
            HALT
        "});
        let events = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(1)), 7);
        assert!(cpu.is_halted());
        assert!(matches!(events[0], TraceEvent::Invalid { pc: 0, .. }));
        assert!(matches!(events[1], TraceEvent::Invalid { pc: 1, .. }));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn blank_lines_are_skipped_test() {
        let mut cpu = cpu();
        let program = program("\nADDI 1 0 3\n\nHALT\n");
        let events = cpu.run(&program).unwrap();

        assert_eq!(cpu.registers.get(reg(1)), 3);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn pc_exhaustion_terminates_test() {
        let mut cpu = cpu();
        let program = program("ADDI 1 0 1\nADDI 2 0 2");
        let _ = cpu.run(&program).unwrap();

        assert!(!cpu.is_halted());
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn negative_pc_faults_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            ADDI 1 0 1
            BNE 1 0 -10
            HALT
        "});
        assert!(matches!(
            cpu.run(&program),
            Err(ProcessorError::ProgramCounter(_))
        ));
    }

    #[test]
    fn memory_fault_aborts_test() {
        let mut cpu = cpu();
        let program = program("LW 1 9999 0\nHALT");
        assert!(matches!(
            cpu.run(&program),
            Err(ProcessorError::Memory(MemoryError::OutOfBounds(9999)))
        ));
    }

    #[test]
    fn cache_instruction_scenario_test() {
        let mut cpu = Cpu::new(Config {
            cache_capacity: 2,
            memory_size: 64,
        })
        .unwrap();

        // three stores to distinct addresses through a 2-entry cache
        let program = program(indoc::indoc! {"
            ADDI 1 0 1
            SW 1 10 0
            SW 1 11 0
            SW 1 12 0
            HALT
        "});
        let _ = cpu.run(&program).unwrap();

        assert!(!cpu.memory.cache.contains(10));
        assert!(cpu.memory.cache.contains(11));
        assert!(cpu.memory.cache.contains(12));
        // write-through kept the bus current for the evicted address too
        assert_eq!(cpu.memory.bus.read(10), Ok(1));
    }

    #[test]
    fn cache_control_program_test() {
        let mut cpu = cpu();
        let program = program(indoc::indoc! {"
            ADDI 1 0 9
            SW 1 0 0
            CACHE 0
            CACHE 1
            CACHE 2
            HALT
        "});
        let _ = cpu.run(&program).unwrap();

        assert!(cpu.memory.cache.is_enabled());
        assert!(cpu.memory.cache.is_empty());
    }

    #[test]
    fn reference_example_program_test() {
        // the sample program shipped with the reference model
        let mut cpu = cpu();
        cpu.load_image(&[(0, 10), (1, 20)]).unwrap();

        let program = program(indoc::indoc! {"
            ADD 2 0 1
            ADDI 3 2 5
            SUB 4 3 1
            SLT 5 4 0
            BNE 5 0 2
            J 10
            JAL 15
            LW 6 0 1
            SW 6 0 1
            CACHE 2
            CACHE 0
            CACHE 1
            HALT
        "});
        let events = cpu.run(&program).unwrap();

        // registers all start at zero, so the arithmetic nets out to R3 = 5
        assert_eq!(cpu.registers.get(reg(2)), 0);
        assert_eq!(cpu.registers.get(reg(3)), 5);
        assert_eq!(cpu.registers.get(reg(4)), 5);
        assert_eq!(cpu.registers.get(reg(5)), 0);
        // the branch at line 4 is not taken; J 10 sends the counter to 40,
        // past the end, so the run terminates by exhaustion
        assert!(!cpu.is_halted());
        assert_eq!(cpu.pc(), 41);
        assert!(matches!(
            events.last(),
            Some(TraceEvent::Executed {
                effect: Effect::Jump { target: 40 },
                ..
            })
        ));
    }

    #[test]
    fn step_by_step_test() {
        let mut cpu = cpu();
        let program = program("ADDI 1 0 2\nHALT");

        assert!(matches!(cpu.step(&program), Ok(Step::Trace(_))));
        assert_eq!(cpu.pc(), 1);
        assert!(matches!(cpu.step(&program), Ok(Step::Trace(_))));
        assert!(cpu.is_halted());
        assert!(matches!(cpu.step(&program), Ok(Step::Done)));
    }
}
