use std::fs;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::{debug, info};

use m32_emulator::{parse_memory_image, Config, Cpu, Program};

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program file, one instruction per line
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,

    /// Memory image file of `address value` lines, applied before execution
    #[clap(short, long, value_hint = ValueHint::FilePath)]
    memory_image: Option<Utf8PathBuf>,

    /// Cache capacity, in entries
    #[clap(long)]
    cache_size: Option<usize>,

    /// Backing memory size, in words
    #[clap(long)]
    memory_size: Option<usize>,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.program, "Reading program");
        let source = fs::read_to_string(&self.program)
            .with_context(|| format!("could not read program {}", self.program))?;
        let program: Program = source.parse().expect("infallible");

        let mut config = Config::default();
        if let Some(cache_size) = self.cache_size {
            config.cache_capacity = cache_size;
        }
        if let Some(memory_size) = self.memory_size {
            config.memory_size = memory_size;
        }

        debug!(?config, "Building CPU");
        let mut cpu = Cpu::new(config)?;

        if let Some(path) = &self.memory_image {
            debug!(path = %path, "Loading memory image");
            let content = fs::read_to_string(path)
                .with_context(|| format!("could not read memory image {path}"))?;
            let image = parse_memory_image(&content)?;
            cpu.load_image(&image)?;
        }

        info!("Running program");
        let events = cpu.run(&program)?;
        for event in &events {
            info!("{event}");
        }

        let stats = cpu.memory.cache.stats();
        info!(
            pc = cpu.pc(),
            halted = cpu.is_halted(),
            memory_cost = cpu.memory_cost(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            cache_evictions = stats.evictions,
            "End of program"
        );
        info!(registers = %cpu.registers, "Final registers");

        Ok(())
    }
}
