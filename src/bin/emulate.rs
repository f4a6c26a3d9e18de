use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use a64_rs::dump::{dump_path, FinalState};
use a64_rs::exec::IntExecutor;
use a64_rs::isa::a64::A64Decoder;
use a64_rs::{Cpu, CpuConfig, LinearMemory, MEMORY_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an assembled binary and dump the final machine state")]
struct Opts {
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
    /// Write the dump here (`.out` is appended if missing) instead of stdout
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Abort if no halt is reached after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    let mut mem = LinearMemory::new(MEMORY_SIZE);

    let bytes = std::fs::read(&opts.input)
        .with_context(|| format!("failed to read {}", opts.input.display()))?;
    mem.load_image(&bytes)?;
    tracing::debug!(bytes = bytes.len(), capacity = mem.capacity(), "image loaded");

    let mut cpu = Cpu::new(CpuConfig {
        max_steps: opts.max_steps,
    });
    cpu.reset(0);

    let dec = A64Decoder::new();
    let exec = IntExecutor;
    let steps = cpu.run(&mut mem, &dec, &exec)?;
    tracing::info!(steps, pc = cpu.pc, "halted");

    let state = FinalState::capture(&cpu, &mem);
    let mut out: Box<dyn Write> = match opts.output {
        Some(path) => {
            let path = dump_path(path);
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    match opts.format {
        OutputFormat::Text => state.write_text(&mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &state)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
