use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble an A64 subset source file into a flat binary")]
struct Opts {
    /// Assembly source, one instruction, label or directive per line
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output binary (little-endian words)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    let n = a64_asm::assemble_file(&opts.input, &opts.output)
        .with_context(|| format!("failed to assemble {}", opts.input.display()))?;
    tracing::info!(words = n, output = %opts.output.display(), "wrote binary");
    Ok(())
}
