//! dinorisc - an RV64I binary translator
//!
//! Usage:
//!   dinorisc <elf>             Decode-validate every executable section
//!   dinorisc <elf> <function>  Execute the named function and exit with
//!                              its return value (low 8 bits)
//!
//! The process exit code is the contract: a successful run of a function
//! exits with the function's return value masked to 0-255, and any engine
//! failure (load, decode, or runtime fault) exits with 1. Validation-only
//! runs exit 0 on success.

use anyhow::{Context, Result};
use clap::Parser;
use dinorisc_emulate::Engine;
use dinorisc_formats::ElfImage;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dinorisc")]
#[command(about = "RV64I binary translator", long_about = None)]
struct Cli {
    /// Path to a statically linked RISC-V ELF64 executable
    elf: PathBuf,

    /// Function to execute; omit to only validate the binary
    function: Option<String>,

    /// Integer arguments passed in a0-a7
    #[arg(requires = "function")]
    args: Vec<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dinorisc: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let data = fs::read(&cli.elf)
        .with_context(|| format!("failed to read {}", cli.elf.display()))?;
    let image = ElfImage::parse(data)
        .with_context(|| format!("failed to load {}", cli.elf.display()))?;
    let engine = Engine::new(image);

    match &cli.function {
        None => {
            let report = engine.validate().context("validation failed")?;
            for section in &report.sections {
                println!(
                    "{} @ {:#x}: {} instructions",
                    section.name, section.address, section.instructions
                );
            }
            println!("ok: {} instructions decoded", report.total_instructions());
            Ok(ExitCode::SUCCESS)
        }
        Some(name) => {
            let result = engine
                .run_function(name, &cli.args)
                .with_context(|| format!("failed to run `{name}`"))?;
            println!("{name} returned {result}");
            Ok(ExitCode::from((result & 0xff) as u8))
        }
    }
}
