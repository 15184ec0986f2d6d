//! `rv32i-sim <instruction_image> <data_image>`
//!
//! Loads the two raw binary images, runs the hart for up to the step
//! budget, and prints the banner + final register dump spec.md §6
//! specifies verbatim. Memory-mapped output is interleaved as it occurs.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use riscvemu::hart::Hart;
use riscvemu::loader::{load_data_image, load_instruction_image, LoadError};
use riscvemu::memory::{DataMemory, InstrMemory};
use riscvemu::report::{RegfileReport, SizesBanner};

/// Hard-coded per spec.md §6: the driver loop terminates unconditionally
/// once this many steps have executed, regardless of hart state.
const STEP_BUDGET: u64 = 1_000_000;

/// RV32I instruction-set simulator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the raw instruction image.
    instruction_image: String,

    /// Path to the raw data image.
    data_image: String,

    /// Increase log verbosity (-v for info, -vv for debug). Diagnostic
    /// only: it changes no architectural behavior or required output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: &Args) -> Result<(), LoadError> {
    let instr_bytes = load_instruction_image(&args.instruction_image)?;
    let data_bytes = load_data_image(&args.data_image)?;

    let banner = SizesBanner {
        instr_mem_len: instr_bytes.len(),
        data_image_len: data_bytes.len(),
    };
    print!("{banner}");

    let instr_mem = InstrMemory::new(instr_bytes);
    let data_mem = DataMemory::new(&data_bytes);
    let mut hart = Hart::new(instr_mem, data_mem);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for _ in 0..STEP_BUDGET {
        if let Err(trap) = hart.step() {
            log::warn!("halted: {trap}");
            break;
        }
        let mmio = hart.data_mem.flush_stdout();
        if !mmio.is_empty() {
            let _ = write!(out, "{mmio}");
            let _ = out.flush();
        }
    }

    print!("{}", RegfileReport::new(&hart));
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
