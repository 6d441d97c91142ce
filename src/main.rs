//! LC-3 VM - CLI Entry Point
//!
//! Commands:
//! - `lc3-vm run <image>...` - Load one or more object images and run from x3000
//! - `lc3-vm disasm <image>` - Disassemble an object image

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lc3::{Console, ConsoleError, Cpu, CpuError, Image, ImageError, Memory, StreamConsole};
use lc3::cpu::Snapshot;
use log::warn;

/// Exit status for a load failure or an execution fault.
const EXIT_FAILURE: u8 = 1;

/// Exit status when the user interrupts the program (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(version)]
#[command(about = "An interpreter for the LC-3 16-bit educational computer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Object images to load, in order (later images overwrite earlier ones)
        #[arg(required = true)]
        images: Vec<String>,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print the final registers as JSON on stderr
        #[arg(long)]
        dump_state: bool,
        /// Use plain buffered stdin even on a terminal
        #[arg(long)]
        no_raw: bool,
    },
    /// Disassemble an object image
    Disasm {
        /// Path to the object image
        image: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { images, max_cycles, dump_state, no_raw } => {
            run_program(&images, max_cycles, dump_state, no_raw)
        }
        Commands::Disasm { image } => disassemble_file(&image),
    }
}

fn run_program(paths: &[String], max_cycles: Option<u64>, dump_state: bool, no_raw: bool) -> ExitCode {
    // Everything is loaded before the terminal is touched.
    let mut mem = Memory::new();
    for path in paths {
        let loaded = lc3::load_image(path)
            .and_then(|image| image.load_into(&mut mem).map_err(ImageError::from));
        if let Err(e) = loaded {
            eprintln!("Failed to load image: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let console = match open_console(no_raw) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("Failed to open console: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    // The console (and raw mode with it) is gone once this returns.
    let (result, snapshot) = execute(Cpu::with_memory(console, mem), max_cycles);

    if dump_state {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        }
    }

    match result {
        Ok(_) if snapshot.state == lc3::CpuState::Running => {
            warn!("stopped at cycle limit with PC=x{:04X}", snapshot.regs.pc);
            eprintln!("Reached max cycles limit ({}).", snapshot.cycles);
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(CpuError::Console(ConsoleError::Interrupted)) => {
            eprintln!("Interrupted.");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Execution error at PC=x{:04X}: {}", snapshot.regs.pc.wrapping_sub(1), e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn execute<C: Console>(mut cpu: Cpu<C>, max_cycles: Option<u64>) -> (Result<u64, CpuError>, Snapshot) {
    let result = match max_cycles {
        Some(limit) => cpu.run_limited(limit),
        None => cpu.run(),
    };
    (result, cpu.snapshot())
}

#[cfg(feature = "terminal")]
fn open_console(no_raw: bool) -> Result<Box<dyn Console>, ConsoleError> {
    use std::io::IsTerminal;

    if !no_raw && std::io::stdin().is_terminal() {
        #[cfg(unix)]
        install_signal_handlers();
        Ok(Box::new(lc3::TerminalConsole::acquire()?))
    } else {
        Ok(Box::new(StreamConsole::stdio()))
    }
}

/// Restore the terminal and exit if the process is signalled while the
/// raw-mode console is held. `Drop` never runs on those paths.
#[cfg(all(feature = "terminal", unix))]
fn install_signal_handlers() {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::io::Write;

    match Signals::new([SIGINT, SIGTERM]) {
        Ok(mut signals) => {
            std::thread::spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    let _ = crossterm::terminal::disable_raw_mode();
                    let _ = std::io::stdout().flush();
                    eprintln!("\nInterrupted (signal {}).", signal);
                    std::process::exit(i32::from(EXIT_INTERRUPTED));
                }
            });
        }
        Err(e) => warn!("could not install signal handlers: {}", e),
    }
}

#[cfg(not(feature = "terminal"))]
fn open_console(_no_raw: bool) -> Result<Box<dyn Console>, ConsoleError> {
    Ok(Box::new(StreamConsole::stdio()))
}

fn disassemble_file(path: &str) -> ExitCode {
    let image: Image = match lc3::load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    print!("{}", lc3::disassemble(image.origin, &image.words));
    ExitCode::SUCCESS
}
