//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the linker using
//! `clap`. Backend-specific flags are not parsed here; they travel to the
//! selected backend inside `args` untouched.

use clap::Parser;

/// A multi-format linker front end.
///
/// Dispatches a command line to one of the format backends (ELF, COFF,
/// Mach-O, WebAssembly, MinGW). The flavor comes from `--flavor`, the
/// program name, or a leading `-flavor` pair inside the arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Backend flavor (gnu, link, darwin, wasm)
    #[arg(long, help = "Select the backend flavor explicitly")]
    pub flavor: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", help = "Set the logging level")]
    pub log_level: String,

    /// Backend arguments and input files
    #[arg(allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<String>,
}
