//! Entry point for the xld linker.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Initialize `tracing` from `--log-level` (or `RUST_LOG`).
//! 3. Determine the backend flavor: explicit `--flavor`, else the program
//!    name, else a leading `-flavor` pair in the arguments.
//! 4. Dispatch to the driver with diagnostics on stderr and map the bool
//!    to the process exit code.
//!
//! Error handling is done via `anyhow`.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xld::config::Config;
use xld::driver;

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let progname = std::env::args().next();
    let mut stderr = std::io::stderr();
    let ok = if let Some(name) = &config.flavor {
        let Some(flavor) = driver::parse_flavor_name(name) else {
            anyhow::bail!("unknown flavor: {name}");
        };
        driver::link_flavor(flavor, &config.args, true, &mut stderr)
    } else if let Some(flavor) = progname.as_deref().and_then(driver::flavor_from_progname) {
        driver::link_flavor(flavor, &config.args, true, &mut stderr)
    } else {
        driver::link(&config.args, true, &mut stderr)
    };

    std::process::exit(if ok { 0 } else { 1 });
}
