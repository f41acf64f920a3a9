//! The umbrella driver.
//!
//! Picks a backend for an argument vector and dispatches to it. The flavor
//! comes from, in order: an explicit leading `-flavor NAME` pair, or the
//! caller's choice via `link_flavor` (the CLI derives one from the program
//! name). GNU invocations whose `-m` emulation names a PE target are
//! rerouted to the MinGW backend.

use std::io::Write;

use crate::{coff, elf, mach_o, mingw, wasm};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flavor {
    Gnu,
    WinLink,
    Darwin,
    Wasm,
}

/// Parses the `-flavor` vocabulary.
pub fn parse_flavor_name(name: &str) -> Option<Flavor> {
    match name {
        "gnu" => Some(Flavor::Gnu),
        "link" => Some(Flavor::WinLink),
        "darwin" => Some(Flavor::Darwin),
        "wasm" => Some(Flavor::Wasm),
        _ => None,
    }
}

/// Derives a flavor from the program name, `ld.lld`-style.
pub fn flavor_from_progname(prog: &str) -> Option<Flavor> {
    let name = prog.rsplit(['/', '\\']).next().unwrap_or(prog);
    let name = name.strip_suffix(".exe").unwrap_or(name);
    // The generic driver name implies nothing; those invocations pick a
    // flavor with `-flavor` instead.
    if name == "xld" || name == "lld" {
        return None;
    }
    if name.contains("wasm-ld") {
        Some(Flavor::Wasm)
    } else if name.contains("ld64") {
        Some(Flavor::Darwin)
    } else if name.ends_with("link") {
        Some(Flavor::WinLink)
    } else if name.ends_with("ld") {
        Some(Flavor::Gnu)
    } else {
        None
    }
}

/// Links with the flavor named by a leading `-flavor` pair, defaulting to
/// Gnu when the arguments do not name one.
pub fn link(args: &[String], can_exit_early: bool, diag: &mut dyn Write) -> bool {
    if args.first().map(String::as_str) == Some("-flavor") {
        let Some(name) = args.get(1) else {
            let _ = writeln!(diag, "error: missing arg value for '-flavor'");
            return false;
        };
        let Some(flavor) = parse_flavor_name(name) else {
            let _ = writeln!(diag, "error: unknown flavor: {name}");
            return false;
        };
        return link_flavor(flavor, &args[2..], can_exit_early, diag);
    }
    link_flavor(Flavor::Gnu, args, can_exit_early, diag)
}

/// Dispatches one invocation to the backend for `flavor`.
pub fn link_flavor(
    flavor: Flavor,
    args: &[String],
    can_exit_early: bool,
    diag: &mut dyn Write,
) -> bool {
    tracing::debug!("dispatching {:?} invocation with {} args", flavor, args.len());
    match flavor {
        Flavor::Gnu if wants_mingw(args) => mingw::link(args, diag),
        Flavor::Gnu => elf::link(args, can_exit_early, diag),
        Flavor::WinLink => coff::link(args, can_exit_early, diag),
        Flavor::Darwin => mach_o::link(args, can_exit_early, diag),
        Flavor::Wasm => wasm::link(args, can_exit_early, diag),
    }
}

// GNU emulations that really ask for PE output.
fn wants_mingw(args: &[String]) -> bool {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-m" {
            if let Some(emulation) = iter.next() {
                if matches!(
                    emulation.as_str(),
                    "i386pe" | "i386pep" | "thumb2pe" | "arm64pe"
                ) {
                    return true;
                }
            }
        }
    }
    false
}
