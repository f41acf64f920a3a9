//! The WebAssembly backend.

use std::io::Write;

use object::BinaryFormat;

use crate::link::{self, parse_gnu_args};

/// Links Wasm inputs driven by a `wasm-ld`-style command line.
/// `--allow-undefined` downgrades unsatisfied references from errors to
/// imports-to-be.
pub fn link(args: &[String], can_exit_early: bool, diag: &mut dyn Write) -> bool {
    let request = parse_gnu_args(args, BinaryFormat::Wasm, "a.out");
    link::run(request, can_exit_early, diag)
}
