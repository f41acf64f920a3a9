//! The ELF backend.

use std::io::Write;

use object::BinaryFormat;

use crate::link::{self, parse_gnu_args};

/// Links ELF inputs driven by a GNU-style command line.
pub fn link(args: &[String], can_exit_early: bool, diag: &mut dyn Write) -> bool {
    let request = parse_gnu_args(args, BinaryFormat::Elf, "a.out");
    link::run(request, can_exit_early, diag)
}
