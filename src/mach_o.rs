//! The Mach-O backend.

use std::io::Write;

use object::BinaryFormat;

use crate::link::{self, parse_gnu_args};

/// Links Mach-O inputs. The `ld64` flags this backend understands overlap
/// with the GNU ones (`-o`, `-e`), so the GNU scanner serves here too.
pub fn link(args: &[String], can_exit_early: bool, diag: &mut dyn Write) -> bool {
    let request = parse_gnu_args(args, BinaryFormat::MachO, "a.out");
    link::run(request, can_exit_early, diag)
}
