//! The COFF backend.
//!
//! Flags follow `link.exe` conventions: they start with `/` or `-`, the
//! name is case-insensitive, and values come after a colon. Absolute POSIX
//! input paths also start with `/`, so an argument whose name part carries
//! a dot or separator is treated as a path, not a flag.

use std::io::Write;
use std::path::PathBuf;

use object::BinaryFormat;

use crate::link::{self, LinkRequest};

/// Links COFF inputs driven by a `link.exe`-style command line.
pub fn link(args: &[String], can_exit_early: bool, diag: &mut dyn Write) -> bool {
    let request = parse_coff_args(args);
    link::run(request, can_exit_early, diag)
}

fn parse_coff_args(args: &[String]) -> LinkRequest {
    let mut request = LinkRequest {
        format: BinaryFormat::Coff,
        inputs: Vec::new(),
        output: PathBuf::from("a.exe"),
        entry: None,
        allow_undefined: false,
        emulation: None,
    };
    for arg in args {
        let Some(body) = flag_body(arg) else {
            request.inputs.push(PathBuf::from(arg));
            continue;
        };
        let (name, value) = match body.split_once(':') {
            Some((n, v)) => (n.to_ascii_lowercase(), Some(v)),
            None => (body.to_ascii_lowercase(), None),
        };
        if looks_like_path(&name) {
            request.inputs.push(PathBuf::from(arg));
            continue;
        }
        match (name.as_str(), value) {
            ("out", Some(v)) => request.output = PathBuf::from(v),
            ("entry", Some(v)) => request.entry = Some(v.to_string()),
            _ => tracing::trace!("ignoring flag {}", arg),
        }
    }
    request
}

fn flag_body(arg: &str) -> Option<&str> {
    arg.strip_prefix('/').or_else(|| arg.strip_prefix('-'))
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/') || name.contains('\\') || name.contains('.')
}
