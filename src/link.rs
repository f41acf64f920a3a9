//! The link pipeline shared by every backend.
//!
//! A backend turns its argument vector into a `LinkRequest` and hands it to
//! `run`, which owns the whole invocation:
//! 1. take the epoch lock and arm the arena guard, so the arena is freed on
//!    every exit path and concurrent invocations cannot interleave epochs;
//! 2. open and expand every input, reporting all unopenable paths;
//! 3. parse the files in parallel;
//! 4. build the symbol table and check undefined references;
//! 5. write the link map to the output path.
//!
//! `can_exit_early` permits terminating the process on fatal I/O failures
//! (unopenable inputs, unwritable output) instead of unwinding; ordinary
//! link failures and successful links always return normally.

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use object::BinaryFormat;
use rayon::prelude::*;

use crate::error::LinkError;
use crate::file::File;
use crate::input::{self, format_name};
use crate::{atom, map, mem, resolve};

/// What one backend invocation asked for, after flag parsing.
pub struct LinkRequest {
    pub format: BinaryFormat,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub entry: Option<String>,
    pub allow_undefined: bool,
    /// `-m EMULATION`, recorded for the driver's dispatch.
    pub emulation: Option<String>,
}

/// Frees the arena when the invocation ends, however it ends.
struct ArenaResetGuard;

impl Drop for ArenaResetGuard {
    fn drop(&mut self) {
        mem::free_arena();
    }
}

pub fn run(request: LinkRequest, can_exit_early: bool, diag: &mut dyn Write) -> bool {
    let _epoch = mem::epoch_lock();
    let _reset = ArenaResetGuard;
    let format = format_name(request.format);
    tracing::debug!("linking {} inputs as {}", request.inputs.len(), format);

    if request.inputs.is_empty() {
        let _ = writeln!(diag, "error: {}", LinkError::NoInputFiles);
        return false;
    }

    // Open everything before giving up, so one bad path does not hide the
    // rest of them.
    let mut files: Vec<Arc<dyn File>> = Vec::new();
    let mut next_ordinal = 0;
    let mut open_errors = 0;
    for path in &request.inputs {
        match input::open_input(path, request.format, &mut next_ordinal) {
            Ok(opened) => {
                for file in opened {
                    files.push(file);
                }
            }
            Err(e) => {
                open_errors += 1;
                let _ = writeln!(diag, "error: {e:#}");
            }
        }
    }
    if open_errors > 0 {
        return fatal(can_exit_early, diag);
    }

    let parse_errors: Vec<LinkError> =
        files.par_iter().filter_map(|f| f.parse().err()).collect();
    for e in &parse_errors {
        let _ = writeln!(diag, "error: {e}");
    }
    if !parse_errors.is_empty() {
        return false;
    }
    let counts = atom::counts();
    tracing::debug!(
        "parsed {} files: {} defined, {} undefined, {} shared, {} absolute, {} names",
        files.len(),
        counts.defined,
        counts.undefined,
        counts.shared_library,
        counts.absolute,
        mem::saver().len()
    );

    let table = resolve::SymbolTable::build(&files, diag);
    if let Some(entry) = &request.entry {
        if !table.contains_name(entry) {
            let _ = writeln!(diag, "warning: cannot find entry symbol {entry}");
        }
    }
    let undefined = resolve::check_undefined(&files, &table, request.allow_undefined, diag);
    if table.errors() + undefined > 0 {
        return false;
    }

    if let Err(e) = map::write_map(&request.output, format, &files, &table) {
        let _ = writeln!(diag, "error: {e:#}");
        return fatal(can_exit_early, diag);
    }
    true
}

fn fatal(can_exit_early: bool, diag: &mut dyn Write) -> bool {
    if can_exit_early {
        let _ = diag.flush();
        // Skips arena teardown; the process is gone either way.
        process::exit(1);
    }
    false
}

/// Scans a GNU-style argument vector.
///
/// `-o`, `-e`/`--entry`, `-m`, and `--allow-undefined` are recognized;
/// other dash arguments are ignored, everything else is an input path.
pub fn parse_gnu_args(args: &[String], format: BinaryFormat, default_output: &str) -> LinkRequest {
    let mut request = LinkRequest {
        format,
        inputs: Vec::new(),
        output: PathBuf::from(default_output),
        entry: None,
        allow_undefined: false,
        emulation: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                if let Some(path) = iter.next() {
                    request.output = PathBuf::from(path);
                }
            }
            "-e" | "--entry" => {
                if let Some(sym) = iter.next() {
                    request.entry = Some(sym.clone());
                }
            }
            "-m" => {
                request.emulation = iter.next().cloned();
            }
            "--allow-undefined" => request.allow_undefined = true,
            _ if arg.starts_with("--entry=") => {
                request.entry = Some(arg["--entry=".len()..].to_string());
            }
            _ if arg.starts_with('-') => {
                tracing::trace!("ignoring flag {}", arg);
            }
            _ => request.inputs.push(PathBuf::from(arg)),
        }
    }
    request
}
