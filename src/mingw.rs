//! The MinGW backend.
//!
//! MinGW links are GNU-flavored command lines targeting PE/COFF output.
//! This backend owns no pipeline of its own: it rewrites the GNU arguments
//! into `link.exe` style and hands them to the COFF backend. It always runs
//! to completion, so there is no `can_exit_early` parameter.

use std::io::Write;

use crate::coff;

/// Links PE/COFF output from a GNU-style command line.
pub fn link(args: &[String], diag: &mut dyn Write) -> bool {
    let translated = translate_args(args);
    tracing::debug!("mingw: forwarding {} args to the coff backend", translated.len());
    coff::link(&translated, false, diag)
}

/// Rewrites GNU-style arguments into `link.exe` style.
///
/// `-o` becomes `/out:`, `-e`/`--entry` become `/entry:`, the `-m`
/// emulation pair is dropped (it already chose this backend), and other
/// dash flags are dropped. Input paths pass through untouched.
pub fn translate_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                if let Some(path) = iter.next() {
                    out.push(format!("/out:{path}"));
                }
            }
            "-e" | "--entry" => {
                if let Some(sym) = iter.next() {
                    out.push(format!("/entry:{sym}"));
                }
            }
            "-m" => {
                iter.next();
            }
            _ if arg.starts_with("--entry=") => {
                out.push(format!("/entry:{}", &arg["--entry=".len()..]));
            }
            _ if arg.starts_with('-') => {
                tracing::trace!("mingw: dropping flag {}", arg);
            }
            _ => out.push(arg.clone()),
        }
    }
    out
}
