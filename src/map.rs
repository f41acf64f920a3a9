//! Link map output.
//!
//! The map is the invocation's output artifact: a text listing of every
//! input, its atom counts, and the resolved symbol table. Symbols are sorted
//! by name and inputs appear in command-line order, so two identical
//! invocations produce byte-identical maps.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::atom;
use crate::file::File;
use crate::mem;
use crate::resolve::{Definition, SymbolTable};

/// Renders the link map as text.
pub fn render(format: &str, files: &[Arc<dyn File>], table: &SymbolTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "xld link map");
    let _ = writeln!(out, "format: {format}");
    let _ = writeln!(out);

    let _ = writeln!(out, "inputs:");
    let mut total_atoms = 0;
    for file in files {
        let d = file.defined_atoms().len();
        let u = file.undefined_atoms().len();
        let s = file.shared_library_atoms().len();
        let a = file.absolute_atoms().len();
        total_atoms += d + u + s + a;
        let _ = writeln!(
            out,
            "  [{}] {} ({}): {} defined, {} undefined, {} shared, {} absolute",
            file.ordinal(),
            file.name(),
            file.kind(),
            d,
            u,
            s,
            a
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "symbols:");
    for entry in table.entries() {
        let origin = file_label(files, entry.file);
        let kind = entry.definition.describe();
        match entry.definition {
            Definition::Defined(id) => {
                let a = atom::get_defined(id);
                let _ = writeln!(
                    out,
                    "  {:<28} {:<9} {} {} size={:#x} align={}{} {}",
                    entry.name,
                    kind,
                    a.scope,
                    a.content,
                    a.size,
                    a.alignment,
                    if a.weak { " weak" } else { "" },
                    origin
                );
            }
            Definition::Absolute(id) => {
                let a = atom::get_absolute(id);
                let _ = writeln!(
                    out,
                    "  {:<28} {:<9} {} value={:#x} {}",
                    entry.name, kind, a.scope, a.value, origin
                );
            }
            Definition::Shared(id) => {
                let a = atom::get_shared_library(id);
                let load = mem::saver().get(a.load_name);
                let _ = writeln!(
                    out,
                    "  {:<28} {:<9} from {} {}",
                    entry.name, kind, &*load, origin
                );
            }
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} atoms from {} inputs, {} resolved symbols",
        total_atoms,
        files.len(),
        table.len()
    );
    out
}

/// Writes the link map for a finished link.
pub fn write_map(
    path: &Path,
    format: &str,
    files: &[Arc<dyn File>],
    table: &SymbolTable,
) -> Result<()> {
    let text = render(format, files, table);
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!("wrote link map to {}", path.display());
    Ok(())
}

fn file_label(files: &[Arc<dyn File>], ordinal: u32) -> &str {
    files.get(ordinal as usize).map_or("?", |f| f.name())
}
