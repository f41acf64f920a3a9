//! Name-level symbol accounting.
//!
//! Once every input has parsed, the backend builds a table mapping each
//! global name to its winning definition: the first strong definition wins,
//! a strong definition supersedes a weak one, definitions from regular
//! inputs supersede shared library exports, and a second strong definition
//! is a duplicate-symbol error. Undefined atoms are then checked against
//! the table; a reference that nothing satisfies fails the link unless it
//! is weak or undefined symbols were explicitly allowed.
//!
//! Names are compared as `StrRef` handles; interning makes that a word
//! comparison.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use crate::atom::{self, AbsoluteAtomId, DefinedAtomId, Scope, SharedLibraryAtomId};
use crate::file::File;
use crate::mem::{self, StrRef};

/// The winning definition for one name.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Definition {
    Defined(DefinedAtomId),
    Absolute(AbsoluteAtomId),
    Shared(SharedLibraryAtomId),
}

impl Definition {
    pub fn describe(self) -> &'static str {
        match self {
            Definition::Defined(_) => "defined",
            Definition::Absolute(_) => "absolute",
            Definition::Shared(_) => "shared",
        }
    }
}

#[derive(Clone, Copy)]
struct Resolved {
    definition: Definition,
    file: u32,
    weak: bool,
}

impl Resolved {
    // Strong regular definitions outrank weak ones, which outrank
    // shared library exports.
    fn rank(&self) -> u8 {
        match (self.definition, self.weak) {
            (Definition::Shared(_), _) => 0,
            (_, true) => 1,
            (_, false) => 2,
        }
    }
}

/// A flattened view of one resolved symbol, for the link map.
pub struct SymbolEntry {
    pub name: String,
    pub definition: Definition,
    pub file: u32,
    pub weak: bool,
}

pub struct SymbolTable {
    table: HashMap<StrRef, Resolved>,
    errors: usize,
}

impl SymbolTable {
    /// Builds the table from every parsed file, in command-line order.
    ///
    /// Duplicate-symbol diagnostics go to `diag`; the count is available
    /// from `errors()` afterwards.
    pub fn build(files: &[Arc<dyn File>], diag: &mut dyn Write) -> Self {
        let mut table = Self {
            table: HashMap::new(),
            errors: 0,
        };
        for file in files {
            for &id in file.defined_atoms() {
                let a = atom::get_defined(id);
                if a.scope == Scope::Translation {
                    continue;
                }
                table.insert(
                    a.name,
                    Resolved {
                        definition: Definition::Defined(id),
                        file: a.file,
                        weak: a.weak,
                    },
                    files,
                    diag,
                );
            }
            for &id in file.absolute_atoms() {
                let a = atom::get_absolute(id);
                if a.scope == Scope::Translation {
                    continue;
                }
                table.insert(
                    a.name,
                    Resolved {
                        definition: Definition::Absolute(id),
                        file: a.file,
                        weak: false,
                    },
                    files,
                    diag,
                );
            }
            for &id in file.shared_library_atoms() {
                let a = atom::get_shared_library(id);
                table.insert(
                    a.name,
                    Resolved {
                        definition: Definition::Shared(id),
                        file: a.file,
                        weak: a.weak,
                    },
                    files,
                    diag,
                );
            }
        }
        tracing::debug!("symbol table holds {} names", table.table.len());
        table
    }

    fn insert(
        &mut self,
        name: StrRef,
        candidate: Resolved,
        files: &[Arc<dyn File>],
        diag: &mut dyn Write,
    ) {
        match self.table.get(&name) {
            None => {
                self.table.insert(name, candidate);
            }
            Some(existing) => {
                if existing.rank() == 2 && candidate.rank() == 2 {
                    self.errors += 1;
                    let _ = writeln!(diag, "error: duplicate symbol: {}", mem::saver().get(name));
                    let _ = writeln!(diag, ">>> defined at {}", file_name(files, existing.file));
                    let _ = writeln!(diag, ">>> defined at {}", file_name(files, candidate.file));
                } else if candidate.rank() > existing.rank() {
                    self.table.insert(name, candidate);
                }
            }
        }
    }

    pub fn lookup(&self, name: StrRef) -> Option<Definition> {
        self.table.get(&name).map(|r| r.definition)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.lookup(mem::saver().save(name)).is_some()
    }

    /// Duplicate-symbol errors reported during `build`.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries sorted by name, for deterministic output.
    pub fn entries(&self) -> Vec<SymbolEntry> {
        let mut out: Vec<SymbolEntry> = self
            .table
            .iter()
            .map(|(&name, r)| SymbolEntry {
                name: mem::saver().get(name).to_string(),
                definition: r.definition,
                file: r.file,
                weak: r.weak,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// Verifies that every undefined atom is satisfied by the table.
///
/// Returns the number of distinct unsatisfied names; each is reported to
/// `diag` once, with the first file that referenced it.
pub fn check_undefined(
    files: &[Arc<dyn File>],
    table: &SymbolTable,
    allow_undefined: bool,
    diag: &mut dyn Write,
) -> usize {
    let mut reported: HashSet<StrRef> = HashSet::new();
    let mut errors = 0;
    for file in files {
        for &id in file.undefined_atoms() {
            let a = atom::get_undefined(id);
            if table.lookup(a.name).is_some() || a.weak || allow_undefined {
                continue;
            }
            if !reported.insert(a.name) {
                continue;
            }
            errors += 1;
            let _ = writeln!(diag, "error: undefined symbol: {}", mem::saver().get(a.name));
            let _ = writeln!(diag, ">>> referenced by {}", file_name(files, a.file));
        }
    }
    errors
}

fn file_name(files: &[Arc<dyn File>], ordinal: u32) -> &str {
    files.get(ordinal as usize).map_or("?", |f| f.name())
}
