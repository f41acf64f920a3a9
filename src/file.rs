//! The input file interface.
//!
//! A `File` is anything that can be parsed into atoms. Parsing is memoized:
//! however many threads call `parse()`, `do_parse()` runs at most once, and
//! a failed parse is cached so every later call reports the same error
//! without touching the bytes again. Implementors store a `ParseOnce` and
//! supply `do_parse`; the trait's provided methods do the rest.
//!
//! Before a successful parse (and forever after a failed one) the atom
//! accessors return shared empty slices, so callers never branch on parse
//! state just to iterate.

use once_cell::sync::OnceCell;

use crate::atom::{AbsoluteAtomId, DefinedAtomId, SharedLibraryAtomId, UndefinedAtomId};
use crate::error::LinkError;

pub static NO_DEFINED_ATOMS: &[DefinedAtomId] = &[];
pub static NO_UNDEFINED_ATOMS: &[UndefinedAtomId] = &[];
pub static NO_SHARED_LIBRARY_ATOMS: &[SharedLibraryAtomId] = &[];
pub static NO_ABSOLUTE_ATOMS: &[AbsoluteAtomId] = &[];

/// What a file turned out to be once parsed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FileKind {
    #[default]
    Object,
    SharedLibrary,
    /// Linker-generated, not read from disk.
    Synthetic,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileKind::Object => "object",
            FileKind::SharedLibrary => "shared library",
            FileKind::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Atoms produced by one successful parse.
#[derive(Clone, Debug, Default)]
pub struct AtomSet {
    pub source: FileKind,
    pub defined: Vec<DefinedAtomId>,
    pub undefined: Vec<UndefinedAtomId>,
    pub shared_library: Vec<SharedLibraryAtomId>,
    pub absolute: Vec<AbsoluteAtomId>,
}

/// Memoization cell for a file's parse outcome.
///
/// The winning `do_parse` call populates the cell; concurrent callers block
/// until it finishes and then observe the identical outcome.
#[derive(Default)]
pub struct ParseOnce {
    cell: OnceCell<Result<AtomSet, LinkError>>,
}

impl ParseOnce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_with(
        &self,
        do_parse: impl FnOnce() -> Result<AtomSet, LinkError>,
    ) -> Result<(), LinkError> {
        match self.cell.get_or_init(do_parse) {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn kind(&self) -> FileKind {
        self.atoms().map_or(FileKind::Object, |s| s.source)
    }

    fn atoms(&self) -> Option<&AtomSet> {
        match self.cell.get() {
            Some(Ok(set)) => Some(set),
            _ => None,
        }
    }

    pub fn defined(&self) -> &[DefinedAtomId] {
        self.atoms().map_or(NO_DEFINED_ATOMS, |s| &s.defined)
    }

    pub fn undefined(&self) -> &[UndefinedAtomId] {
        self.atoms().map_or(NO_UNDEFINED_ATOMS, |s| &s.undefined)
    }

    pub fn shared_library(&self) -> &[SharedLibraryAtomId] {
        self.atoms().map_or(NO_SHARED_LIBRARY_ATOMS, |s| &s.shared_library)
    }

    pub fn absolute(&self) -> &[AbsoluteAtomId] {
        self.atoms().map_or(NO_ABSOLUTE_ATOMS, |s| &s.absolute)
    }
}

/// An input to the link.
///
/// `do_parse` is the only method that examines bytes; everything else must
/// be callable before, during, and after parsing.
pub trait File: Send + Sync {
    /// Display name for diagnostics, e.g. `libfoo.a(bar.o)`.
    fn name(&self) -> &str;

    /// Position of this file on the command line, counted across archive
    /// expansion.
    fn ordinal(&self) -> u32;

    fn parse_state(&self) -> &ParseOnce;

    /// Reads the file and produces its atoms. Called at most once; callers
    /// go through `parse()`.
    fn do_parse(&self) -> Result<AtomSet, LinkError>;

    /// Parses the file if it has not been parsed yet.
    fn parse(&self) -> Result<(), LinkError> {
        self.parse_state().parse_with(|| self.do_parse())
    }

    /// `Object` until a successful parse says otherwise.
    fn kind(&self) -> FileKind {
        self.parse_state().kind()
    }

    fn defined_atoms(&self) -> &[DefinedAtomId] {
        self.parse_state().defined()
    }

    fn undefined_atoms(&self) -> &[UndefinedAtomId] {
        self.parse_state().undefined()
    }

    fn shared_library_atoms(&self) -> &[SharedLibraryAtomId] {
        self.parse_state().shared_library()
    }

    fn absolute_atoms(&self) -> &[AbsoluteAtomId] {
        self.parse_state().absolute()
    }
}
