//! The atom model.
//!
//! Parsed inputs decompose into atoms, the indivisible units the link works
//! on. Each atom carries a name interned in the string saver and the ordinal
//! of the file that produced it. There are four kinds:
//! - defined: a symbol with content in the file,
//! - undefined: a reference to be satisfied elsewhere,
//! - shared library: an export of a dynamic library,
//! - absolute: a fixed address with no content.
//!
//! Atoms are small `Copy` records stored in per-kind slabs that reset in
//! lockstep with the arena, so backends pass `…AtomId` handles around and
//! copy records out on demand.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::mem::{Handle, SpecificAlloc, StrRef};

pub type DefinedAtomId = Handle<DefinedAtom>;
pub type UndefinedAtomId = Handle<UndefinedAtom>;
pub type SharedLibraryAtomId = Handle<SharedLibraryAtom>;
pub type AbsoluteAtomId = Handle<AbsoluteAtom>;

/// How widely a definition is visible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Scope {
    /// Visible only within the translation unit that defined it.
    Translation,
    /// Visible across the link but not exported from the linked image.
    Linkage,
    /// Visible to other linked images.
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Translation => "local",
            Scope::Linkage => "hidden",
            Scope::Global => "global",
        };
        f.write_str(s)
    }
}

/// Broad classification of a defined atom's contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContentKind {
    Code,
    Data,
    /// Occupies size at run time but no bytes in the file.
    ZeroFill,
    Unknown,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentKind::Code => "code",
            ContentKind::Data => "data",
            ContentKind::ZeroFill => "bss",
            ContentKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A symbol defined with content by an input file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DefinedAtom {
    pub name: StrRef,
    /// Ordinal of the input file that produced this atom.
    pub file: u32,
    pub scope: Scope,
    pub content: ContentKind,
    pub size: u64,
    pub alignment: u32,
    /// Weak definitions lose to strong definitions of the same name.
    pub weak: bool,
}

/// A reference to a symbol some other file must define.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UndefinedAtom {
    pub name: StrRef,
    pub file: u32,
    /// Weak references may legally stay unsatisfied.
    pub weak: bool,
}

/// A symbol exported by a shared library.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SharedLibraryAtom {
    pub name: StrRef,
    pub file: u32,
    /// Name the library should be loaded by at run time.
    pub load_name: StrRef,
    pub weak: bool,
}

/// A symbol with a fixed value and no content.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AbsoluteAtom {
    pub name: StrRef,
    pub file: u32,
    pub scope: Scope,
    pub value: u64,
}

static DEFINED: Lazy<Arc<SpecificAlloc<DefinedAtom>>> = Lazy::new(SpecificAlloc::new);
static UNDEFINED: Lazy<Arc<SpecificAlloc<UndefinedAtom>>> = Lazy::new(SpecificAlloc::new);
static SHARED_LIBRARY: Lazy<Arc<SpecificAlloc<SharedLibraryAtom>>> = Lazy::new(SpecificAlloc::new);
static ABSOLUTE: Lazy<Arc<SpecificAlloc<AbsoluteAtom>>> = Lazy::new(SpecificAlloc::new);

pub fn alloc_defined(atom: DefinedAtom) -> DefinedAtomId {
    DEFINED.alloc(atom)
}

pub fn get_defined(id: DefinedAtomId) -> DefinedAtom {
    DEFINED.get(id)
}

pub fn try_get_defined(id: DefinedAtomId) -> Option<DefinedAtom> {
    DEFINED.try_get(id)
}

pub fn alloc_undefined(atom: UndefinedAtom) -> UndefinedAtomId {
    UNDEFINED.alloc(atom)
}

pub fn get_undefined(id: UndefinedAtomId) -> UndefinedAtom {
    UNDEFINED.get(id)
}

pub fn try_get_undefined(id: UndefinedAtomId) -> Option<UndefinedAtom> {
    UNDEFINED.try_get(id)
}

pub fn alloc_shared_library(atom: SharedLibraryAtom) -> SharedLibraryAtomId {
    SHARED_LIBRARY.alloc(atom)
}

pub fn get_shared_library(id: SharedLibraryAtomId) -> SharedLibraryAtom {
    SHARED_LIBRARY.get(id)
}

pub fn try_get_shared_library(id: SharedLibraryAtomId) -> Option<SharedLibraryAtom> {
    SHARED_LIBRARY.try_get(id)
}

pub fn alloc_absolute(atom: AbsoluteAtom) -> AbsoluteAtomId {
    ABSOLUTE.alloc(atom)
}

pub fn get_absolute(id: AbsoluteAtomId) -> AbsoluteAtom {
    ABSOLUTE.get(id)
}

pub fn try_get_absolute(id: AbsoluteAtomId) -> Option<AbsoluteAtom> {
    ABSOLUTE.try_get(id)
}

/// Atoms of each kind allocated this epoch.
pub fn counts() -> AtomCounts {
    AtomCounts {
        defined: DEFINED.len(),
        undefined: UNDEFINED.len(),
        shared_library: SHARED_LIBRARY.len(),
        absolute: ABSOLUTE.len(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct AtomCounts {
    pub defined: usize,
    pub undefined: usize,
    pub shared_library: usize,
    pub absolute: usize,
}

impl AtomCounts {
    pub fn total(self) -> usize {
        self.defined + self.undefined + self.shared_library + self.absolute
    }
}
