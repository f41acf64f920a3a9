//! Opening command-line inputs and scanning them into atoms.
//!
//! Inputs are memory-mapped and kept alive behind `Arc`s so archive members
//! can parse lazily out of the parent map. An archive expands into one
//! `InputFile` per member, named `archive.a(member.o)`.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use memmap2::Mmap;
use object::read::archive::ArchiveFile;
use object::{
    BinaryFormat, Object, ObjectKind, ObjectSection, ObjectSymbol, SectionKind, SymbolKind,
    SymbolScope, SymbolSection,
};

use crate::atom::{
    self, AbsoluteAtom, ContentKind, DefinedAtom, Scope, SharedLibraryAtom, UndefinedAtom,
};
use crate::error::LinkError;
use crate::file::{AtomSet, File, FileKind, ParseOnce};
use crate::mem;

pub const ARCHIVE_MAGIC: &[u8] = b"!<arch>\n";

/// One command-line input, or one member of an archive input.
pub struct InputFile {
    name: String,
    ordinal: u32,
    data: Arc<Mmap>,
    range: Range<usize>,
    expected: BinaryFormat,
    once: ParseOnce,
}

impl InputFile {
    fn bytes(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }
}

impl File for InputFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn parse_state(&self) -> &ParseOnce {
        &self.once
    }

    fn do_parse(&self) -> Result<AtomSet, LinkError> {
        tracing::trace!("parsing {}", self.name);
        scan_object(self.bytes(), &self.name, self.ordinal, self.expected)
    }
}

/// Maps `path` and returns the input files it contains.
///
/// A plain object or shared library yields one file; an archive yields one
/// per member. Ordinals are taken from `next_ordinal` in expansion order.
pub fn open_input(
    path: &Path,
    expected: BinaryFormat,
    next_ordinal: &mut u32,
) -> anyhow::Result<Vec<Arc<InputFile>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let data = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to mmap {}", path.display()))?;
    let data = Arc::new(data);

    let mut files = Vec::new();
    if data.starts_with(ARCHIVE_MAGIC) {
        tracing::debug!("expanding archive {}", path.display());
        let archive = ArchiveFile::parse(&data[..])
            .with_context(|| format!("failed to parse archive {}", path.display()))?;
        for member in archive.members() {
            let member = member
                .with_context(|| format!("failed to read archive member in {}", path.display()))?;
            let member_name = String::from_utf8_lossy(member.name()).to_string();
            let (offset, size) = member.file_range();
            let range = offset as usize..(offset + size) as usize;
            anyhow::ensure!(
                range.end <= data.len(),
                "archive member {} out of bounds in {}",
                member_name,
                path.display()
            );
            files.push(Arc::new(InputFile {
                name: format!("{}({})", path.display(), member_name),
                ordinal: take_ordinal(next_ordinal),
                data: data.clone(),
                range,
                expected,
                once: ParseOnce::new(),
            }));
        }
        tracing::debug!("archive {} contained {} members", path.display(), files.len());
    } else {
        let len = data.len();
        files.push(Arc::new(InputFile {
            name: path.display().to_string(),
            ordinal: take_ordinal(next_ordinal),
            data,
            range: 0..len,
            expected,
            once: ParseOnce::new(),
        }));
    }
    Ok(files)
}

fn take_ordinal(next: &mut u32) -> u32 {
    let ordinal = *next;
    *next += 1;
    ordinal
}

/// Scans one object image into atoms.
///
/// Shared libraries contribute their dynamic exports as shared library
/// atoms; everything else contributes defined, undefined, and absolute
/// atoms from its symbol table.
pub fn scan_object(
    data: &[u8],
    name: &str,
    ordinal: u32,
    expected: BinaryFormat,
) -> Result<AtomSet, LinkError> {
    let obj = object::File::parse(data).map_err(|e| LinkError::malformed(name, e))?;
    if obj.format() != expected {
        return Err(LinkError::wrong_format(
            name,
            format_name(expected),
            format_name(obj.format()),
        ));
    }

    let mut set = AtomSet::default();

    if obj.kind() == ObjectKind::Dynamic {
        set.source = FileKind::SharedLibrary;
        let load_name = mem::saver().save(base_name(name));
        for sym in obj.dynamic_symbols() {
            if !sym.is_definition() {
                continue;
            }
            let sym_name = sym.name().map_err(|e| LinkError::malformed(name, e))?;
            if sym_name.is_empty() {
                continue;
            }
            set.shared_library.push(atom::alloc_shared_library(SharedLibraryAtom {
                name: mem::saver().save(sym_name),
                file: ordinal,
                load_name,
                weak: sym.is_weak(),
            }));
        }
        tracing::debug!("{}: {} exported symbols", name, set.shared_library.len());
        return Ok(set);
    }

    for sym in obj.symbols() {
        match sym.kind() {
            SymbolKind::File | SymbolKind::Section => continue,
            _ => {}
        }
        let sym_name = sym.name().map_err(|e| LinkError::malformed(name, e))?;
        if sym_name.is_empty() {
            continue;
        }
        let interned = mem::saver().save(sym_name);
        match sym.section() {
            SymbolSection::Undefined => {
                set.undefined.push(atom::alloc_undefined(UndefinedAtom {
                    name: interned,
                    file: ordinal,
                    weak: sym.is_weak(),
                }));
            }
            SymbolSection::Absolute => {
                set.absolute.push(atom::alloc_absolute(AbsoluteAtom {
                    name: interned,
                    file: ordinal,
                    scope: scope_of(&sym),
                    value: sym.address(),
                }));
            }
            SymbolSection::Common => {
                // For a common symbol the address field carries the alignment.
                set.defined.push(atom::alloc_defined(DefinedAtom {
                    name: interned,
                    file: ordinal,
                    scope: scope_of(&sym),
                    content: ContentKind::ZeroFill,
                    size: sym.size(),
                    alignment: sym.address().max(1) as u32,
                    weak: sym.is_weak(),
                }));
            }
            SymbolSection::Section(index) => {
                let section = obj
                    .section_by_index(index)
                    .map_err(|e| LinkError::malformed(name, e))?;
                set.defined.push(atom::alloc_defined(DefinedAtom {
                    name: interned,
                    file: ordinal,
                    scope: scope_of(&sym),
                    content: content_kind(section.kind()),
                    size: sym.size(),
                    alignment: section.align().max(1) as u32,
                    weak: sym.is_weak(),
                }));
            }
            _ => continue,
        }
    }
    tracing::debug!(
        "{}: {} defined, {} undefined, {} absolute",
        name,
        set.defined.len(),
        set.undefined.len(),
        set.absolute.len()
    );
    Ok(set)
}

fn scope_of<'data>(sym: &impl ObjectSymbol<'data>) -> Scope {
    match sym.scope() {
        SymbolScope::Compilation => Scope::Translation,
        SymbolScope::Linkage => Scope::Linkage,
        SymbolScope::Dynamic => Scope::Global,
        SymbolScope::Unknown => {
            if sym.is_global() {
                Scope::Global
            } else {
                Scope::Translation
            }
        }
    }
}

fn content_kind(kind: SectionKind) -> ContentKind {
    match kind {
        SectionKind::Text => ContentKind::Code,
        SectionKind::Data | SectionKind::ReadOnlyData | SectionKind::ReadOnlyString => {
            ContentKind::Data
        }
        SectionKind::UninitializedData | SectionKind::Common => ContentKind::ZeroFill,
        _ => ContentKind::Unknown,
    }
}

pub(crate) fn format_name(format: BinaryFormat) -> &'static str {
    match format {
        BinaryFormat::Coff => "coff",
        BinaryFormat::Elf => "elf",
        BinaryFormat::MachO => "mach-o",
        BinaryFormat::Pe => "pe",
        BinaryFormat::Wasm => "wasm",
        _ => "object",
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
