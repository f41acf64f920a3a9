//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use object::write::{self, StandardSegment};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};
use tempfile::TempDir;

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Builds a relocatable object with one `.text` section, one global
/// one-byte function per name in `defines`, and one undefined reference
/// per name in `references`.
pub fn simple_object(format: BinaryFormat, defines: &[&str], references: &[&str]) -> Vec<u8> {
    let mut obj = write::Object::new(format, Architecture::X86_64, Endianness::Little);
    let name: &[u8] = if format == BinaryFormat::MachO {
        b"__text"
    } else {
        b".text"
    };
    let text = obj.add_section(
        obj.segment_name(StandardSegment::Text).to_vec(),
        name.to_vec(),
        SectionKind::Text,
    );
    for (i, name) in defines.iter().enumerate() {
        obj.append_section_data(text, &[0xc3], 1);
        obj.add_symbol(write::Symbol {
            name: name.as_bytes().to_vec(),
            value: i as u64,
            size: 1,
            kind: SymbolKind::Text,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: write::SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
    for name in references {
        obj.add_symbol(write::Symbol {
            name: name.as_bytes().to_vec(),
            value: 0,
            size: 0,
            kind: SymbolKind::Text,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: write::SymbolSection::Undefined,
            flags: SymbolFlags::None,
        });
    }
    obj.write().unwrap()
}

/// Assembles a minimal Wasm module that exports one nullary function per
/// name in `exports` and imports one from `env` per name in `imports`.
/// A name section keeps the defined functions named.
pub fn wasm_module(exports: &[&str], imports: &[&str]) -> Vec<u8> {
    let mut out = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
    // Type section: a single () -> () function type.
    push_section(&mut out, 1, &[0x01, 0x60, 0x00, 0x00]);
    if !imports.is_empty() {
        let mut payload = vec![imports.len() as u8];
        for name in imports {
            push_name(&mut payload, "env");
            push_name(&mut payload, name);
            payload.push(0x00); // import kind: function
            payload.push(0x00); // type index
        }
        push_section(&mut out, 2, &payload);
    }
    if !exports.is_empty() {
        let mut funcs = vec![exports.len() as u8];
        funcs.resize(1 + exports.len(), 0x00);
        push_section(&mut out, 3, &funcs);

        let mut payload = vec![exports.len() as u8];
        for (i, name) in exports.iter().enumerate() {
            push_name(&mut payload, name);
            payload.push(0x00); // export kind: function
            payload.push((imports.len() + i) as u8);
        }
        push_section(&mut out, 7, &payload);

        let mut code = vec![exports.len() as u8];
        for _ in exports {
            // body size, no locals, end
            code.extend_from_slice(&[0x02, 0x00, 0x0B]);
        }
        push_section(&mut out, 10, &code);

        let mut map = vec![exports.len() as u8];
        for (i, name) in exports.iter().enumerate() {
            map.push((imports.len() + i) as u8);
            push_name(&mut map, name);
        }
        let mut names = Vec::new();
        push_name(&mut names, "name");
        names.push(0x01); // function names subsection
        names.push(map.len() as u8);
        names.extend_from_slice(&map);
        push_section(&mut out, 0, &names);
    }
    out
}

// Section ids and sizes are single-byte LEB128; fine for fixture-sized
// payloads.
fn push_section(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    out.push(id);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
}

fn push_name(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Assembles a minimal ELF64 shared object whose dynamic symbol table
/// exports one global function per name in `exports`.
pub fn elf_shared_object(exports: &[&str]) -> Vec<u8> {
    let mut dynsym = vec![0u8; 24]; // null symbol
    let mut dynstr = vec![0u8];
    for (i, name) in exports.iter().enumerate() {
        push_u32(&mut dynsym, dynstr.len() as u32); // st_name
        dynsym.push(0x12); // st_info: STB_GLOBAL, STT_FUNC
        dynsym.push(0x00); // st_other
        push_u16(&mut dynsym, 1); // st_shndx: .text
        push_u64(&mut dynsym, i as u64); // st_value
        push_u64(&mut dynsym, 1); // st_size
        dynstr.extend_from_slice(name.as_bytes());
        dynstr.push(0);
    }
    let shstrtab = b"\0.text\0.dynsym\0.dynstr\0.shstrtab\0";

    let text_off = 64u64;
    let dynsym_off = 72u64;
    let dynstr_off = dynsym_off + dynsym.len() as u64;
    let shstrtab_off = dynstr_off + dynstr.len() as u64;
    let shoff = (shstrtab_off + shstrtab.len() as u64 + 7) & !7;

    let mut out = vec![
        0x7f, b'E', b'L', b'F', 2, 1, 1, 0, // 64-bit, little-endian, current
        0, 0, 0, 0, 0, 0, 0, 0,
    ];
    push_u16(&mut out, 3); // e_type: ET_DYN
    push_u16(&mut out, 62); // e_machine: EM_X86_64
    push_u32(&mut out, 1); // e_version
    push_u64(&mut out, 0); // e_entry
    push_u64(&mut out, 0); // e_phoff
    push_u64(&mut out, shoff);
    push_u32(&mut out, 0); // e_flags
    push_u16(&mut out, 64); // e_ehsize
    push_u16(&mut out, 0); // e_phentsize
    push_u16(&mut out, 0); // e_phnum
    push_u16(&mut out, 64); // e_shentsize
    push_u16(&mut out, 5); // e_shnum
    push_u16(&mut out, 4); // e_shstrndx

    out.push(0xc3); // .text
    out.resize(dynsym_off as usize, 0);
    out.extend_from_slice(&dynsym);
    out.extend_from_slice(&dynstr);
    out.extend_from_slice(shstrtab);
    out.resize(shoff as usize, 0);

    // Fields per row: sh_name, sh_type, sh_flags, sh_offset, sh_size,
    // sh_link, sh_info, sh_addralign, sh_entsize.
    let headers: [(u32, u32, u64, u64, u64, u32, u32, u64, u64); 5] = [
        (0, 0, 0, 0, 0, 0, 0, 0, 0),
        (1, 1, 6, text_off, 1, 0, 0, 16, 0), // .text
        (7, 11, 2, dynsym_off, dynsym.len() as u64, 3, 1, 8, 24), // .dynsym
        (15, 3, 2, dynstr_off, dynstr.len() as u64, 0, 0, 1, 0), // .dynstr
        (23, 3, 0, shstrtab_off, shstrtab.len() as u64, 0, 0, 1, 0), // .shstrtab
    ];
    for (name, kind, flags, offset, size, link, info, align, entsize) in headers {
        push_u32(&mut out, name);
        push_u32(&mut out, kind);
        push_u64(&mut out, flags);
        push_u64(&mut out, 0); // sh_addr
        push_u64(&mut out, offset);
        push_u64(&mut out, size);
        push_u32(&mut out, link);
        push_u32(&mut out, info);
        push_u64(&mut out, align);
        push_u64(&mut out, entsize);
    }
    out
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Assembles a GNU-style `!<arch>` archive from named members.
pub fn ar_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"!<arch>\n".to_vec();
    for (name, data) in members {
        out.extend_from_slice(format!("{:<16}", format!("{name}/")).as_bytes());
        out.extend_from_slice(format!("{:<12}", 0).as_bytes());
        out.extend_from_slice(format!("{:<6}", 0).as_bytes());
        out.extend_from_slice(format!("{:<6}", 0).as_bytes());
        out.extend_from_slice(format!("{:<8}", 644).as_bytes());
        out.extend_from_slice(format!("{:<10}", data.len()).as_bytes());
        out.extend_from_slice(b"`\n");
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    out
}
