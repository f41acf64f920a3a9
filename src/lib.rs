//! Multi-format linker core library.
//!
//! This library provides the core components for the `xld` linker.
//! It is organized into several modules:
//! - `mem`: the link-lifetime arena, string saver, and reset registry.
//! - `atom`: the four atom kinds and their slabs.
//! - `file`: the parse-once input file interface.
//! - `input`: input mapping, archive expansion, and object scanning.
//! - `resolve`: name-level symbol accounting.
//! - `map`: the link map output artifact.
//! - `link`: the pipeline shared by the backends.
//! - `elf`, `coff`, `mach_o`, `wasm`, `mingw`: the per-format entry points.
//! - `driver`: flavor selection and dispatch.
//! - `config`: CLI configuration.

pub mod atom;
pub mod coff;
pub mod config;
pub mod driver;
pub mod elf;
pub mod error;
pub mod file;
pub mod input;
pub mod link;
pub mod mach_o;
pub mod map;
pub mod mem;
pub mod mingw;
pub mod resolve;
pub mod utils;
pub mod wasm;
