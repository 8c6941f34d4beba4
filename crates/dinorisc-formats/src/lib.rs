//! # dinorisc-formats
//!
//! ELF binary loading for dinorisc. This crate parses statically linked
//! RISC-V ELF64 executables into an [`ElfImage`]: the entry point, the
//! loadable segments, the executable sections, and a symbol-name to
//! virtual-address map.
//!
//! The parser is built from scratch and treats its input as untrusted:
//! every field read is bounds-checked and offset arithmetic is checked
//! rather than wrapping.

pub mod elf;
pub mod error;

pub use elf::builder::ElfBuilder;
pub use elf::{ElfHeader, ElfImage, ProgramHeader, SectionHeader, SymbolEntry};
pub use error::LoadError;
