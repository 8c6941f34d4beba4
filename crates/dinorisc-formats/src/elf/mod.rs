//! ELF (Executable and Linkable Format) parser.
//!
//! Parses the one shape of file dinorisc can execute: statically linked
//! little-endian ELF64 RISC-V executables. All offsets taken from the file
//! headers are bounds-checked against the file before use, so a malformed
//! binary fails with a [`LoadError`] instead of a panic.

pub mod builder;
mod header;
mod section;
mod segment;
mod symbol;

pub use header::{ElfHeader, ELF_MAGIC, EM_RISCV};
pub use section::{SectionHeader, SHF_EXECINSTR, SHT_PROGBITS, SHT_STRTAB, SHT_SYMTAB};
pub use segment::{ProgramHeader, PF_R, PF_W, PF_X, PT_LOAD};
pub use symbol::{SymbolEntry, STT_FUNC};

use crate::LoadError;
use std::collections::BTreeMap;
use tracing::debug;

/// A parsed RISC-V ELF64 executable.
///
/// Owns the raw file bytes so segment and section data can be sliced out
/// without copying.
#[derive(Debug)]
pub struct ElfImage {
    /// Raw bytes of the file.
    data: Vec<u8>,
    /// Parsed ELF header.
    pub header: ElfHeader,
    /// Program headers (segments).
    pub segments: Vec<ProgramHeader>,
    /// Section headers, with names resolved.
    pub sections: Vec<SectionHeader>,
    /// Defined symbol name to virtual address.
    symbols: BTreeMap<String, u64>,
}

impl ElfImage {
    /// Parse an ELF executable from raw bytes.
    pub fn parse(data: Vec<u8>) -> Result<Self, LoadError> {
        let header = ElfHeader::parse(&data)?;

        let segments = Self::parse_program_headers(&data, &header)?;
        let mut sections = Self::parse_section_headers(&data, &header)?;

        // Resolve section names through the section name string table.
        if (header.e_shstrndx as usize) < sections.len() {
            let shstrtab = &sections[header.e_shstrndx as usize];
            let table = StringTable::slice(&data, shstrtab.sh_offset, shstrtab.sh_size);
            for section in &mut sections {
                if let Some(name) = table.get(section.sh_name as usize) {
                    section.name = name.to_string();
                }
            }
        }

        let symbols = Self::parse_symbols(&data, &sections)?;

        debug!(
            segments = segments.len(),
            sections = sections.len(),
            symbols = symbols.len(),
            entry = format_args!("{:#x}", header.e_entry),
            "parsed ELF image"
        );

        Ok(Self {
            data,
            header,
            segments,
            sections,
            symbols,
        })
    }

    fn parse_program_headers(
        data: &[u8],
        header: &ElfHeader,
    ) -> Result<Vec<ProgramHeader>, LoadError> {
        if header.e_phnum > 0 && (header.e_phentsize as usize) < ProgramHeader::SIZE {
            return Err(LoadError::invalid_structure(
                "program header",
                header.e_phoff,
                format!("entry size {} is too small", header.e_phentsize),
            ));
        }

        let mut segments = Vec::with_capacity(header.e_phnum as usize);
        for i in 0..header.e_phnum as u64 {
            let offset = header
                .e_phoff
                .checked_add(i.checked_mul(header.e_phentsize as u64).ok_or(
                    LoadError::Overflow {
                        context: "program header table",
                    },
                )?)
                .ok_or(LoadError::Overflow {
                    context: "program header table",
                })?;
            let entry = checked_slice(data, offset, header.e_phentsize as u64, "program header")?;
            segments.push(ProgramHeader::parse(entry)?);
        }
        Ok(segments)
    }

    fn parse_section_headers(
        data: &[u8],
        header: &ElfHeader,
    ) -> Result<Vec<SectionHeader>, LoadError> {
        if header.e_shnum > 0 && (header.e_shentsize as usize) < SectionHeader::SIZE {
            return Err(LoadError::invalid_structure(
                "section header",
                header.e_shoff,
                format!("entry size {} is too small", header.e_shentsize),
            ));
        }

        let mut sections = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as u64 {
            let offset = header
                .e_shoff
                .checked_add(i.checked_mul(header.e_shentsize as u64).ok_or(
                    LoadError::Overflow {
                        context: "section header table",
                    },
                )?)
                .ok_or(LoadError::Overflow {
                    context: "section header table",
                })?;
            let entry = checked_slice(data, offset, header.e_shentsize as u64, "section header")?;
            sections.push(SectionHeader::parse(entry)?);
        }
        Ok(sections)
    }

    /// Walk `.symtab` and `.dynsym`, indexing every defined named symbol by
    /// address. Entries whose string table is missing or truncated are skipped
    /// rather than treated as fatal.
    fn parse_symbols(
        data: &[u8],
        sections: &[SectionHeader],
    ) -> Result<BTreeMap<String, u64>, LoadError> {
        let mut symbols = BTreeMap::new();

        for section in sections {
            if section.sh_type != section::SHT_SYMTAB && section.sh_type != section::SHT_DYNSYM {
                continue;
            }

            let strtab_idx = section.sh_link as usize;
            if strtab_idx >= sections.len() {
                continue;
            }
            let strtab_section = &sections[strtab_idx];
            let strtab = StringTable::slice(data, strtab_section.sh_offset, strtab_section.sh_size);

            let entry_size = section.sh_entsize;
            if (entry_size as usize) < SymbolEntry::SIZE {
                continue;
            }

            let mut offset = section.sh_offset;
            let end = section
                .sh_offset
                .checked_add(section.sh_size)
                .ok_or(LoadError::Overflow {
                    context: "symbol table",
                })?;
            while offset.checked_add(entry_size).is_some_and(|e| e <= end) {
                let bytes = checked_slice(data, offset, entry_size, "symbol entry")?;
                let entry = SymbolEntry::parse(bytes)?;
                if entry.is_defined() {
                    if let Some(name) = strtab.get(entry.st_name as usize) {
                        symbols.insert(name.to_string(), entry.st_value);
                    }
                }
                offset += entry_size;
            }
        }

        Ok(symbols)
    }

    /// Entry point virtual address from the header.
    pub fn entry_point(&self) -> u64 {
        self.header.e_entry
    }

    /// Look up a defined symbol by name.
    pub fn symbol_address(&self, name: &str) -> Result<u64, LoadError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::symbol_not_found(name))
    }

    /// All defined symbols, sorted by name.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, u64)> {
        self.symbols.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    /// Segments that should be mapped into guest memory.
    pub fn loadable_segments(&self) -> impl Iterator<Item = &ProgramHeader> {
        self.segments.iter().filter(|s| s.is_load())
    }

    /// Sections flagged executable, in file order.
    pub fn executable_sections(&self) -> impl Iterator<Item = &SectionHeader> {
        self.sections.iter().filter(|s| s.is_executable())
    }

    /// File-backed bytes of a segment. The zero-filled tail (`p_memsz` beyond
    /// `p_filesz`) is the caller's concern.
    pub fn segment_file_data(&self, segment: &ProgramHeader) -> Result<&[u8], LoadError> {
        checked_slice(&self.data, segment.p_offset, segment.p_filesz, "segment data")
    }

    /// File bytes of a section.
    pub fn section_data(&self, section: &SectionHeader) -> Result<&[u8], LoadError> {
        if !section.has_file_data() {
            return Ok(&[]);
        }
        checked_slice(&self.data, section.sh_offset, section.sh_size, "section data")
    }
}

/// Slice `len` bytes at `offset` out of `data` with overflow and bounds
/// checks.
fn checked_slice<'a>(
    data: &'a [u8],
    offset: u64,
    len: u64,
    kind: &'static str,
) -> Result<&'a [u8], LoadError> {
    let end = offset.checked_add(len).ok_or(LoadError::Overflow { context: kind })?;
    if end > data.len() as u64 {
        return Err(LoadError::invalid_structure(
            kind,
            offset,
            format!("extends to {:#x}, past end of file ({:#x})", end, data.len()),
        ));
    }
    Ok(&data[offset as usize..end as usize])
}

/// A null-terminated string table.
#[derive(Debug)]
struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Slice a string table out of the file, empty if out of bounds.
    fn slice(data: &'a [u8], offset: u64, size: u64) -> Self {
        match checked_slice(data, offset, size, "string table") {
            Ok(bytes) => Self { data: bytes },
            Err(_) => Self { data: &[] },
        }
    }

    fn get(&self, offset: usize) -> Option<&'a str> {
        if offset >= self.data.len() {
            return None;
        }
        let remaining = &self.data[offset..];
        let end = remaining.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&remaining[..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::builder::ElfBuilder;
    use super::*;

    #[test]
    fn parse_minimal_executable() {
        let file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00]) // nop
            .symbol("main", 0x10000)
            .build();

        let image = ElfImage::parse(file).unwrap();
        assert_eq!(image.entry_point(), 0x10000);
        assert_eq!(image.symbol_address("main").unwrap(), 0x10000);
        assert_eq!(image.loadable_segments().count(), 1);
        assert_eq!(image.executable_sections().count(), 1);
    }

    #[test]
    fn missing_symbol_is_reported_by_name() {
        let file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00])
            .build();

        let image = ElfImage::parse(file).unwrap();
        let err = image.symbol_address("compute").unwrap_err();
        assert!(matches!(err, LoadError::SymbolNotFound { ref name } if name == "compute"));
    }

    #[test]
    fn file_kind_symbols_are_not_indexed() {
        let file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00])
            .symbol("main", 0x10000)
            .build();

        let image = ElfImage::parse(file.clone()).unwrap();
        let symtab = image.sections.iter().find(|s| s.name == ".symtab").unwrap();

        // Flip the entry's kind to STT_FILE; the name must drop out of the
        // index.
        let info_offset = symtab.sh_offset as usize + SymbolEntry::SIZE + 4;
        let mut patched = file;
        patched[info_offset] = 4;
        let image = ElfImage::parse(patched).unwrap();
        assert!(matches!(
            image.symbol_address("main"),
            Err(LoadError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn section_data_round_trips() {
        let code = [0x93u8, 0x08, 0x50, 0x00];
        let file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &code)
            .build();

        let image = ElfImage::parse(file).unwrap();
        let text = image
            .executable_sections()
            .next()
            .map(|s| image.section_data(s).unwrap())
            .unwrap();
        assert_eq!(text, &code);
    }

    #[test]
    fn data_segment_larger_than_file_image() {
        let file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00])
            .data_with_bss(0x20000, &[1, 2, 3, 4], 16)
            .build();

        let image = ElfImage::parse(file).unwrap();
        let data_seg = image
            .loadable_segments()
            .find(|s| s.p_vaddr == 0x20000)
            .unwrap();
        assert_eq!(data_seg.p_filesz, 4);
        assert_eq!(data_seg.p_memsz, 16);
        assert_eq!(image.segment_file_data(data_seg).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn reject_truncated_program_header_table() {
        let mut file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00])
            .build();
        // Point the program header table past the end of the file.
        let len = file.len() as u64;
        file[32..40].copy_from_slice(&len.to_le_bytes());
        let result = ElfImage::parse(file);
        assert!(matches!(result, Err(LoadError::InvalidStructure { .. })));
    }

    #[test]
    fn reject_overflowing_section_offset() {
        let mut file = ElfBuilder::new()
            .entry(0x10000)
            .text(0x10000, &[0x13, 0x00, 0x00, 0x00])
            .build();
        // Section header table offset near u64::MAX forces overflow checks.
        file[40..48].copy_from_slice(&u64::MAX.to_le_bytes());
        let result = ElfImage::parse(file);
        assert!(result.is_err());
    }
}
