//! ELF64 section headers.

use crate::LoadError;

// Section types
pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_DYNSYM: u32 = 11;

// Section flags
pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;

/// A parsed ELF64 section header.
#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// Section name (index into the section name string table).
    pub sh_name: u32,
    /// Section type.
    pub sh_type: u32,
    /// Section flags.
    pub sh_flags: u64,
    /// Virtual address in memory.
    pub sh_addr: u64,
    /// Offset in file.
    pub sh_offset: u64,
    /// Size in bytes.
    pub sh_size: u64,
    /// Link to another section.
    pub sh_link: u32,
    /// Additional section info.
    pub sh_info: u32,
    /// Address alignment.
    pub sh_addralign: u64,
    /// Entry size (for tables).
    pub sh_entsize: u64,
    /// Resolved section name (filled in after the string table is read).
    pub name: String,
}

impl SectionHeader {
    /// Size of an ELF64 section header entry.
    pub const SIZE: usize = 64;

    /// Parse a section header from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < Self::SIZE {
            return Err(LoadError::too_short(Self::SIZE, data.len()));
        }

        let read_u32 = |offset: usize| -> u32 {
            u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };

        let read_u64 = |offset: usize| -> u64 {
            u64::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
                data[offset + 4],
                data[offset + 5],
                data[offset + 6],
                data[offset + 7],
            ])
        };

        Ok(Self {
            sh_name: read_u32(0),
            sh_type: read_u32(4),
            sh_flags: read_u64(8),
            sh_addr: read_u64(16),
            sh_offset: read_u64(24),
            sh_size: read_u64(32),
            sh_link: read_u32(40),
            sh_info: read_u32(44),
            sh_addralign: read_u64(48),
            sh_entsize: read_u64(56),
            name: String::new(),
        })
    }

    /// Whether this section holds executable instructions.
    pub fn is_executable(&self) -> bool {
        self.sh_flags & SHF_EXECINSTR != 0
    }

    /// Whether this section occupies space in the file image.
    pub fn has_file_data(&self) -> bool {
        self.sh_type != SHT_NULL && self.sh_type != SHT_NOBITS
    }

    /// Returns the section type as a string.
    pub fn type_name(&self) -> &'static str {
        match self.sh_type {
            SHT_NULL => "NULL",
            SHT_PROGBITS => "PROGBITS",
            SHT_SYMTAB => "SYMTAB",
            SHT_STRTAB => "STRTAB",
            SHT_NOBITS => "NOBITS",
            SHT_DYNSYM => "DYNSYM",
            _ => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_section() {
        let mut data = vec![0u8; SectionHeader::SIZE];
        data[0..4].copy_from_slice(&1u32.to_le_bytes()); // sh_name
        data[4..8].copy_from_slice(&SHT_PROGBITS.to_le_bytes());
        data[8..16].copy_from_slice(&(SHF_ALLOC | SHF_EXECINSTR).to_le_bytes());
        data[16..24].copy_from_slice(&0x10000u64.to_le_bytes()); // addr
        data[24..32].copy_from_slice(&0x1000u64.to_le_bytes()); // offset
        data[32..40].copy_from_slice(&0x80u64.to_le_bytes()); // size

        let shdr = SectionHeader::parse(&data).unwrap();
        assert!(shdr.is_executable());
        assert!(shdr.has_file_data());
        assert_eq!(shdr.sh_addr, 0x10000);
        assert_eq!(shdr.type_name(), "PROGBITS");
    }

    #[test]
    fn reject_truncated() {
        let result = SectionHeader::parse(&[0u8; 32]);
        assert!(matches!(result, Err(LoadError::TooShort { .. })));
    }
}
