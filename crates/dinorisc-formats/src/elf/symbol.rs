//! ELF64 symbol table entries.

use crate::LoadError;

// Symbol type (lower 4 bits of st_info)
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;

/// Undefined section index.
pub const SHN_UNDEF: u16 = 0;

/// A raw ELF64 symbol table entry.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    /// Symbol name (index into the linked string table).
    pub st_name: u32,
    /// Symbol info (type and binding).
    pub st_info: u8,
    /// Symbol visibility.
    pub st_other: u8,
    /// Section index.
    pub st_shndx: u16,
    /// Symbol value (address).
    pub st_value: u64,
    /// Symbol size.
    pub st_size: u64,
}

impl SymbolEntry {
    /// Size of an ELF64 symbol table entry.
    pub const SIZE: usize = 24;

    /// Parse a symbol entry from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < Self::SIZE {
            return Err(LoadError::too_short(Self::SIZE, data.len()));
        }

        let read_u16 = |offset: usize| -> u16 {
            u16::from_le_bytes([data[offset], data[offset + 1]])
        };

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
            st_name: read_u32(0),
            st_info: data[4],
            st_other: data[5],
            st_shndx: read_u16(6),
            st_value: read_u64(8),
            st_size: read_u64(16),
        })
    }

    /// Returns the symbol type (lower 4 bits of `st_info`).
    pub fn kind(&self) -> u8 {
        self.st_info & 0xf
    }

    /// Whether this entry names a defined address worth indexing. Undefined
    /// symbols, unnamed entries, and kinds that do not name an address
    /// (section and file entries) are skipped.
    pub fn is_defined(&self) -> bool {
        self.st_shndx != SHN_UNDEF
            && self.st_name != 0
            && matches!(self.kind(), STT_NOTYPE | STT_OBJECT | STT_FUNC)
    }
}
