//! ELF64 header parsing and validation.

use crate::LoadError;

/// ELF magic bytes.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// `e_machine` value for RISC-V.
pub const EM_RISCV: u16 = 243;

const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ET_EXEC: u16 = 2;

/// Parsed ELF64 header.
///
/// Only the configuration dinorisc can run is accepted: 64-bit class,
/// little-endian, machine RISC-V, statically linked executable. Everything
/// else fails with [`LoadError::UnsupportedFormat`] at parse time so later
/// stages never see a binary they cannot handle.
#[derive(Debug, Clone)]
pub struct ElfHeader {
    /// Entry point virtual address.
    pub e_entry: u64,
    /// Program header table file offset.
    pub e_phoff: u64,
    /// Section header table file offset.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Program header table entry size.
    pub e_phentsize: u16,
    /// Program header table entry count.
    pub e_phnum: u16,
    /// Section header table entry size.
    pub e_shentsize: u16,
    /// Section header table entry count.
    pub e_shnum: u16,
    /// Section name string table index.
    pub e_shstrndx: u16,
}

impl ElfHeader {
    /// Size of the ELF identification bytes.
    const EI_NIDENT: usize = 16;

    /// Size of a full ELF64 header.
    pub const SIZE: usize = 64;

    /// Parse and validate an ELF64 header from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < Self::EI_NIDENT {
            return Err(LoadError::too_short(Self::EI_NIDENT, data.len()));
        }

        if data[0..4] != ELF_MAGIC {
            return Err(LoadError::invalid_magic(&data[0..4]));
        }

        if data[4] != ELFCLASS64 {
            return Err(LoadError::unsupported(format!(
                "ELF class {} (only ELFCLASS64 is supported)",
                data[4]
            )));
        }

        if data[5] != ELFDATA2LSB {
            return Err(LoadError::unsupported(format!(
                "ELF data encoding {} (only little-endian is supported)",
                data[5]
            )));
        }

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

        let file_type = read_u16(16);
        if file_type != ET_EXEC {
            return Err(LoadError::unsupported(format!(
                "ELF type {file_type} (only statically linked executables are supported)"
            )));
        }

        let machine = read_u16(18);
        if machine != EM_RISCV {
            return Err(LoadError::unsupported(format!(
                "machine type {machine} (expected RISC-V, {EM_RISCV})"
            )));
        }

        Ok(Self {
            e_entry: read_u64(24),
            e_phoff: read_u64(32),
            e_shoff: read_u64(40),
            e_flags: read_u32(48),
            e_phentsize: read_u16(54),
            e_phnum: read_u16(56),
            e_shentsize: read_u16(58),
            e_shnum: read_u16(60),
            e_shstrndx: read_u16(62),
        })
    }
}
