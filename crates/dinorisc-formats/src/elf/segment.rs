//! ELF64 program headers.

use crate::LoadError;

/// Loadable segment type.
pub const PT_LOAD: u32 = 1;

/// Segment is executable.
pub const PF_X: u32 = 0x1;
/// Segment is writable.
pub const PF_W: u32 = 0x2;
/// Segment is readable.
pub const PF_R: u32 = 0x4;

/// A single ELF64 program header.
#[derive(Debug, Clone)]
pub struct ProgramHeader {
    /// Segment type.
    pub p_type: u32,
    /// Segment flags.
    pub p_flags: u32,
    /// File offset of segment data.
    pub p_offset: u64,
    /// Virtual address of the segment in memory.
    pub p_vaddr: u64,
    /// Physical address, unused here.
    pub p_paddr: u64,
    /// Number of bytes in the file image.
    pub p_filesz: u64,
    /// Number of bytes in the memory image. May exceed `p_filesz`; the
    /// difference is zero-filled (BSS).
    pub p_memsz: u64,
    /// Required alignment.
    pub p_align: u64,
}

impl ProgramHeader {
    /// Size of an ELF64 program header entry.
    pub const SIZE: usize = 56;

    /// Parse a program header from bytes.
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
            p_type: read_u32(0),
            p_flags: read_u32(4),
            p_offset: read_u64(8),
            p_vaddr: read_u64(16),
            p_paddr: read_u64(24),
            p_filesz: read_u64(32),
            p_memsz: read_u64(40),
            p_align: read_u64(48),
        })
    }

    /// Whether this segment should be mapped into guest memory.
    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }

    /// Whether this segment contains executable code.
    pub fn is_executable(&self) -> bool {
        self.p_flags & PF_X != 0
    }

    /// Render the flags in `rwx` style, e.g. `r-x`.
    pub fn flags_string(&self) -> String {
        let mut s = String::with_capacity(3);
        s.push(if self.p_flags & PF_R != 0 { 'r' } else { '-' });
        s.push(if self.p_flags & PF_W != 0 { 'w' } else { '-' });
        s.push(if self.p_flags & PF_X != 0 { 'x' } else { '-' });
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_phdr() -> Vec<u8> {
        let mut data = vec![0u8; ProgramHeader::SIZE];
        data[0..4].copy_from_slice(&PT_LOAD.to_le_bytes());
        data[4..8].copy_from_slice(&(PF_R | PF_X).to_le_bytes());
        data[8..16].copy_from_slice(&0x1000u64.to_le_bytes()); // offset
        data[16..24].copy_from_slice(&0x10000u64.to_le_bytes()); // vaddr
        data[32..40].copy_from_slice(&0x200u64.to_le_bytes()); // filesz
        data[40..48].copy_from_slice(&0x400u64.to_le_bytes()); // memsz
        data
    }

    #[test]
    fn parse_load_segment() {
        let phdr = ProgramHeader::parse(&sample_phdr()).unwrap();
        assert!(phdr.is_load());
        assert!(phdr.is_executable());
        assert_eq!(phdr.p_vaddr, 0x10000);
        assert_eq!(phdr.p_filesz, 0x200);
        assert_eq!(phdr.p_memsz, 0x400);
        assert_eq!(phdr.flags_string(), "r-x");
    }

    #[test]
    fn reject_truncated() {
        let result = ProgramHeader::parse(&[0u8; 20]);
        assert!(matches!(result, Err(LoadError::TooShort { .. })));
    }
}
