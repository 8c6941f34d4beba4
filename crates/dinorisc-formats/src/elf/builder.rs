//! Test fixture builder for minimal RISC-V ELF64 executables.
//!
//! Producing guest binaries with a cross-compiler would tie the test suite to
//! an external toolchain. Instead this builder emits just enough of a valid
//! statically linked executable (header, PT_LOAD segments, symbol table) for
//! the loader and engine to consume.

use super::header::{ELF_MAGIC, EM_RISCV};
use super::section::{SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_PROGBITS, SHT_STRTAB, SHT_SYMTAB};
use super::segment::{PF_R, PF_W, PF_X, PT_LOAD};
use super::symbol::STT_FUNC;

struct Segment {
    vaddr: u64,
    bytes: Vec<u8>,
    memsz: u64,
    executable: bool,
}

/// Builds a minimal statically linked RISC-V ELF64 executable in memory.
pub struct ElfBuilder {
    entry: u64,
    machine: u16,
    segments: Vec<Segment>,
    symbols: Vec<(String, u64)>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            entry: 0,
            machine: EM_RISCV,
            segments: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Set the entry point address.
    pub fn entry(mut self, addr: u64) -> Self {
        self.entry = addr;
        self
    }

    /// Override the machine type, for negative tests.
    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Add an executable segment (and matching `.text` section) at `vaddr`.
    pub fn text(mut self, vaddr: u64, code: &[u8]) -> Self {
        self.segments.push(Segment {
            vaddr,
            bytes: code.to_vec(),
            memsz: code.len() as u64,
            executable: true,
        });
        self
    }

    /// Add a read-write data segment at `vaddr`.
    pub fn data(self, vaddr: u64, bytes: &[u8]) -> Self {
        let memsz = bytes.len() as u64;
        self.data_with_bss(vaddr, bytes, memsz)
    }

    /// Add a data segment whose memory size exceeds its file size; the tail
    /// is BSS.
    pub fn data_with_bss(mut self, vaddr: u64, bytes: &[u8], memsz: u64) -> Self {
        self.segments.push(Segment {
            vaddr,
            bytes: bytes.to_vec(),
            memsz,
            executable: false,
        });
        self
    }

    /// Add a defined function symbol.
    pub fn symbol(mut self, name: &str, addr: u64) -> Self {
        self.symbols.push((name.to_string(), addr));
        self
    }

    /// Serialize the executable.
    pub fn build(self) -> Vec<u8> {
        const EHDR_SIZE: usize = 64;
        const PHDR_SIZE: usize = 56;
        const SHDR_SIZE: usize = 64;
        const SYM_SIZE: usize = 24;

        let phnum = self.segments.len();
        let mut file = Vec::new();
        file.resize(EHDR_SIZE + phnum * PHDR_SIZE, 0);

        // Segment blobs, recording each file offset.
        let mut seg_offsets = Vec::with_capacity(phnum);
        for seg in &self.segments {
            seg_offsets.push(file.len() as u64);
            file.extend_from_slice(&seg.bytes);
        }

        // Section name string table.
        let mut shstrtab = vec![0u8];
        let sh_name = |table: &mut Vec<u8>, name: &str| -> u32 {
            let offset = table.len() as u32;
            table.extend_from_slice(name.as_bytes());
            table.push(0);
            offset
        };

        // Symbol string table and symbol entries (leading null entry).
        let mut strtab = vec![0u8];
        let mut symtab = vec![0u8; SYM_SIZE];
        for (name, addr) in &self.symbols {
            let name_off = strtab.len() as u32;
            strtab.extend_from_slice(name.as_bytes());
            strtab.push(0);

            let mut entry = [0u8; SYM_SIZE];
            entry[0..4].copy_from_slice(&name_off.to_le_bytes());
            entry[4] = (1 << 4) | STT_FUNC; // global function
            entry[6..8].copy_from_slice(&1u16.to_le_bytes()); // first section
            entry[8..16].copy_from_slice(&addr.to_le_bytes());
            symtab.extend_from_slice(&entry);
        }

        let symtab_offset = file.len() as u64;
        file.extend_from_slice(&symtab);
        let strtab_offset = file.len() as u64;
        file.extend_from_slice(&strtab);

        // Section headers: null, one per segment, .symtab, .strtab, .shstrtab.
        let mut shdrs: Vec<[u8; SHDR_SIZE]> = vec![[0u8; SHDR_SIZE]];
        for (seg, &offset) in self.segments.iter().zip(&seg_offsets) {
            let (name, flags) = if seg.executable {
                (".text", SHF_ALLOC | SHF_EXECINSTR)
            } else {
                (".data", SHF_ALLOC | SHF_WRITE)
            };
            shdrs.push(make_shdr(
                sh_name(&mut shstrtab, name),
                SHT_PROGBITS,
                flags,
                seg.vaddr,
                offset,
                seg.bytes.len() as u64,
                0,
                0,
            ));
        }

        let strtab_index = (shdrs.len() + 1) as u32;
        shdrs.push(make_shdr(
            sh_name(&mut shstrtab, ".symtab"),
            SHT_SYMTAB,
            0,
            0,
            symtab_offset,
            symtab.len() as u64,
            strtab_index,
            SYM_SIZE as u64,
        ));
        shdrs.push(make_shdr(
            sh_name(&mut shstrtab, ".strtab"),
            SHT_STRTAB,
            0,
            0,
            strtab_offset,
            strtab.len() as u64,
            0,
            0,
        ));
        let shstrtab_name = sh_name(&mut shstrtab, ".shstrtab");
        let shstrtab_offset = file.len() as u64;
        file.extend_from_slice(&shstrtab);
        shdrs.push(make_shdr(
            shstrtab_name,
            SHT_STRTAB,
            0,
            0,
            shstrtab_offset,
            shstrtab.len() as u64,
            0,
            0,
        ));

        let shoff = file.len() as u64;
        for shdr in &shdrs {
            file.extend_from_slice(shdr);
        }

        // Program headers.
        for (i, (seg, &offset)) in self.segments.iter().zip(&seg_offsets).enumerate() {
            let flags = if seg.executable { PF_R | PF_X } else { PF_R | PF_W };
            let base = EHDR_SIZE + i * PHDR_SIZE;
            let phdr = &mut file[base..base + PHDR_SIZE];
            phdr[0..4].copy_from_slice(&PT_LOAD.to_le_bytes());
            phdr[4..8].copy_from_slice(&flags.to_le_bytes());
            phdr[8..16].copy_from_slice(&offset.to_le_bytes());
            phdr[16..24].copy_from_slice(&seg.vaddr.to_le_bytes());
            phdr[24..32].copy_from_slice(&seg.vaddr.to_le_bytes());
            phdr[32..40].copy_from_slice(&(seg.bytes.len() as u64).to_le_bytes());
            phdr[40..48].copy_from_slice(&seg.memsz.to_le_bytes());
            phdr[48..56].copy_from_slice(&4u64.to_le_bytes());
        }

        // ELF header.
        file[0..4].copy_from_slice(&ELF_MAGIC);
        file[4] = 2; // ELFCLASS64
        file[5] = 1; // little-endian
        file[6] = 1; // EV_CURRENT
        file[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
        file[18..20].copy_from_slice(&self.machine.to_le_bytes());
        file[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
        file[24..32].copy_from_slice(&self.entry.to_le_bytes());
        file[32..40].copy_from_slice(&(EHDR_SIZE as u64).to_le_bytes()); // e_phoff
        file[40..48].copy_from_slice(&shoff.to_le_bytes());
        file[52..54].copy_from_slice(&(EHDR_SIZE as u16).to_le_bytes()); // e_ehsize
        file[54..56].copy_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
        file[56..58].copy_from_slice(&(phnum as u16).to_le_bytes());
        file[58..60].copy_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
        file[60..62].copy_from_slice(&(shdrs.len() as u16).to_le_bytes());
        file[62..64].copy_from_slice(&((shdrs.len() - 1) as u16).to_le_bytes()); // .shstrtab

        file
    }
}

#[allow(clippy::too_many_arguments)]
fn make_shdr(
    name: u32,
    sh_type: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    entsize: u64,
) -> [u8; 64] {
    let mut shdr = [0u8; 64];
    shdr[0..4].copy_from_slice(&name.to_le_bytes());
    shdr[4..8].copy_from_slice(&sh_type.to_le_bytes());
    shdr[8..16].copy_from_slice(&flags.to_le_bytes());
    shdr[16..24].copy_from_slice(&addr.to_le_bytes());
    shdr[24..32].copy_from_slice(&offset.to_le_bytes());
    shdr[32..40].copy_from_slice(&size.to_le_bytes());
    shdr[40..44].copy_from_slice(&link.to_le_bytes());
    shdr[56..64].copy_from_slice(&entsize.to_le_bytes());
    shdr
}
