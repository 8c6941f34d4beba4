//! The execution engine.
//!
//! [`Engine`] wraps a loaded [`ElfImage`] and offers the two operations the
//! CLI exposes: decode-only validation of every executable section, and
//! execution of a named function through the standard call convention.

use crate::memory::{GuestMemory, MapError};
use crate::state::RegisterFile;
use crate::{EngineError, Fault};
use dinorisc_formats::{ElfImage, LoadError};
use dinorisc_isa::{decode, BranchCond, Instruction, IntOp, IntOp32, LoadKind, Reg, StoreKind};
use tracing::{debug, trace};

/// The return address planted in `ra` before calling into the guest.
///
/// It is 4-byte aligned, and segment loading refuses to map anything over
/// it, so the run loop can use pc equality as the sole termination test: a
/// guest that jumps anywhere near it by accident faults on the fetch
/// instead.
pub const RETURN_SENTINEL: u64 = 0xffff_ffff_ffff_0000;

/// Tunables for guest execution.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum instructions per `run_function` call.
    pub max_steps: u64,
    /// Highest address of the guest stack (exclusive).
    pub stack_top: u64,
    /// Stack region size in bytes.
    pub stack_size: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000_000,
            stack_top: 0x7fff_ffff_0000,
            stack_size: 0x10_0000,
        }
    }
}

/// Per-section result of a decode-only validation pass.
#[derive(Debug, Clone)]
pub struct SectionReport {
    /// Section name, e.g. `.text`.
    pub name: String,
    /// Section virtual address.
    pub address: u64,
    /// Instructions decoded.
    pub instructions: u64,
}

/// Result of a decode-only validation pass.
#[derive(Debug, Clone, Default)]
pub struct DecodeReport {
    /// One entry per executable section, in file order.
    pub sections: Vec<SectionReport>,
}

impl DecodeReport {
    /// Total instructions decoded across all sections.
    pub fn total_instructions(&self) -> u64 {
        self.sections.iter().map(|s| s.instructions).sum()
    }
}

/// A loaded guest binary plus execution configuration.
pub struct Engine {
    image: ElfImage,
    config: EngineConfig,
}

impl Engine {
    pub fn new(image: ElfImage) -> Self {
        Self::with_config(image, EngineConfig::default())
    }

    pub fn with_config(image: ElfImage, config: EngineConfig) -> Self {
        Self { image, config }
    }

    pub fn image(&self) -> &ElfImage {
        &self.image
    }

    /// Decode every word of every executable section, stopping at the first
    /// failure. Instructions are decoded linearly from the section start;
    /// nothing is executed.
    pub fn validate(&self) -> Result<DecodeReport, EngineError> {
        let mut report = DecodeReport::default();

        for section in self.image.executable_sections() {
            let data = self.image.section_data(section)?;
            let base = section.sh_addr;

            let mut count = 0u64;
            let mut chunks = data.chunks_exact(4);
            for (i, chunk) in chunks.by_ref().enumerate() {
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // sh_addr is untrusted; a section placed near the top of the
                // address space must not wrap the diagnostic address.
                let address = base.checked_add((i as u64) * 4).ok_or(LoadError::Overflow {
                    context: "section address",
                })?;
                decode(word, address)?;
                count += 1;
            }
            let tail = chunks.remainder();
            if !tail.is_empty() {
                let address = base.checked_add(count * 4).ok_or(LoadError::Overflow {
                    context: "section address",
                })?;
                return Err(dinorisc_isa::DecodeError::truncated(address, 4, tail.len()).into());
            }

            debug!(
                section = %section.name,
                address = format_args!("{base:#x}"),
                instructions = count,
                "validated section"
            );
            report.sections.push(SectionReport {
                name: section.name.clone(),
                address: base,
                instructions: count,
            });
        }

        Ok(report)
    }

    /// Call the named function with up to eight integer arguments and run it
    /// to completion. Returns the value left in `a0`.
    pub fn run_function(&self, name: &str, args: &[u64]) -> Result<u64, EngineError> {
        let entry = self.image.symbol_address(name)?;
        let mut machine = self.new_machine()?;

        machine.regs.write(Reg::RA, RETURN_SENTINEL);
        machine.regs.write(Reg::SP, self.config.stack_top - 16);
        for (i, &arg) in args.iter().take(8).enumerate() {
            machine.regs.write(Reg::new(Reg::A0.index() as u8 + i as u8), arg);
        }
        machine.pc = entry;

        debug!(
            function = name,
            entry = format_args!("{entry:#x}"),
            sp = format_args!("{:#x}", self.config.stack_top - 16),
            "calling guest function"
        );

        let result = machine.run()?;
        debug!(function = name, result, steps = machine.steps, "guest function returned");
        Ok(result)
    }

    /// Build a fresh machine: registers zeroed, PT_LOAD segments mapped with
    /// their BSS tails zero-filled, and the stack region mapped.
    fn new_machine(&self) -> Result<Machine, EngineError> {
        let mut memory = GuestMemory::new();

        for segment in self.image.loadable_segments() {
            if segment.p_memsz == 0 {
                continue;
            }
            // A mapping containing the sentinel would make a genuine jump
            // there indistinguishable from the function returning.
            let end = segment
                .p_vaddr
                .checked_add(segment.p_memsz)
                .ok_or(LoadError::Overflow { context: "segment" })?;
            if segment.p_vaddr < RETURN_SENTINEL + 4 && end > RETURN_SENTINEL {
                return Err(LoadError::invalid_structure(
                    "segment",
                    segment.p_vaddr,
                    "overlaps the return address sentinel",
                )
                .into());
            }
            let data = self.image.segment_file_data(segment)?;
            memory
                .map(segment.p_vaddr, segment.p_memsz, data)
                .map_err(|e| map_error_to_load(segment.p_vaddr, e))?;
        }

        let stack_base = self.config.stack_top - self.config.stack_size;
        memory
            .map(stack_base, self.config.stack_size, &[])
            .map_err(|e| map_error_to_load(stack_base, e))?;

        Ok(Machine {
            regs: RegisterFile::new(),
            pc: 0,
            memory,
            steps: 0,
            max_steps: self.config.max_steps,
        })
    }
}

fn map_error_to_load(base: u64, err: MapError) -> EngineError {
    LoadError::invalid_structure("segment", base, err.to_string()).into()
}

/// A running guest: registers, pc, memory, and the step budget.
pub struct Machine {
    pub regs: RegisterFile,
    pub pc: u64,
    pub memory: GuestMemory,
    pub steps: u64,
    max_steps: u64,
}

impl Machine {
    /// Run until the pc reaches [`RETURN_SENTINEL`], then return `a0`.
    pub fn run(&mut self) -> Result<u64, Fault> {
        while self.pc != RETURN_SENTINEL {
            self.step()?;
        }
        Ok(self.regs.read(Reg::A0))
    }

    /// Fetch, decode, and execute one instruction.
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.steps >= self.max_steps {
            return Err(Fault::StepLimitExceeded {
                limit: self.max_steps,
            });
        }
        self.steps += 1;

        let insn = self.fetch()?;
        trace!(pc = format_args!("{:#x}", self.pc), %insn, "step");
        self.execute(insn)
    }

    /// Fetch and decode the word at pc. Fetches must be 4-byte aligned; a
    /// misaligned branch target is caught here on the next step.
    fn fetch(&self) -> Result<Instruction, Fault> {
        if self.pc % 4 != 0 {
            return Err(Fault::MisalignedFetch { address: self.pc });
        }
        let word = self
            .memory
            .read_u32(self.pc)
            .map_err(|_| Fault::InstructionFetch { address: self.pc })?;
        Ok(decode(word, self.pc)?)
    }

    fn execute(&mut self, insn: Instruction) -> Result<(), Fault> {
        let mut next_pc = self.pc.wrapping_add(4);

        match insn {
            Instruction::Lui { rd, imm } => {
                self.regs.write(rd, imm as u64);
            }
            Instruction::Auipc { rd, imm } => {
                self.regs.write(rd, self.pc.wrapping_add(imm as u64));
            }
            Instruction::Jal { rd, offset } => {
                self.regs.write(rd, self.pc.wrapping_add(4));
                next_pc = self.pc.wrapping_add(offset as u64);
            }
            Instruction::Jalr { rd, rs1, offset } => {
                // Read the target before writing rd; rs1 and rd may alias.
                let target = self.regs.read(rs1).wrapping_add(offset as u64) & !1;
                self.regs.write(rd, self.pc.wrapping_add(4));
                next_pc = target;
            }
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => {
                if branch_taken(cond, self.regs.read(rs1), self.regs.read(rs2)) {
                    next_pc = self.pc.wrapping_add(offset as u64);
                }
            }
            Instruction::Load {
                kind,
                rd,
                rs1,
                offset,
            } => {
                let address = self.regs.read(rs1).wrapping_add(offset as u64);
                let value = self.load(kind, address)?;
                self.regs.write(rd, value);
            }
            Instruction::Store {
                kind,
                rs1,
                rs2,
                offset,
            } => {
                let address = self.regs.read(rs1).wrapping_add(offset as u64);
                self.store(kind, address, self.regs.read(rs2))?;
            }
            Instruction::OpImm { op, rd, rs1, imm } => {
                let value = alu(op, self.regs.read(rs1), imm as u64);
                self.regs.write(rd, value);
            }
            Instruction::Op { op, rd, rs1, rs2 } => {
                let value = alu(op, self.regs.read(rs1), self.regs.read(rs2));
                self.regs.write(rd, value);
            }
            Instruction::OpImm32 { op, rd, rs1, imm } => {
                let value = alu32(op, self.regs.read(rs1), imm as u64);
                self.regs.write(rd, value);
            }
            Instruction::Op32 { op, rd, rs1, rs2 } => {
                let value = alu32(op, self.regs.read(rs1), self.regs.read(rs2));
                self.regs.write(rd, value);
            }
            Instruction::Ecall | Instruction::Ebreak => {
                return Err(Fault::UnhandledEnvironmentCall { address: self.pc });
            }
            Instruction::Fence => {}
        }

        self.pc = next_pc;
        Ok(())
    }

    /// Read `kind.width()` bytes and zero- or sign-extend per the load kind.
    /// A failed access faults with the access width.
    fn load(&self, kind: LoadKind, address: u64) -> Result<u64, Fault> {
        let mut buf = [0u8; 8];
        self.memory
            .read_bytes(address, &mut buf[..kind.width() as usize])?;
        let raw = u64::from_le_bytes(buf);
        Ok(match kind {
            LoadKind::Lb => raw as u8 as i8 as i64 as u64,
            LoadKind::Lh => raw as u16 as i16 as i64 as u64,
            LoadKind::Lw => raw as u32 as i32 as i64 as u64,
            LoadKind::Ld | LoadKind::Lbu | LoadKind::Lhu | LoadKind::Lwu => raw,
        })
    }

    fn store(&mut self, kind: StoreKind, address: u64, value: u64) -> Result<(), Fault> {
        let bytes = value.to_le_bytes();
        self.memory
            .write_bytes(address, &bytes[..kind.width() as usize])
    }
}

fn branch_taken(cond: BranchCond, a: u64, b: u64) -> bool {
    match cond {
        BranchCond::Eq => a == b,
        BranchCond::Ne => a != b,
        BranchCond::Lt => (a as i64) < (b as i64),
        BranchCond::Ge => (a as i64) >= (b as i64),
        BranchCond::Ltu => a < b,
        BranchCond::Geu => a >= b,
    }
}

/// 64-bit ALU. Shift amounts use the low 6 bits of the second operand.
fn alu(op: IntOp, a: u64, b: u64) -> u64 {
    match op {
        IntOp::Add => a.wrapping_add(b),
        IntOp::Sub => a.wrapping_sub(b),
        IntOp::Sll => a.wrapping_shl(b as u32 & 0x3f),
        IntOp::Slt => ((a as i64) < (b as i64)) as u64,
        IntOp::Sltu => (a < b) as u64,
        IntOp::Xor => a ^ b,
        IntOp::Srl => a.wrapping_shr(b as u32 & 0x3f),
        IntOp::Sra => ((a as i64).wrapping_shr(b as u32 & 0x3f)) as u64,
        IntOp::Or => a | b,
        IntOp::And => a & b,
    }
}

/// 32-bit ALU (the `.w` forms): compute on the low 32 bits, sign-extend the
/// result. Shift amounts use the low 5 bits.
fn alu32(op: IntOp32, a: u64, b: u64) -> u64 {
    let a = a as u32;
    let b = b as u32;
    let result = match op {
        IntOp32::Add => a.wrapping_add(b),
        IntOp32::Sub => a.wrapping_sub(b),
        IntOp32::Sll => a.wrapping_shl(b & 0x1f),
        IntOp32::Srl => a.wrapping_shr(b & 0x1f),
        IntOp32::Sra => ((a as i32).wrapping_shr(b & 0x1f)) as u32,
    };
    result as i32 as i64 as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alu_semantics() {
        assert_eq!(alu(IntOp::Add, u64::MAX, 1), 0);
        assert_eq!(alu(IntOp::Sub, 0, 1), u64::MAX);
        assert_eq!(alu(IntOp::Slt, (-1i64) as u64, 0), 1);
        assert_eq!(alu(IntOp::Sltu, (-1i64) as u64, 0), 0);
        assert_eq!(alu(IntOp::Sra, (-8i64) as u64, 3), (-1i64) as u64);
        assert_eq!(alu(IntOp::Srl, (-8i64) as u64, 3), 0x1fff_ffff_ffff_ffff);
        // Only the low 6 bits of the shift amount apply.
        assert_eq!(alu(IntOp::Sll, 1, 64), 1);
    }

    #[test]
    fn alu32_sign_extends() {
        // 0x7fffffff + 1 wraps to i32::MIN and sign-extends.
        assert_eq!(alu32(IntOp32::Add, 0x7fff_ffff, 1), 0xffff_ffff_8000_0000);
        assert_eq!(alu32(IntOp32::Sub, 0, 1), u64::MAX);
        // The high half of the inputs is ignored.
        assert_eq!(alu32(IntOp32::Add, 0xdead_beef_0000_0001, 1), 2);
        assert_eq!(alu32(IntOp32::Sra, 0x8000_0000, 31), u64::MAX);
    }

    #[test]
    fn branch_conditions() {
        let neg = (-1i64) as u64;
        assert!(branch_taken(BranchCond::Lt, neg, 0));
        assert!(!branch_taken(BranchCond::Ltu, neg, 0));
        assert!(branch_taken(BranchCond::Geu, neg, 0));
        assert!(branch_taken(BranchCond::Eq, 7, 7));
        assert!(branch_taken(BranchCond::Ne, 7, 8));
        assert!(branch_taken(BranchCond::Ge, 7, 7));
    }

    #[test]
    fn sentinel_is_aligned_and_high() {
        assert_eq!(RETURN_SENTINEL % 4, 0);
        assert!(RETURN_SENTINEL > 0x7fff_ffff_0000);
    }
}
