//! RV64I instruction representation.
//!
//! Decoded instructions are a closed enum grouped by encoding format rather
//! than one variant per mnemonic. The executor matches on the format and
//! dispatches on the inner operation kind, which keeps the arithmetic for
//! each format (immediate widths, pc-relative offsets) in one place.

use std::fmt;

/// A guest general-purpose register, x0 through x31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(u8);

impl Reg {
    pub const ZERO: Reg = Reg(0);
    pub const RA: Reg = Reg(1);
    pub const SP: Reg = Reg(2);
    pub const T0: Reg = Reg(5);
    pub const A0: Reg = Reg(10);
    pub const A1: Reg = Reg(11);
    pub const A2: Reg = Reg(12);
    pub const A3: Reg = Reg(13);
    pub const A4: Reg = Reg(14);
    pub const A5: Reg = Reg(15);

    /// Construct from a 5-bit encoding field. Masks to the low 5 bits.
    pub const fn new(index: u8) -> Self {
        Reg(index & 0x1f)
    }

    /// Register index, 0..=31.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// ABI name, e.g. `sp` or `a0`.
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 32] = [
            "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3",
            "a4", "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11",
            "t3", "t4", "t5", "t6",
        ];
        NAMES[self.index()]
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conditional branch comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BranchCond::Eq => "beq",
            BranchCond::Ne => "bne",
            BranchCond::Lt => "blt",
            BranchCond::Ge => "bge",
            BranchCond::Ltu => "bltu",
            BranchCond::Geu => "bgeu",
        }
    }
}

/// Memory load width and extension behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
}

impl LoadKind {
    /// Access width in bytes.
    pub fn width(self) -> u64 {
        match self {
            LoadKind::Lb | LoadKind::Lbu => 1,
            LoadKind::Lh | LoadKind::Lhu => 2,
            LoadKind::Lw | LoadKind::Lwu => 4,
            LoadKind::Ld => 8,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            LoadKind::Lb => "lb",
            LoadKind::Lh => "lh",
            LoadKind::Lw => "lw",
            LoadKind::Ld => "ld",
            LoadKind::Lbu => "lbu",
            LoadKind::Lhu => "lhu",
            LoadKind::Lwu => "lwu",
        }
    }
}

/// Memory store width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sb,
    Sh,
    Sw,
    Sd,
}

impl StoreKind {
    /// Access width in bytes.
    pub fn width(self) -> u64 {
        match self {
            StoreKind::Sb => 1,
            StoreKind::Sh => 2,
            StoreKind::Sw => 4,
            StoreKind::Sd => 8,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            StoreKind::Sb => "sb",
            StoreKind::Sh => "sh",
            StoreKind::Sw => "sw",
            StoreKind::Sd => "sd",
        }
    }
}

/// Integer ALU operation, shared by the register-register and
/// register-immediate formats. `Sub` is only reachable from the
/// register-register form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl IntOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntOp::Add => "add",
            IntOp::Sub => "sub",
            IntOp::Sll => "sll",
            IntOp::Slt => "slt",
            IntOp::Sltu => "sltu",
            IntOp::Xor => "xor",
            IntOp::Srl => "srl",
            IntOp::Sra => "sra",
            IntOp::Or => "or",
            IntOp::And => "and",
        }
    }
}

/// 32-bit ALU operation (the `.w` forms). Operates on the low 32 bits and
/// sign-extends the result to 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOp32 {
    Add,
    Sub,
    Sll,
    Srl,
    Sra,
}

impl IntOp32 {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntOp32::Add => "addw",
            IntOp32::Sub => "subw",
            IntOp32::Sll => "sllw",
            IntOp32::Srl => "srlw",
            IntOp32::Sra => "sraw",
        }
    }
}

/// A decoded RV64I instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Load upper immediate.
    Lui { rd: Reg, imm: i64 },
    /// Add upper immediate to pc.
    Auipc { rd: Reg, imm: i64 },
    /// Jump and link, pc-relative.
    Jal { rd: Reg, offset: i64 },
    /// Jump and link register, indirect.
    Jalr { rd: Reg, rs1: Reg, offset: i64 },
    /// Conditional branch, pc-relative.
    Branch {
        cond: BranchCond,
        rs1: Reg,
        rs2: Reg,
        offset: i64,
    },
    /// Memory load.
    Load {
        kind: LoadKind,
        rd: Reg,
        rs1: Reg,
        offset: i64,
    },
    /// Memory store.
    Store {
        kind: StoreKind,
        rs1: Reg,
        rs2: Reg,
        offset: i64,
    },
    /// Register-immediate ALU operation.
    OpImm { op: IntOp, rd: Reg, rs1: Reg, imm: i64 },
    /// Register-register ALU operation.
    Op { op: IntOp, rd: Reg, rs1: Reg, rs2: Reg },
    /// 32-bit register-immediate ALU operation.
    OpImm32 { op: IntOp32, rd: Reg, rs1: Reg, imm: i64 },
    /// 32-bit register-register ALU operation.
    Op32 { op: IntOp32, rd: Reg, rs1: Reg, rs2: Reg },
    /// Environment call.
    Ecall,
    /// Environment breakpoint.
    Ebreak,
    /// Memory ordering fence. A no-op for a single in-order hart.
    Fence,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Lui { rd, imm } => write!(f, "lui {rd}, {:#x}", (imm as u64 >> 12) & 0xfffff),
            Instruction::Auipc { rd, imm } => {
                write!(f, "auipc {rd}, {:#x}", (imm as u64 >> 12) & 0xfffff)
            }
            Instruction::Jal { rd, offset } => write!(f, "jal {rd}, {offset}"),
            Instruction::Jalr { rd, rs1, offset } => write!(f, "jalr {rd}, {offset}({rs1})"),
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {rs1}, {rs2}, {offset}", cond.mnemonic()),
            Instruction::Load {
                kind,
                rd,
                rs1,
                offset,
            } => write!(f, "{} {rd}, {offset}({rs1})", kind.mnemonic()),
            Instruction::Store {
                kind,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {rs2}, {offset}({rs1})", kind.mnemonic()),
            Instruction::OpImm { op, rd, rs1, imm } => {
                // sltu takes an i suffix in the middle, not at the end.
                let mnemonic = match op {
                    IntOp::Sltu => "sltiu".to_string(),
                    other => format!("{}i", other.mnemonic()),
                };
                write!(f, "{mnemonic} {rd}, {rs1}, {imm}")
            }
            Instruction::Op { op, rd, rs1, rs2 } => {
                write!(f, "{} {rd}, {rs1}, {rs2}", op.mnemonic())
            }
            Instruction::OpImm32 { op, rd, rs1, imm } => {
                write!(f, "{}iw {rd}, {rs1}, {imm}", op.mnemonic().trim_end_matches('w'))
            }
            Instruction::Op32 { op, rd, rs1, rs2 } => {
                write!(f, "{} {rd}, {rs1}, {rs2}", op.mnemonic())
            }
            Instruction::Ecall => f.write_str("ecall"),
            Instruction::Ebreak => f.write_str("ebreak"),
            Instruction::Fence => f.write_str("fence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names() {
        assert_eq!(Reg::ZERO.name(), "zero");
        assert_eq!(Reg::SP.name(), "sp");
        assert_eq!(Reg::A0.name(), "a0");
        assert_eq!(Reg::new(31).name(), "t6");
    }

    #[test]
    fn reg_new_masks_to_five_bits() {
        assert_eq!(Reg::new(32), Reg::ZERO);
        assert_eq!(Reg::new(42).index(), 10);
    }

    #[test]
    fn display_formats() {
        let add = Instruction::Op {
            op: IntOp::Add,
            rd: Reg::A0,
            rs1: Reg::A0,
            rs2: Reg::A1,
        };
        assert_eq!(add.to_string(), "add a0, a0, a1");

        let lw = Instruction::Load {
            kind: LoadKind::Lw,
            rd: Reg::A5,
            rs1: Reg::SP,
            offset: -4,
        };
        assert_eq!(lw.to_string(), "lw a5, -4(sp)");

        let ret = Instruction::Jalr {
            rd: Reg::ZERO,
            rs1: Reg::RA,
            offset: 0,
        };
        assert_eq!(ret.to_string(), "jalr zero, 0(ra)");
    }
}
