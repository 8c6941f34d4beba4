//! RV64I instruction decoder.
//!
//! Decodes the base integer instruction set only. Words from other standard
//! extensions (C, M, A, F, D, V, Zicsr, Zifencei) are recognized far enough
//! to name the extension in the error; everything else is an illegal
//! instruction.

use crate::{BranchCond, DecodeError, Instruction, IntOp, IntOp32, LoadKind, Reg, StoreKind};

// Standard 32-bit opcodes (bits 6:0)
const OP_LUI: u32 = 0b0110111; // 0x37
const OP_AUIPC: u32 = 0b0010111; // 0x17
const OP_JAL: u32 = 0b1101111; // 0x6F
const OP_JALR: u32 = 0b1100111; // 0x67
const OP_BRANCH: u32 = 0b1100011; // 0x63
const OP_LOAD: u32 = 0b0000011; // 0x03
const OP_STORE: u32 = 0b0100011; // 0x23
const OP_IMM: u32 = 0b0010011; // 0x13
const OP_REG: u32 = 0b0110011; // 0x33
const OP_IMM32: u32 = 0b0011011; // 0x1B
const OP_REG32: u32 = 0b0111011; // 0x3B
const OP_SYSTEM: u32 = 0b1110011; // 0x73
const OP_FENCE: u32 = 0b0001111; // 0x0F

// Opcodes from extensions outside the base set, recognized only to report
// which extension a binary needs.
const OP_AMO: u32 = 0b0101111; // 0x2F
const OP_LOAD_FP: u32 = 0b0000111; // 0x07
const OP_STORE_FP: u32 = 0b0100111; // 0x27
const OP_MADD: u32 = 0b1000011; // 0x43
const OP_MSUB: u32 = 0b1000111; // 0x47
const OP_NMSUB: u32 = 0b1001011; // 0x4B
const OP_NMADD: u32 = 0b1001111; // 0x4F
const OP_FP: u32 = 0b1010011; // 0x53
const OP_V: u32 = 0b1010111; // 0x57

/// Decode a single 32-bit instruction word fetched from `address`.
pub fn decode(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    // The all-zero word is the architecturally defined illegal instruction,
    // not a compressed encoding.
    if word == 0 {
        return Err(DecodeError::illegal(address, word));
    }
    // Compressed instructions have bits 1:0 != 11.
    if word & 0x3 != 0x3 {
        return Err(DecodeError::unsupported(address, word, "C"));
    }

    let opcode = word & 0x7f;
    match opcode {
        OP_LUI => Ok(Instruction::Lui {
            rd: rd(word),
            imm: imm_u(word),
        }),
        OP_AUIPC => Ok(Instruction::Auipc {
            rd: rd(word),
            imm: imm_u(word),
        }),
        OP_JAL => Ok(Instruction::Jal {
            rd: rd(word),
            offset: imm_j(word),
        }),
        OP_JALR => {
            if funct3(word) != 0 {
                return Err(DecodeError::illegal(address, word));
            }
            Ok(Instruction::Jalr {
                rd: rd(word),
                rs1: rs1(word),
                offset: imm_i(word),
            })
        }
        OP_BRANCH => decode_branch(word, address),
        OP_LOAD => decode_load(word, address),
        OP_STORE => decode_store(word, address),
        OP_IMM => decode_op_imm(word, address),
        OP_REG => decode_op_reg(word, address),
        OP_IMM32 => decode_op_imm32(word, address),
        OP_REG32 => decode_op_reg32(word, address),
        OP_SYSTEM => decode_system(word, address),
        OP_FENCE => decode_fence(word, address),
        OP_AMO => Err(DecodeError::unsupported(address, word, "A")),
        OP_LOAD_FP | OP_STORE_FP | OP_MADD | OP_MSUB | OP_NMSUB | OP_NMADD | OP_FP => {
            Err(DecodeError::unsupported(address, word, "F/D"))
        }
        OP_V => Err(DecodeError::unsupported(address, word, "V")),
        _ => Err(DecodeError::illegal(address, word)),
    }
}

fn decode_branch(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let cond = match funct3(word) {
        0b000 => BranchCond::Eq,
        0b001 => BranchCond::Ne,
        0b100 => BranchCond::Lt,
        0b101 => BranchCond::Ge,
        0b110 => BranchCond::Ltu,
        0b111 => BranchCond::Geu,
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::Branch {
        cond,
        rs1: rs1(word),
        rs2: rs2(word),
        offset: imm_b(word),
    })
}

fn decode_load(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let kind = match funct3(word) {
        0b000 => LoadKind::Lb,
        0b001 => LoadKind::Lh,
        0b010 => LoadKind::Lw,
        0b011 => LoadKind::Ld,
        0b100 => LoadKind::Lbu,
        0b101 => LoadKind::Lhu,
        0b110 => LoadKind::Lwu,
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::Load {
        kind,
        rd: rd(word),
        rs1: rs1(word),
        offset: imm_i(word),
    })
}

fn decode_store(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let kind = match funct3(word) {
        0b000 => StoreKind::Sb,
        0b001 => StoreKind::Sh,
        0b010 => StoreKind::Sw,
        0b011 => StoreKind::Sd,
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::Store {
        kind,
        rs1: rs1(word),
        rs2: rs2(word),
        offset: imm_s(word),
    })
}

fn decode_op_imm(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let (op, imm) = match funct3(word) {
        0b000 => (IntOp::Add, imm_i(word)),
        0b010 => (IntOp::Slt, imm_i(word)),
        0b011 => (IntOp::Sltu, imm_i(word)),
        0b100 => (IntOp::Xor, imm_i(word)),
        0b110 => (IntOp::Or, imm_i(word)),
        0b111 => (IntOp::And, imm_i(word)),
        // Shifts carry a 6-bit shamt; the remaining upper bits select the
        // shift variant and must match exactly.
        0b001 => {
            if word >> 26 != 0 {
                return Err(DecodeError::illegal(address, word));
            }
            (IntOp::Sll, shamt64(word))
        }
        0b101 => match word >> 26 {
            0b000000 => (IntOp::Srl, shamt64(word)),
            0b010000 => (IntOp::Sra, shamt64(word)),
            _ => return Err(DecodeError::illegal(address, word)),
        },
        _ => unreachable!("funct3 is 3 bits"),
    };
    Ok(Instruction::OpImm {
        op,
        rd: rd(word),
        rs1: rs1(word),
        imm,
    })
}

fn decode_op_reg(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    // funct7 == 1 selects the M extension (mul/div).
    if funct7(word) == 0b0000001 {
        return Err(DecodeError::unsupported(address, word, "M"));
    }
    let op = match (funct3(word), funct7(word)) {
        (0b000, 0b0000000) => IntOp::Add,
        (0b000, 0b0100000) => IntOp::Sub,
        (0b001, 0b0000000) => IntOp::Sll,
        (0b010, 0b0000000) => IntOp::Slt,
        (0b011, 0b0000000) => IntOp::Sltu,
        (0b100, 0b0000000) => IntOp::Xor,
        (0b101, 0b0000000) => IntOp::Srl,
        (0b101, 0b0100000) => IntOp::Sra,
        (0b110, 0b0000000) => IntOp::Or,
        (0b111, 0b0000000) => IntOp::And,
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::Op {
        op,
        rd: rd(word),
        rs1: rs1(word),
        rs2: rs2(word),
    })
}

fn decode_op_imm32(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let (op, imm) = match funct3(word) {
        0b000 => (IntOp32::Add, imm_i(word)),
        // The .w shifts take a 5-bit shamt with a full funct7.
        0b001 => match funct7(word) {
            0b0000000 => (IntOp32::Sll, shamt32(word)),
            _ => return Err(DecodeError::illegal(address, word)),
        },
        0b101 => match funct7(word) {
            0b0000000 => (IntOp32::Srl, shamt32(word)),
            0b0100000 => (IntOp32::Sra, shamt32(word)),
            _ => return Err(DecodeError::illegal(address, word)),
        },
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::OpImm32 {
        op,
        rd: rd(word),
        rs1: rs1(word),
        imm,
    })
}

fn decode_op_reg32(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    if funct7(word) == 0b0000001 {
        return Err(DecodeError::unsupported(address, word, "M"));
    }
    let op = match (funct3(word), funct7(word)) {
        (0b000, 0b0000000) => IntOp32::Add,
        (0b000, 0b0100000) => IntOp32::Sub,
        (0b001, 0b0000000) => IntOp32::Sll,
        (0b101, 0b0000000) => IntOp32::Srl,
        (0b101, 0b0100000) => IntOp32::Sra,
        _ => return Err(DecodeError::illegal(address, word)),
    };
    Ok(Instruction::Op32 {
        op,
        rd: rd(word),
        rs1: rs1(word),
        rs2: rs2(word),
    })
}

fn decode_system(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    if funct3(word) != 0 {
        // CSR instructions share the SYSTEM opcode with funct3 != 0.
        return Err(DecodeError::unsupported(address, word, "Zicsr"));
    }
    match word >> 7 {
        0 => Ok(Instruction::Ecall),
        // ebreak has imm=1 and all register fields zero.
        0b000000000001_00000_000_00000 => Ok(Instruction::Ebreak),
        _ => Err(DecodeError::illegal(address, word)),
    }
}

fn decode_fence(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    match funct3(word) {
        0b000 => Ok(Instruction::Fence),
        0b001 => Err(DecodeError::unsupported(address, word, "Zifencei")),
        _ => Err(DecodeError::illegal(address, word)),
    }
}

/// Extract rd field (bits 11:7)
fn rd(word: u32) -> Reg {
    Reg::new(((word >> 7) & 0x1f) as u8)
}

/// Extract rs1 field (bits 19:15)
fn rs1(word: u32) -> Reg {
    Reg::new(((word >> 15) & 0x1f) as u8)
}

/// Extract rs2 field (bits 24:20)
fn rs2(word: u32) -> Reg {
    Reg::new(((word >> 20) & 0x1f) as u8)
}

/// Extract funct3 field (bits 14:12)
fn funct3(word: u32) -> u32 {
    (word >> 12) & 0x7
}

/// Extract funct7 field (bits 31:25)
fn funct7(word: u32) -> u32 {
    (word >> 25) & 0x7f
}

/// Extract I-type immediate (sign-extended)
fn imm_i(word: u32) -> i64 {
    ((word as i32) >> 20) as i64
}

/// Extract the 6-bit shift amount for 64-bit shifts.
fn shamt64(word: u32) -> i64 {
    ((word >> 20) & 0x3f) as i64
}

/// Extract the 5-bit shift amount for the 32-bit shift forms.
fn shamt32(word: u32) -> i64 {
    ((word >> 20) & 0x1f) as i64
}

/// Extract S-type immediate (sign-extended)
fn imm_s(word: u32) -> i64 {
    let imm11_5 = (word >> 25) & 0x7f;
    let imm4_0 = (word >> 7) & 0x1f;
    let imm = (imm11_5 << 5) | imm4_0;
    // Sign-extend from 12 bits
    (((imm as i32) << 20) >> 20) as i64
}

/// Extract B-type immediate (sign-extended)
fn imm_b(word: u32) -> i64 {
    let imm12 = (word >> 31) & 1;
    let imm10_5 = (word >> 25) & 0x3f;
    let imm4_1 = (word >> 8) & 0xf;
    let imm11 = (word >> 7) & 1;
    let imm = (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1);
    // Sign-extend from 13 bits
    (((imm as i32) << 19) >> 19) as i64
}

/// Extract U-type immediate (already shifted, sign-extended to 64 bits)
fn imm_u(word: u32) -> i64 {
    ((word & 0xffff_f000) as i32) as i64
}

/// Extract J-type immediate (sign-extended)
fn imm_j(word: u32) -> i64 {
    let imm20 = (word >> 31) & 1;
    let imm10_1 = (word >> 21) & 0x3ff;
    let imm11 = (word >> 20) & 1;
    let imm19_12 = (word >> 12) & 0xff;
    let imm = (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1);
    // Sign-extend from 21 bits
    (((imm as i32) << 11) >> 11) as i64
}
