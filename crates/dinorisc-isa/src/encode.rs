//! RV64I instruction encoding.
//!
//! The inverse of the decoder, used by test suites to assemble small guest
//! programs in memory. Covers the base set plus a handful of common
//! pseudo-instructions (`nop`, `mv`, `li`, `ret`).

use crate::Reg;

/// Pack an R-type word.
pub fn encode_r(opcode: u32, funct3: u32, funct7: u32, rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    opcode
        | ((rd.index() as u32) << 7)
        | (funct3 << 12)
        | ((rs1.index() as u32) << 15)
        | ((rs2.index() as u32) << 20)
        | (funct7 << 25)
}

/// Pack an I-type word. The immediate is truncated to 12 bits.
pub fn encode_i(opcode: u32, funct3: u32, rd: Reg, rs1: Reg, imm: i32) -> u32 {
    opcode
        | ((rd.index() as u32) << 7)
        | (funct3 << 12)
        | ((rs1.index() as u32) << 15)
        | (((imm as u32) & 0xfff) << 20)
}

/// Pack an S-type word.
pub fn encode_s(opcode: u32, funct3: u32, rs1: Reg, rs2: Reg, imm: i32) -> u32 {
    let imm = imm as u32;
    opcode
        | ((imm & 0x1f) << 7)
        | (funct3 << 12)
        | ((rs1.index() as u32) << 15)
        | ((rs2.index() as u32) << 20)
        | (((imm >> 5) & 0x7f) << 25)
}

/// Pack a B-type word. The offset must be even.
pub fn encode_b(opcode: u32, funct3: u32, rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    let imm = offset as u32;
    opcode
        | (((imm >> 11) & 1) << 7)
        | (((imm >> 1) & 0xf) << 8)
        | (funct3 << 12)
        | ((rs1.index() as u32) << 15)
        | ((rs2.index() as u32) << 20)
        | (((imm >> 5) & 0x3f) << 25)
        | (((imm >> 12) & 1) << 31)
}

/// Pack a U-type word from the upper 20 bits of `imm`.
pub fn encode_u(opcode: u32, rd: Reg, imm: i32) -> u32 {
    opcode | ((rd.index() as u32) << 7) | ((imm as u32) & 0xffff_f000)
}

/// Pack a J-type word. The offset must be even.
pub fn encode_j(opcode: u32, rd: Reg, offset: i32) -> u32 {
    let imm = offset as u32;
    opcode
        | ((rd.index() as u32) << 7)
        | (((imm >> 12) & 0xff) << 12)
        | (((imm >> 11) & 1) << 20)
        | (((imm >> 1) & 0x3ff) << 21)
        | (((imm >> 20) & 1) << 31)
}

pub fn lui(rd: Reg, imm: i32) -> u32 {
    encode_u(0b0110111, rd, imm)
}

pub fn auipc(rd: Reg, imm: i32) -> u32 {
    encode_u(0b0010111, rd, imm)
}

pub fn jal(rd: Reg, offset: i32) -> u32 {
    encode_j(0b1101111, rd, offset)
}

pub fn jalr(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b1100111, 0b000, rd, rs1, offset)
}

/// `jalr zero, 0(ra)`
pub fn ret() -> u32 {
    jalr(Reg::ZERO, Reg::RA, 0)
}

pub fn beq(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_b(0b1100011, 0b000, rs1, rs2, offset)
}

pub fn bne(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_b(0b1100011, 0b001, rs1, rs2, offset)
}

pub fn blt(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_b(0b1100011, 0b100, rs1, rs2, offset)
}

pub fn bge(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_b(0b1100011, 0b101, rs1, rs2, offset)
}

pub fn bltu(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_b(0b1100011, 0b110, rs1, rs2, offset)
}

pub fn lb(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b0000011, 0b000, rd, rs1, offset)
}

pub fn lh(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b0000011, 0b001, rd, rs1, offset)
}

pub fn lw(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b0000011, 0b010, rd, rs1, offset)
}

pub fn ld(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b0000011, 0b011, rd, rs1, offset)
}

pub fn lbu(rd: Reg, rs1: Reg, offset: i32) -> u32 {
    encode_i(0b0000011, 0b100, rd, rs1, offset)
}

pub fn sb(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_s(0b0100011, 0b000, rs1, rs2, offset)
}

pub fn sw(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_s(0b0100011, 0b010, rs1, rs2, offset)
}

pub fn sd(rs1: Reg, rs2: Reg, offset: i32) -> u32 {
    encode_s(0b0100011, 0b011, rs1, rs2, offset)
}

pub fn addi(rd: Reg, rs1: Reg, imm: i32) -> u32 {
    encode_i(0b0010011, 0b000, rd, rs1, imm)
}

pub fn slli(rd: Reg, rs1: Reg, shamt: u32) -> u32 {
    encode_i(0b0010011, 0b001, rd, rs1, (shamt & 0x3f) as i32)
}

pub fn srli(rd: Reg, rs1: Reg, shamt: u32) -> u32 {
    encode_i(0b0010011, 0b101, rd, rs1, (shamt & 0x3f) as i32)
}

pub fn andi(rd: Reg, rs1: Reg, imm: i32) -> u32 {
    encode_i(0b0010011, 0b111, rd, rs1, imm)
}

pub fn add(rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    encode_r(0b0110011, 0b000, 0b0000000, rd, rs1, rs2)
}

pub fn sub(rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    encode_r(0b0110011, 0b000, 0b0100000, rd, rs1, rs2)
}

pub fn xor(rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    encode_r(0b0110011, 0b100, 0b0000000, rd, rs1, rs2)
}

pub fn sltu(rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    encode_r(0b0110011, 0b011, 0b0000000, rd, rs1, rs2)
}

pub fn addw(rd: Reg, rs1: Reg, rs2: Reg) -> u32 {
    encode_r(0b0111011, 0b000, 0b0000000, rd, rs1, rs2)
}

pub fn addiw(rd: Reg, rs1: Reg, imm: i32) -> u32 {
    encode_i(0b0011011, 0b000, rd, rs1, imm)
}

pub fn ecall() -> u32 {
    0b1110011
}

pub fn ebreak() -> u32 {
    (1 << 20) | 0b1110011
}

/// `addi zero, zero, 0`
pub fn nop() -> u32 {
    addi(Reg::ZERO, Reg::ZERO, 0)
}

/// `addi rd, rs1, 0`
pub fn mv(rd: Reg, rs1: Reg) -> u32 {
    addi(rd, rs1, 0)
}

/// `addi rd, zero, imm` for immediates that fit in 12 bits.
pub fn li(rd: Reg, imm: i32) -> u32 {
    debug_assert!((-2048..2048).contains(&imm));
    addi(rd, Reg::ZERO, imm)
}

/// Serialize a sequence of instruction words to little-endian bytes.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
