//! # dinorisc-isa
//!
//! RV64I instruction decoding for dinorisc. The decoder is a pure function
//! from a 32-bit word to a typed [`Instruction`]; it holds no state and
//! never reads guest memory.
//!
//! Only the base integer set is supported. Compressed, multiply, atomic,
//! floating-point, vector, and CSR encodings are rejected with a
//! [`DecodeError`] naming the extension they come from.

mod decoder;
pub mod encode;
mod error;
mod instruction;

pub use decoder::decode;
pub use error::DecodeError;
pub use instruction::{BranchCond, Instruction, IntOp, IntOp32, LoadKind, Reg, StoreKind};
