//! Decode error types.

use thiserror::Error;

/// Errors that can occur while decoding an instruction word.
///
/// Each variant carries the guest address the word was fetched from so a
/// failure in the middle of a section can be reported precisely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The word does not encode any RV64I instruction.
    #[error("illegal instruction {word:#010x} at {address:#x}")]
    IllegalInstruction {
        /// Address of the instruction.
        address: u64,
        /// The raw instruction word.
        word: u32,
    },

    /// The word encodes an instruction from an extension outside the
    /// supported base set.
    #[error("unsupported {extension} extension instruction {word:#010x} at {address:#x}")]
    UnsupportedExtension {
        /// Address of the instruction.
        address: u64,
        /// The raw instruction word.
        word: u32,
        /// Extension name, e.g. "C" or "M".
        extension: &'static str,
    },

    /// Fewer bytes remained than a full instruction word.
    #[error("truncated instruction at {address:#x}: needed {needed} bytes, had {available}")]
    Truncated {
        /// Address of the instruction.
        address: u64,
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
}

impl DecodeError {
    pub fn illegal(address: u64, word: u32) -> Self {
        Self::IllegalInstruction { address, word }
    }

    pub fn unsupported(address: u64, word: u32, extension: &'static str) -> Self {
        Self::UnsupportedExtension {
            address,
            word,
            extension,
        }
    }

    pub fn truncated(address: u64, needed: usize, available: usize) -> Self {
        Self::Truncated {
            address,
            needed,
            available,
        }
    }
}
