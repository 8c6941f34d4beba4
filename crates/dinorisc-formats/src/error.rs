//! Error types for ELF loading.

use thiserror::Error;

/// Error type for loading a guest binary.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Invalid magic number at start of file.
    #[error("invalid magic number: expected \\x7fELF, got {actual:02x?}")]
    InvalidMagic { actual: Vec<u8> },

    /// File is too short to contain required data.
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// The file is well-formed ELF but not something dinorisc runs.
    #[error("unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Invalid section, segment, or table entry.
    #[error("invalid {kind} at offset {offset:#x}: {reason}")]
    InvalidStructure {
        kind: &'static str,
        offset: u64,
        reason: String,
    },

    /// Integer overflow while computing a file offset.
    #[error("integer overflow while parsing {context}")]
    Overflow { context: &'static str },

    /// A requested symbol is not present in the symbol table.
    #[error("symbol not found: {name}")]
    SymbolNotFound { name: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Creates a new InvalidMagic error.
    pub fn invalid_magic(actual: &[u8]) -> Self {
        Self::InvalidMagic {
            actual: actual.to_vec(),
        }
    }

    /// Creates a new TooShort error.
    pub fn too_short(expected: usize, actual: usize) -> Self {
        Self::TooShort { expected, actual }
    }

    /// Creates a new UnsupportedFormat error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// Creates a new InvalidStructure error.
    pub fn invalid_structure(kind: &'static str, offset: u64, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            kind,
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a new SymbolNotFound error.
    pub fn symbol_not_found(name: impl Into<String>) -> Self {
        Self::SymbolNotFound { name: name.into() }
    }
}
