//! Runtime fault and engine error types.

use dinorisc_formats::LoadError;
use dinorisc_isa::DecodeError;
use thiserror::Error;

/// A guest-visible runtime fault. Faults stop execution; there is no guest
/// trap handler to deliver them to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A data access touched unmapped memory.
    #[error("out-of-bounds {width}-byte access at {address:#x}")]
    OutOfBounds {
        /// Guest address of the access.
        address: u64,
        /// Access width in bytes.
        width: u64,
    },

    /// The pc left mapped memory.
    #[error("instruction fetch from unmapped address {address:#x}")]
    InstructionFetch {
        /// The faulting pc.
        address: u64,
    },

    /// The pc is not 4-byte aligned.
    #[error("misaligned instruction fetch at {address:#x}")]
    MisalignedFetch {
        /// The faulting pc.
        address: u64,
    },

    /// The fetched word failed to decode.
    #[error("illegal instruction: {0}")]
    IllegalInstruction(#[from] DecodeError),

    /// The guest executed `ecall` or `ebreak`; no environment is provided.
    #[error("unhandled environment call at {address:#x}")]
    UnhandledEnvironmentCall {
        /// Address of the ecall or ebreak.
        address: u64,
    },

    /// Execution did not finish within the step budget.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded {
        /// The configured budget.
        limit: u64,
    },
}

/// Top-level engine error: anything that can stop a validate or run request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The binary could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An instruction failed to decode during validation.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Execution faulted.
    #[error(transparent)]
    Fault(#[from] Fault),
}
