//! # dinorisc-emulate
//!
//! Guest state and the execution engine for dinorisc. The [`Engine`] takes a
//! loaded ELF image and either validates that every executable section
//! decodes cleanly, or calls a named guest function and runs it to
//! completion.
//!
//! The machine model is deliberately small: 32 integer registers with x0
//! hardwired to zero, a pc, and region-based memory built from the binary's
//! PT_LOAD segments plus a stack. There is no MMU, no privilege levels, and
//! no environment; `ecall` and `ebreak` fault.

mod engine;
mod error;
mod memory;
mod state;

pub use engine::{DecodeReport, Engine, EngineConfig, Machine, SectionReport, RETURN_SENTINEL};
pub use error::{EngineError, Fault};
pub use memory::{GuestMemory, MapError, MAX_REGION};
pub use state::RegisterFile;
