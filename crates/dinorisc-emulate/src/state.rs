//! Guest register state.

use dinorisc_isa::Reg;
use std::fmt;

/// The 32 integer registers.
///
/// x0 is hardwired to zero: reads always return 0 and writes are discarded,
/// enforced here so no executor path can get it wrong.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u64; 32],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self { regs: [0; 32] }
    }

    pub fn read(&self, reg: Reg) -> u64 {
        if reg == Reg::ZERO {
            0
        } else {
            self.regs[reg.index()]
        }
    }

    pub fn write(&mut self, reg: Reg, value: u64) {
        if reg != Reg::ZERO {
            self.regs[reg.index()] = value;
        }
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for i in 0..32 {
            let reg = Reg::new(i);
            let value = self.read(reg);
            if value != 0 {
                map.entry(&reg.name(), &format_args!("{value:#x}"));
            }
        }
        map.finish()
    }
}
