//! Property-based tests for the machine.
//!
//! Arbitrary guest programs must never panic the host: every outcome is
//! either a clean return or a typed fault.

use dinorisc_emulate::{Engine, EngineConfig, Fault, GuestMemory};
use dinorisc_formats::{ElfBuilder, ElfImage};
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_programs_never_panic(words in prop::collection::vec(any::<u32>(), 1..64)) {
        let text: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let image = ElfImage::parse(
            ElfBuilder::new()
                .entry(0x1_0000)
                .text(0x1_0000, &text)
                .symbol("target", 0x1_0000)
                .build(),
        )
        .unwrap();
        let config = EngineConfig {
            max_steps: 10_000,
            ..EngineConfig::default()
        };
        let engine = Engine::with_config(image, config);
        // Ok or Err, never a panic.
        let _ = engine.run_function("target", &[]);
    }

    #[test]
    fn memory_round_trips_anywhere_in_a_region(offset in 0u64..0xff8, value in any::<u64>()) {
        let mut mem = GuestMemory::new();
        mem.map(0x1000, 0x1000, &[]).unwrap();
        mem.write_u64(0x1000 + offset, value).unwrap();
        prop_assert_eq!(mem.read_u64(0x1000 + offset).unwrap(), value);
    }

    #[test]
    fn unmapped_accesses_always_fault(addr in 0x10_0000u64..0x20_0000) {
        let mut mem = GuestMemory::new();
        mem.map(0x1000, 0x1000, &[]).unwrap();
        prop_assert_eq!(
            mem.read_u8(addr),
            Err(Fault::OutOfBounds { address: addr, width: 1 })
        );
    }

    /// A byte read succeeds exactly when the address is inside a mapped
    /// region.
    #[test]
    fn reads_succeed_exactly_where_mapped(addr in 0u64..0x3000) {
        let mut mem = GuestMemory::new();
        mem.map(0x1000, 0x1000, &[]).unwrap();
        prop_assert_eq!(mem.read_u8(addr).is_ok(), mem.is_mapped(addr));
    }
}
