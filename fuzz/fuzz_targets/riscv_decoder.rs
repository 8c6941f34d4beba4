#![no_main]

use dinorisc_isa::decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decode every aligned word in the input; must never panic.
    for (i, chunk) in data.chunks_exact(4).enumerate() {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let _ = decode(word, 0x1000 + (i as u64) * 4);
    }
});
