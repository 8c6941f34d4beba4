#![no_main]

use dinorisc_formats::ElfImage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing must never panic on malformed input.
    if let Ok(image) = ElfImage::parse(data.to_vec()) {
        let _ = image.entry_point();
        for (name, addr) in image.symbols() {
            let _ = name.len();
            let _ = addr;
        }
        for section in image.executable_sections() {
            let _ = image.section_data(section);
        }
        for segment in image.loadable_segments() {
            let _ = image.segment_file_data(segment);
        }
    }
});
