//! End-to-end execution tests.
//!
//! Each test assembles a small guest program in memory, wraps it in a
//! minimal ELF executable, and runs a named function through the engine,
//! checking the value that comes back in a0.

use dinorisc_emulate::{Engine, EngineConfig, EngineError, Fault, RETURN_SENTINEL};
use dinorisc_formats::{ElfBuilder, ElfImage, LoadError};
use dinorisc_isa::encode::{self, to_bytes};
use dinorisc_isa::Reg;

const TEXT_BASE: u64 = 0x1_0000;
const DATA_BASE: u64 = 0x2_0000;

const T1: Reg = Reg::new(6);
const T2: Reg = Reg::new(7);

/// Build an engine around a single function at the start of .text.
fn engine_for(words: &[u32]) -> Engine {
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &to_bytes(words))
            .symbol("target", TEXT_BASE)
            .build(),
    )
    .unwrap();
    Engine::new(image)
}

#[test]
fn add_two_immediates() {
    // int target() { return 5 + 10; }
    let engine = engine_for(&[
        encode::li(Reg::A0, 5),
        encode::li(Reg::A1, 10),
        encode::add(Reg::A0, Reg::A0, Reg::A1),
        encode::ret(),
    ]);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 15);
}

#[test]
fn nested_function_call() {
    // target saves ra, calls helper(3, 7), restores, returns its result.
    let words = [
        encode::addi(Reg::SP, Reg::SP, -16), // 0x00
        encode::sd(Reg::SP, Reg::RA, 8),     // 0x04
        encode::li(Reg::A0, 3),              // 0x08
        encode::li(Reg::A1, 7),              // 0x0c
        encode::jal(Reg::RA, 0x20 - 0x10),   // 0x10: call helper at 0x20
        encode::ld(Reg::RA, Reg::SP, 8),     // 0x14
        encode::addi(Reg::SP, Reg::SP, 16),  // 0x18
        encode::ret(),                       // 0x1c
        // helper:
        encode::add(Reg::A0, Reg::A0, Reg::A1), // 0x20
        encode::ret(),                          // 0x24
    ];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 10);
}

#[test]
fn counted_loop() {
    // Sum 0..10 with a blt loop: 45.
    let words = [
        encode::li(Reg::A0, 0),               // acc
        encode::li(Reg::T0, 0),               // i
        encode::li(T2, 10),                   // limit
        encode::add(Reg::A0, Reg::A0, Reg::T0), // loop:
        encode::addi(Reg::T0, Reg::T0, 1),
        encode::blt(Reg::T0, T2, -8),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 45);
}

#[test]
fn branch_selects_the_larger_path() {
    // if (7 > 5) return 7 * 2;
    let words = [
        encode::li(Reg::A0, 7),
        encode::li(Reg::A1, 5),
        encode::bge(Reg::A1, Reg::A0, 8), // skip doubling when a1 >= a0
        encode::add(Reg::A0, Reg::A0, Reg::A0),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 14);
}

#[test]
fn sums_an_array_from_the_data_segment() {
    // Five u32 values in .data; load and sum them: 15.
    let mut data = Vec::new();
    for value in [1u32, 2, 3, 4, 5] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    let words = [
        encode::lui(Reg::T0, DATA_BASE as i32),
        encode::li(Reg::A0, 0),
        encode::lw(T1, Reg::T0, 0),
        encode::add(Reg::A0, Reg::A0, T1),
        encode::lw(T1, Reg::T0, 4),
        encode::add(Reg::A0, Reg::A0, T1),
        encode::lw(T1, Reg::T0, 8),
        encode::add(Reg::A0, Reg::A0, T1),
        encode::lw(T1, Reg::T0, 12),
        encode::add(Reg::A0, Reg::A0, T1),
        encode::lw(T1, Reg::T0, 16),
        encode::add(Reg::A0, Reg::A0, T1),
        encode::ret(),
    ];
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &to_bytes(&words))
            .data(DATA_BASE, &data)
            .symbol("target", TEXT_BASE)
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 15);
}

#[test]
fn stack_stores_and_loads() {
    // Spill two values to the stack, reload, and add: 30.
    let words = [
        encode::addi(Reg::SP, Reg::SP, -32),
        encode::li(Reg::T0, 10),
        encode::sd(Reg::SP, Reg::T0, 0),
        encode::li(Reg::T0, 20),
        encode::sd(Reg::SP, Reg::T0, 8),
        encode::ld(T1, Reg::SP, 0),
        encode::ld(T2, Reg::SP, 8),
        encode::add(Reg::A0, T1, T2),
        encode::addi(Reg::SP, Reg::SP, 32),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 30);
}

#[test]
fn arguments_arrive_in_a_registers() {
    let words = [encode::add(Reg::A0, Reg::A0, Reg::A1), encode::ret()];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[20, 22]).unwrap(), 42);
}

#[test]
fn bss_reads_as_zero() {
    // .data has 4 file bytes but 16 memory bytes; the tail must be zero.
    let words = [
        encode::lui(Reg::T0, DATA_BASE as i32),
        encode::ld(Reg::A0, Reg::T0, 8),
        encode::ret(),
    ];
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &to_bytes(&words))
            .data_with_bss(DATA_BASE, &[0xff; 4], 16)
            .symbol("target", TEXT_BASE)
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 0);
}

#[test]
fn writes_to_x0_are_discarded() {
    let words = [
        encode::addi(Reg::ZERO, Reg::ZERO, 5),
        encode::mv(Reg::A0, Reg::ZERO),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    assert_eq!(engine.run_function("target", &[]).unwrap(), 0);
}

#[test]
fn wide_arithmetic_sign_extends() {
    // addiw truncates to 32 bits and sign-extends: 1 << 31 becomes a
    // negative 64-bit value.
    let words = [
        encode::li(Reg::A0, 1),
        encode::slli(Reg::A0, Reg::A0, 31),
        encode::addiw(Reg::A0, Reg::A0, 0),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    assert_eq!(
        engine.run_function("target", &[]).unwrap(),
        0xffff_ffff_8000_0000
    );
}

#[test]
fn runaway_loop_hits_the_step_budget() {
    let words = [encode::jal(Reg::ZERO, 0)];
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &to_bytes(&words))
            .symbol("target", TEXT_BASE)
            .build(),
    )
    .unwrap();
    let config = EngineConfig {
        max_steps: 1000,
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(image, config);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(Fault::StepLimitExceeded { limit: 1000 })
    ));
}

#[test]
fn ecall_faults() {
    let words = [encode::ecall()];
    let engine = engine_for(&words);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(Fault::UnhandledEnvironmentCall { address }) if address == TEXT_BASE
    ));
}

#[test]
fn load_from_unmapped_memory_faults() {
    let words = [
        encode::lui(Reg::T0, 0x4000_0000u32 as i32),
        encode::lw(Reg::A0, Reg::T0, 0),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(Fault::OutOfBounds { width: 4, .. })
    ));
}

#[test]
fn jump_to_misaligned_address_faults() {
    // jalr to an address with bit 1 set: bit 0 is cleared per the spec'd
    // encoding but bit 1 survives, and the next fetch must fault.
    let target = TEXT_BASE as i32 + 2;
    let words = [
        encode::li(Reg::T0, target & 0xfff),
        encode::lui(T1, TEXT_BASE as i32),
        encode::add(Reg::T0, Reg::T0, T1),
        encode::jalr(Reg::ZERO, Reg::T0, 0),
    ];
    let engine = engine_for(&words);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(Fault::MisalignedFetch { .. })
    ));
}

#[test]
fn running_off_the_end_of_text_faults() {
    // No ret: the pc walks past the mapped text region.
    // The text region is exactly one instruction, so the second fetch is
    // outside every region.
    let words = [encode::li(Reg::A0, 1)];
    let engine = engine_for(&words);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(Fault::InstructionFetch { .. })
    ));
}

#[test]
fn missing_symbol_is_a_load_error() {
    let words = [encode::ret()];
    let engine = engine_for(&words);
    let err = engine.run_function("does_not_exist", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Load(LoadError::SymbolNotFound { ref name }) if name == "does_not_exist"
    ));
}

#[test]
fn execution_is_deterministic() {
    let words = [
        encode::li(Reg::A0, 0),
        encode::li(Reg::T0, 0),
        encode::li(T2, 100),
        encode::add(Reg::A0, Reg::A0, Reg::T0),
        encode::addi(Reg::T0, Reg::T0, 1),
        encode::blt(Reg::T0, T2, -8),
        encode::ret(),
    ];
    let engine = engine_for(&words);
    let first = engine.run_function("target", &[]).unwrap();
    let second = engine.run_function("target", &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, 4950);
}

#[test]
fn validate_counts_instructions() {
    let engine = engine_for(&[
        encode::li(Reg::A0, 5),
        encode::li(Reg::A1, 10),
        encode::add(Reg::A0, Reg::A0, Reg::A1),
        encode::ret(),
    ]);
    let report = engine.validate().unwrap();
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].name, ".text");
    assert_eq!(report.total_instructions(), 4);
}

#[test]
fn validate_rejects_unsupported_words() {
    // A compressed nop in the middle of the section.
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(
                TEXT_BASE,
                &to_bytes(&[encode::nop(), 0x0000_0001, encode::ret()]),
            )
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    let err = engine.validate().unwrap_err();
    assert!(matches!(err, EngineError::Decode(_)));
}

#[test]
fn validate_rejects_section_address_wrapping_the_address_space() {
    // Two instructions placed so the second sits past u64::MAX.
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(0xffff_ffff_ffff_fffc)
            .text(
                0xffff_ffff_ffff_fffc,
                &to_bytes(&[encode::nop(), encode::nop()]),
            )
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    let err = engine.validate().unwrap_err();
    assert!(matches!(err, EngineError::Load(LoadError::Overflow { .. })));
}

#[test]
fn segment_over_the_return_sentinel_is_rejected() {
    // A mapping containing the sentinel address would let the guest fake a
    // return; loading must refuse it.
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &to_bytes(&[encode::ret()]))
            .symbol("target", TEXT_BASE)
            .data(RETURN_SENTINEL, &[0u8; 16])
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    let err = engine.run_function("target", &[]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Load(LoadError::InvalidStructure { .. })
    ));
}

#[test]
fn validate_rejects_trailing_partial_word() {
    let mut text = to_bytes(&[encode::nop()]);
    text.extend_from_slice(&[0x13, 0x00]); // half an instruction
    let image = ElfImage::parse(
        ElfBuilder::new()
            .entry(TEXT_BASE)
            .text(TEXT_BASE, &text)
            .build(),
    )
    .unwrap();
    let engine = Engine::new(image);
    assert!(engine.validate().is_err());
}
