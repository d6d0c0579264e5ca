use criterion::{criterion_group, criterion_main, Criterion};
use gb_core::{EmulatorMode, EmulatorOptionsBuilder, NullInput, NullOutput, System};

/// A header-only ROM: no MBC, two 0x4000 banks, no CGB flag. Enough for the CPU to run
/// through uninitialised memory without hitting an unsupported-cartridge error.
fn blank_rom() -> Vec<u8> {
    vec![0u8; 0x8000]
}

fn frame_benchmark(c: &mut Criterion) {
    let rom = blank_rom();
    let options = EmulatorOptionsBuilder::new().with_mode(EmulatorMode::Dmg).build();
    let mut system = System::new(EmulatorMode::Dmg, rom, options).unwrap();
    let mut input = NullInput::default();
    let mut output = NullOutput::default();

    c.bench_function("step_frame", |b| {
        b.iter(|| system.step_frame(&mut input, &mut output).unwrap())
    });
}

criterion_group!(benches, frame_benchmark);
criterion_main!(benches);
