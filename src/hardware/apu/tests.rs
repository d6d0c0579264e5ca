use super::*;
use crate::emulator::EmulatorMode;

#[test]
fn master_volume_register_round_trips() {
    let mut apu = APU::new();
    apu.write_register(0xFF24, 0b0111_0101, EmulatorMode::Dmg);

    assert_eq!(apu.read_register(0xFF24), 0b0111_0101);
}

#[test]
fn disabling_sound_resets_volumes_and_channel_enables() {
    let mut apu = APU::new();
    apu.write_register(0xFF25, 0xFF, EmulatorMode::Dmg);

    apu.write_register(0xFF26, 0x00, EmulatorMode::Dmg);

    assert_eq!(apu.read_register(0xFF24), 0x00);
    assert_eq!(apu.read_register(0xFF25), 0x00);
    assert_eq!(apu.read_register(0xFF26) & 0x80, 0);
}

#[test]
fn writes_are_ignored_while_disabled_except_nr52_and_dmg_length_registers() {
    let mut apu = APU::new();
    apu.write_register(0xFF26, 0x00, EmulatorMode::Dmg);

    // NR50 isn't one of the DMG carve-outs, so this write is dropped.
    apu.write_register(0xFF24, 0x77, EmulatorMode::Dmg);
    assert_eq!(apu.read_register(0xFF24), 0x00);

    // 0xFF26 (NR52) itself always goes through, re-enabling the APU.
    apu.write_register(0xFF26, 0x80, EmulatorMode::Dmg);
    assert_ne!(apu.read_register(0xFF26) & 0x80, 0);
}

#[test]
fn register_writes_are_dropped_while_disabled_and_resume_once_re_enabled() {
    let mut apu = APU::new();
    apu.write_register(0xFF26, 0x00, EmulatorMode::Dmg);

    // NR11 isn't one of the DMG length carve-outs (only 0x20/0x1B are), so this is dropped.
    apu.write_register(0xFF11, 0b1100_0000, EmulatorMode::Dmg);
    // Re-enabling doesn't itself reset channel state, so this confirms the write above
    // really had no effect rather than being wiped out by the later re-enable.
    apu.write_register(0xFF26, 0x80, EmulatorMode::Dmg);
    assert_eq!(apu.read_register(0xFF11) & 0xC0, 0);

    // The same write succeeds once sound is actually on.
    apu.write_register(0xFF11, 0b1100_0000, EmulatorMode::Dmg);
    assert_eq!(apu.read_register(0xFF11) & 0xC0, 0xC0);
}

#[test]
fn ticking_accumulates_audio_samples() {
    let mut apu = APU::new();
    apu.tick(SAMPLE_CYCLES * 4);

    assert!(!apu.get_audio_buffer().is_empty());
}

#[test]
fn clear_audio_buffer_empties_the_output() {
    let mut apu = APU::new();
    apu.tick(SAMPLE_CYCLES * 4);
    assert!(!apu.get_audio_buffer().is_empty());

    apu.clear_audio_buffer();
    assert!(apu.get_audio_buffer().is_empty());
}
