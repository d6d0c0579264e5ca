//! Ties the `CPU`, bus and cartridge together into a runnable system, and defines the
//! boundary traits a host uses to feed input in and pull frames/audio/serial bytes out.

use crate::error::Error;
use crate::hardware::cartridge::Cartridge;
use crate::hardware::cpu::CPU;
use crate::hardware::mmu::{Memory, MemoryMapper};
use crate::hardware::ppu::{FRAMEBUFFER_SIZE, RESOLUTION_HEIGHT, RESOLUTION_WIDTH};
use crate::hardware::registers::Registers;
use crate::io::interrupts::ImeState;
use crate::io::joypad::InputKey;
use crate::EmulatorOptions;

/// The console variant being emulated. A cartridge without the CGB flag always runs as
/// `Dmg`, regardless of what was requested, once the boot ROM (if any) has finished.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmulatorMode {
    Dmg,
    Cgb,
    /// Defers to the cartridge's own CGB flag, resolved once at `System::new`.
    Auto,
}

impl EmulatorMode {
    pub fn is_dmg(self) -> bool {
        self == EmulatorMode::Dmg
    }

    pub fn is_cgb(self) -> bool {
        self == EmulatorMode::Cgb
    }

    /// Turns `Auto` into a concrete mode based on the cartridge's CGB flag; leaves
    /// `Dmg`/`Cgb` untouched.
    fn resolve(self, cartridge_supports_cgb: bool) -> EmulatorMode {
        match self {
            EmulatorMode::Auto if cartridge_supports_cgb => EmulatorMode::Cgb,
            EmulatorMode::Auto => EmulatorMode::Dmg,
            other => other,
        }
    }
}

/// Which sprite draw-order rule the PPU applies when two sprites overlap a pixel.
/// Real hardware ties this to the running mode (DMG always sorts by X-coordinate, CGB
/// by OAM index) but a CGB can be told to act like a DMG here via FF6C, so a host may
/// want to force one or the other rather than rely on that register's boot-time default.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpritePriorityMode {
    /// Lower X-coordinate wins; ties broken by the lower OAM index.
    ByCoordinate,
    /// Lower OAM index wins outright, regardless of X-coordinate.
    ByIndex,
}

/// The Game Boy's master clock rate, in Hz, at normal (single) speed.
pub const DMG_CLOCK_SPEED: u64 = 4_194_304;

/// T-cycles in a single frame at normal (single) speed: 154 scanlines of 456 T-cycles.
pub const CYCLES_PER_FRAME: u64 = 70224;
/// M-cycles in a single frame at normal speed.
pub const M_CYCLES_PER_FRAME: u64 = CYCLES_PER_FRAME / 4;

/// The set of buttons a `GameBoyInput` implementation reports as currently held down.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    fn pressed(self) -> [(InputKey, bool); 8] {
        [
            (InputKey::A, self.a),
            (InputKey::B, self.b),
            (InputKey::START, self.start),
            (InputKey::SELECT, self.select),
            (InputKey::UP, self.up),
            (InputKey::DOWN, self.down),
            (InputKey::LEFT, self.left),
            (InputKey::RIGHT, self.right),
        ]
    }
}

/// A host provides one of these; it's polled once per frame, right as V-Blank starts.
pub trait GameBoyInput {
    fn read(&mut self) -> InputState;
}

/// A host may implement any subset of these; all are no-ops by default.
#[allow(unused_variables)]
pub trait GameBoyOutput {
    /// ARGB8888 pixels, `RESOLUTION_WIDTH * RESOLUTION_HEIGHT` long, emitted once per frame
    /// at the start of V-Blank.
    fn receive_graphics(&mut self, frame: &[u32; RESOLUTION_WIDTH * RESOLUTION_HEIGHT]) {}
    /// Samples accumulated since the last call.
    fn receive_sound(&mut self, samples: &[f32]) {}
    /// One byte transmitted via the serial port (written to SB with SC bit 7 set).
    fn serial_out(&mut self, byte: u8) {}
    fn debug_background(&mut self, frame: &[u32; 256 * 256]) {}
    fn debug_tileset(&mut self, frame: &[u32; 256 * 192]) {}
    fn step_count(&mut self, cycles: u128) {}
    fn cycles_per_sec(&mut self, cycles: u64) {}
    fn frame_draw_duration_ms(&mut self, millis: f64) {}
}

/// A no-op sink, useful for headless runs (tests, benchmarks) that don't care about output.
#[derive(Debug, Default)]
pub struct NullOutput;

impl GameBoyOutput for NullOutput {}

/// Convenience no-op input source, for headless runs where no buttons are ever pressed.
#[derive(Debug, Default)]
pub struct NullInput;

impl GameBoyInput for NullInput {
    fn read(&mut self) -> InputState {
        InputState::default()
    }
}

/// Result of a single `System::step_frame` call.
#[derive(Debug, Copy, Clone, Default)]
pub struct StepFrameReport {
    pub m_cycles_executed: u64,
}

fn rgb_buffer_to_argb(buffer: &[u8; FRAMEBUFFER_SIZE]) -> [u32; RESOLUTION_WIDTH * RESOLUTION_HEIGHT] {
    let mut out = [0xFF00_0000u32; RESOLUTION_WIDTH * RESOLUTION_HEIGHT];
    for (pixel, chunk) in out.iter_mut().zip(buffer.chunks_exact(3)) {
        *pixel = 0xFF00_0000 | (chunk[0] as u32) << 16 | (chunk[1] as u32) << 8 | (chunk[2] as u32);
    }
    out
}

/// Header byte identifying the save-state format; bumped whenever the blob layout changes.
const SAVE_STATE_VERSION: u8 = 1;

/// A running Game Boy/Game Boy Color system: CPU, bus, and the cartridge plugged into it.
#[derive(Debug)]
pub struct System {
    cpu: CPU<Memory>,
}

impl System {
    /// Constructs a fresh system for the given ROM. `options.saved_ram`, if present, seeds
    /// the cartridge's battery-backed RAM; `options.boot_rom` selects whether a boot ROM
    /// overlay runs before control is handed to the cartridge.
    pub fn new(mode: EmulatorMode, rom: Vec<u8>, options: EmulatorOptions) -> Result<Self, Error> {
        let cartridge = Cartridge::new(rom, options.saved_ram.clone())?;
        let mut options = options;
        options.emulator_mode = mode.resolve(cartridge.cartridge_header().cgb_flag);

        let mut memory = Memory::new(cartridge, &options);
        if let Some(priority_mode) = options.sprite_priority_mode {
            memory.ppu.set_object_priority_mode(match priority_mode {
                SpritePriorityMode::ByCoordinate => 1,
                SpritePriorityMode::ByIndex => 0,
            });
        }
        Ok(System { cpu: CPU::new(memory) })
    }

    /// The mode currently in effect. May differ from what was requested at construction if
    /// the cartridge lacked the CGB flag.
    pub fn emulator_mode(&self) -> EmulatorMode {
        self.cpu.mmu.get_mode()
    }

    pub fn frame_buffer(&self) -> &[u8; FRAMEBUFFER_SIZE] {
        self.cpu.mmu.ppu.frame_buffer()
    }

    /// Runs M-cycles until a V-Blank has occurred, polling `input` once at that point and
    /// handing any accumulated output to `output`. A single call advances roughly one
    /// frame's worth of cycles.
    pub fn step_frame(
        &mut self,
        input: &mut dyn GameBoyInput,
        output: &mut dyn GameBoyOutput,
    ) -> Result<StepFrameReport, Error> {
        let start_cycles = self.cpu.cycles_performed;

        loop {
            self.cpu.step_cycle()?;

            if let Some(byte) = self.cpu.mmu.take_serial_byte() {
                output.serial_out(byte);
            }

            if self.cpu.added_vblank() {
                break;
            }
        }

        let state = input.read();
        for (key, pressed) in state.pressed() {
            if pressed {
                self.cpu.mmu.joypad_register.press_key(key, &mut self.cpu.mmu.interrupts);
            } else {
                self.cpu.mmu.joypad_register.release_key(key, &mut self.cpu.mmu.interrupts);
            }
        }

        output.receive_graphics(&rgb_buffer_to_argb(self.frame_buffer()));
        let audio = self.cpu.mmu.apu.get_audio_buffer();
        if !audio.is_empty() {
            output.receive_sound(audio);
        }
        self.cpu.mmu.apu.clear_audio_buffer();

        let executed = ((self.cpu.cycles_performed - start_cycles) / 4) as u64;
        output.step_count(self.cpu.cycles_performed);
        Ok(StepFrameReport {
            m_cycles_executed: executed,
        })
    }

    /// Serialises the full system state. Format: a one-byte version, a title/ROM-size
    /// fingerprint for `load`'s `SaveMismatch` check, the CPU scalars, then a generic snapshot
    /// of every addressable byte from `0x8000` onward (WRAM, VRAM, OAM, HRAM, cartridge RAM
    /// and I/O-mapped registers, all reached through the same bus reads the CPU itself uses).
    ///
    /// MBC bank-select registers, RTC state, and APU/PPU-internal duty/sweep counters are not
    /// captured: a load lands the cartridge back on its default bank and resets those hidden
    /// counters, which is audible/visible only for a moment and was judged out of scope here.
    pub fn save(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(0x8000 + 32);
        out.push(SAVE_STATE_VERSION);
        out.extend_from_slice(&self.fingerprint());

        let registers = self.cpu.registers();
        out.extend_from_slice(&registers.af().to_le_bytes());
        out.extend_from_slice(&registers.bc().to_le_bytes());
        out.extend_from_slice(&registers.de().to_le_bytes());
        out.extend_from_slice(&registers.hl().to_le_bytes());
        out.extend_from_slice(&registers.sp.to_le_bytes());
        out.extend_from_slice(&registers.pc.to_le_bytes());
        out.push(self.cpu.halted as u8);
        out.push(self.cpu.ime.is_enabled() as u8);
        out.extend_from_slice(&(self.cpu.cycles_performed as u64).to_le_bytes());

        for address in 0x8000..=0xFFFFu32 {
            out.push(self.cpu.mmu.read_byte(address as u16));
        }

        out
    }

    /// Restores state written by `save`. Fails with `Error::SaveMismatch` if the blob is
    /// truncated, carries an unrecognised version, or doesn't match this system's cartridge.
    pub fn load(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut cursor = data;
        let version = *cursor.first().ok_or_else(|| Error::SaveMismatch {
            reason: "save state is empty".to_string(),
        })?;
        if version != SAVE_STATE_VERSION {
            return Err(Error::SaveMismatch {
                reason: format!("unsupported save state version {} (expected {})", version, SAVE_STATE_VERSION),
            });
        }
        cursor = &cursor[1..];

        let fingerprint = self.fingerprint();
        if cursor.len() < fingerprint.len() || cursor[..fingerprint.len()] != fingerprint[..] {
            return Err(Error::SaveMismatch {
                reason: "title/ROM-size fingerprint does not match the loaded cartridge".to_string(),
            });
        }
        cursor = &cursor[fingerprint.len()..];

        fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8], Error> {
            if cursor.len() < n {
                return Err(Error::SaveMismatch {
                    reason: "save state data is truncated".to_string(),
                });
            }
            let (head, tail) = cursor.split_at(n);
            *cursor = tail;
            Ok(head)
        }

        let mut registers = Registers::new();
        registers.set_af(u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap()));
        registers.set_bc(u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap()));
        registers.set_de(u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap()));
        registers.set_hl(u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap()));
        registers.sp = u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap());
        registers.pc = u16::from_le_bytes(take(&mut cursor, 2)?.try_into().unwrap());

        let halted = take(&mut cursor, 1)?[0] != 0;
        let ime_enabled = take(&mut cursor, 1)?[0] != 0;
        let cycles_performed = u64::from_le_bytes(take(&mut cursor, 8)?.try_into().unwrap());

        let memory_bytes = take(&mut cursor, 0x10000 - 0x8000)?.to_vec();
        for (offset, byte) in memory_bytes.into_iter().enumerate() {
            self.cpu.mmu.write_byte((0x8000 + offset) as u16, byte);
        }

        self.cpu.set_registers(registers);
        self.cpu.halted = halted;
        self.cpu.ime = if ime_enabled { ImeState::Enabled } else { ImeState::Disabled };
        self.cpu.cycles_performed = cycles_performed as u128;

        Ok(())
    }

    /// Title and ROM-size byte of the loaded cartridge, used to reject save states from a
    /// different game.
    fn fingerprint(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        if let Some(cartridge) = self.cpu.mmu.cartridge() {
            let header = cartridge.cartridge_header();
            let title_bytes = header.title.as_bytes();
            let len = title_bytes.len().min(16);
            out[..len].copy_from_slice(&title_bytes[..len]);
            out[16..20].copy_from_slice(&(header.rom_size as u32).to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmulatorOptionsBuilder;
    use pretty_assertions::assert_eq;

    fn blank_rom() -> Vec<u8> {
        vec![0u8; 0x8000]
    }

    fn options() -> EmulatorOptions {
        EmulatorOptionsBuilder::new().with_mode(EmulatorMode::Dmg).build()
    }

    #[test]
    fn new_system_defaults_to_requested_mode_without_a_cgb_cartridge() {
        let system = System::new(EmulatorMode::Dmg, blank_rom(), options()).unwrap();
        assert_eq!(system.emulator_mode(), EmulatorMode::Dmg);
    }

    #[test]
    fn step_frame_advances_a_full_frame_and_produces_a_frame_buffer() {
        let mut system = System::new(EmulatorMode::Dmg, blank_rom(), options()).unwrap();
        let mut input = NullInput::default();
        let mut output = NullOutput::default();

        let report = system.step_frame(&mut input, &mut output).unwrap();

        assert_eq!(report.m_cycles_executed, M_CYCLES_PER_FRAME);
        // All-zero ROM decodes as an endless run of NOPs, so nothing should fault.
        assert_eq!(system.frame_buffer().len(), FRAMEBUFFER_SIZE);
    }

    #[test]
    fn save_then_load_round_trips_register_state() {
        let mut system = System::new(EmulatorMode::Dmg, blank_rom(), options()).unwrap();
        let mut input = NullInput::default();
        let mut output = NullOutput::default();
        system.step_frame(&mut input, &mut output).unwrap();

        let blob = system.save();

        let mut restored = System::new(EmulatorMode::Dmg, blank_rom(), options()).unwrap();
        restored.load(&blob).unwrap();

        assert_eq!(restored.cpu.registers(), system.cpu.registers());
        assert_eq!(restored.cpu.cycles_performed, system.cpu.cycles_performed);
    }

    #[test]
    fn load_rejects_a_blob_from_a_different_cartridge() {
        let mut title_a = blank_rom();
        title_a[0x134] = b'A';
        let mut title_b = blank_rom();
        title_b[0x134] = b'B';

        let a = System::new(EmulatorMode::Dmg, title_a, options()).unwrap();
        let mut b = System::new(EmulatorMode::Dmg, title_b, options()).unwrap();

        let blob = a.save();
        assert!(matches!(b.load(&blob), Err(Error::SaveMismatch { .. })));
    }

    #[test]
    fn load_rejects_truncated_data() {
        let mut system = System::new(EmulatorMode::Dmg, blank_rom(), options()).unwrap();
        assert!(matches!(system.load(&[1, 2, 3]), Err(Error::SaveMismatch { .. })));
    }
}
