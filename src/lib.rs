pub mod emulator;
pub mod error;

pub use crate::emulator::{
    EmulatorMode, GameBoyInput, GameBoyOutput, InputState, NullInput, NullOutput, SpritePriorityMode,
    StepFrameReport, System,
};
pub use crate::hardware::ppu::palette::DmgColor;
pub use crate::io::joypad::InputKey;

pub mod hardware;
mod io;

/// Wraps the various options needed to construct a [`System`](crate::emulator::System).
#[derive(Debug, Clone)]
pub struct EmulatorOptions {
    pub boot_rom: Option<Vec<u8>>,
    pub saved_ram: Option<Vec<u8>>,
    pub emulator_mode: EmulatorMode,
    /// Forces sprite draw-order priority; `None` keeps the hardware default for the
    /// resolved `emulator_mode` (by-coordinate on DMG, by-index on CGB).
    pub sprite_priority_mode: Option<SpritePriorityMode>,
}

#[derive(Debug, Clone)]
pub struct EmulatorOptionsBuilder {
    boot_rom: Option<Vec<u8>>,
    saved_ram: Option<Vec<u8>>,
    emulator_mode: EmulatorMode,
    sprite_priority_mode: Option<SpritePriorityMode>,
}

impl EmulatorOptionsBuilder {
    pub fn new() -> Self {
        EmulatorOptionsBuilder {
            boot_rom: None,
            saved_ram: None,
            emulator_mode: EmulatorMode::Dmg,
            sprite_priority_mode: None,
        }
    }

    pub fn boot_rom(mut self, boot_rom: Option<Vec<u8>>) -> Self {
        self.boot_rom = boot_rom;
        self
    }

    pub fn saved_ram(mut self, saved_ram: Option<Vec<u8>>) -> Self {
        self.saved_ram = saved_ram;
        self
    }

    pub fn with_mode(mut self, mode: EmulatorMode) -> Self {
        self.emulator_mode = mode;
        self
    }

    pub fn with_sprite_priority_mode(mut self, mode: Option<SpritePriorityMode>) -> Self {
        self.sprite_priority_mode = mode;
        self
    }

    pub fn build(self) -> EmulatorOptions {
        EmulatorOptions {
            boot_rom: self.boot_rom,
            saved_ram: self.saved_ram,
            emulator_mode: self.emulator_mode,
            sprite_priority_mode: self.sprite_priority_mode,
        }
    }
}

impl Default for EmulatorOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<EmulatorOptions> for EmulatorOptionsBuilder {
    fn from(from: EmulatorOptions) -> Self {
        EmulatorOptionsBuilder {
            boot_rom: from.boot_rom,
            saved_ram: from.saved_ram,
            emulator_mode: from.emulator_mode,
            sprite_priority_mode: from.sprite_priority_mode,
        }
    }
}
