use std::fmt;

use bitflags::_core::fmt::{Debug, Formatter};
use log::*;

use hram::Hram;

use crate::emulator::EmulatorMode;
use crate::hardware::apu::{APU, APU_MEM_END, APU_MEM_START, WAVE_SAMPLE_END, WAVE_SAMPLE_START};
use crate::hardware::cartridge::Cartridge;
use crate::hardware::mmu::cgb_mem::{CgbData, HdmaMode, HdmaRegister};
use crate::hardware::mmu::wram::Wram;
use crate::hardware::ppu::tiledata::*;
use crate::hardware::ppu::{Mode, DMA_TRANSFER, PPU};
use crate::io::bootrom::BootRom;
use crate::io::interrupts::{InterruptModule, Interrupts};
use crate::io::io_registers::*;
use crate::io::joypad::*;
use crate::io::timer::*;
use crate::EmulatorOptions;

pub mod cgb_mem;
mod hram;
mod wram;

pub const MEMORY_SIZE: usize = 0x10000;
/// 16 KB ROM bank, usually 00. From Cartridge, read-only
pub const ROM_BANK_00_START: u16 = 0x0000;
pub const ROM_BANK_00_END: u16 = 0x03FFF;
/// 16 KB Rom Bank 01~NN. From cartridge, switchable bank via Memory Bank. Read-only.
pub const ROM_BANK_NN_START: u16 = 0x4000;
pub const ROM_BANK_NN_END: u16 = 0x7FFF;
/// This area contains information about the program,
/// its entry point, checksums, information about the used MBC chip, the ROM and RAM sizes, etc.
pub const CARTRIDGE_HEADER_START: u16 = 0x0100;
pub const CARTRIDGE_HEADER_END: u16 = 0x014F;
/// 8 KB of VRAM, only bank 0 in Non-CGB mode. Switchable bank 0/1 in CGB mode.
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
/// 8 KB of External Ram, In cartridge, switchable bank if any(?). Could hold save data.
pub const EXTERNAL_RAM_START: u16 = 0xA000;
pub const EXTERNAL_RAM_END: u16 = 0xBFFF;
/// 4 KB Work RAM bank 0
pub const WRAM_BANK_00_START: u16 = 0xC000;
pub const WRAM_BANK_00_END: u16 = 0xCFFF;
/// 4 KB Work RAM bank 1~N. Only bank 1 in Non-CGB mode Switchable bank 1~7 in CGB mode.
pub const WRAM_BANK_NN_START: u16 = 0xD000;
pub const WRAM_BANK_NN_END: u16 = 0xDFFF;
/// Mirror of C000~DDFF (ECHO RAM). Typically not used
pub const ECHO_RAM_START: u16 = 0xE000;
pub const ECHO_RAM_END: u16 = 0xFDFF;
/// Sprite attribute table (OAM)
pub const OAM_ATTRIBUTE_START: u16 = 0xFE00;
pub const OAM_ATTRIBUTE_END: u16 = 0xFE9F;
/// Not usable
pub const NOT_USABLE_START: u16 = 0xFEA0;
pub const NOT_USABLE_END: u16 = 0xFEFF;
/// I/O Registers
pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;

pub const CGB_PREPARE_SWITCH: u16 = 0xFF4D;
pub const CGB_VRAM_BANK_REGISTER: u16 = 0xFF4F;
/// Specifies the higher byte of the source address. Always returns FFh when read.
pub const CGB_HDMA_1: u16 = 0xFF51;
/// Specifies the lower byte of the source address. Lower 4 bits are ignored.
pub const CGB_HDMA_2: u16 = 0xFF52;
/// Specifies the higher byte of the destination address, always in VRAM.
pub const CGB_HDMA_3: u16 = 0xFF53;
/// Specifies the lower byte of the destination address. Lower 4 bits are ignored.
pub const CGB_HDMA_4: u16 = 0xFF54;
/// This register specifies the length and mode of the transfer. It starts the copy when written.
pub const CGB_HDMA_5: u16 = 0xFF55;
/// Infrared Communications Port, not emulated.
pub const CGB_RP: u16 = 0xFF56;
/// This register specifies which object priority mode to use. The DMG prioritizes objects
/// by x-coordinate, the CGB prioritizes them by location in OAM.
pub const CGB_OBJECT_PRIORITY_MODE: u16 = 0xFF6C;
/// Work ram bank switching.
pub const CGB_WRAM_BANK: u16 = 0xFF70;

/// The flag used to signal that an interrupt is pending.
pub const INTERRUPTS_FLAG: u16 = 0xFF0F;
/// High Ram (HRAM)
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;
/// Interrupts Enable Register (IE)
pub const INTERRUPTS_ENABLE: u16 = 0xFFFF;
/// The value to return for an invalid read
pub const INVALID_READ: u8 = 0xFF;

/// The number of M-cycles an OAM-DMA transfer takes to complete, not counting the
/// 4-cycle startup delay.
const OAM_DMA_LENGTH: u16 = 160;

/// Simple memory interface for reading and writing bytes, as well as determining the
/// state of the BootRom.
pub trait MemoryMapper: Debug {
    fn read_byte(&self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    fn boot_rom_finished(&self) -> bool;
    fn get_mode(&self) -> EmulatorMode;
    /// Returns, if the current ROM has a battery, the contents of the External Ram.
    ///
    /// Should be used for saving functionality.
    fn cartridge(&self) -> Option<&Cartridge>;
    fn interrupts(&self) -> &InterruptModule;
    fn interrupts_mut(&mut self) -> &mut InterruptModule;
    fn turn_on_lcd(&mut self);
    fn turn_off_lcd(&mut self);
    fn cgb_data(&mut self) -> &mut CgbData;
    /// Perform one M-cycle (4 cycles, or 2 T-cycles-equivalent in CGB double speed) on
    /// every component of the system.
    /// Returns `true` if V-blank occurred during this M-cycle.
    fn do_m_cycle(&mut self) -> bool;
}

/// Bus-level state for an in-flight OAM-DMA transfer. Modelled as the 160 M-cycle
/// byte-at-a-time copy that happens on real hardware rather than an instantaneous block
/// copy, so a transfer started mid-frame interacts correctly with CPU OAM access.
#[derive(Debug, Default)]
struct OamDmaState {
    source_base: u16,
    index: u16,
    active: bool,
    start_delay: u8,
}

impl OamDmaState {
    /// 4 cycles after the write to 0xFF46 is when the transfer actually begins.
    fn request(&mut self, value: u8) {
        self.source_base = (value as u16) << 8;
        self.start_delay = 4;
        self.active = false;
        self.index = 0;
    }
}

pub struct Memory {
    boot_rom: BootRom,
    cartridge: Cartridge,
    pub emulation_mode: EmulatorMode,
    pub cgb_data: CgbData,
    pub hdma: HdmaRegister,
    oam_dma: OamDmaState,

    pub ppu: PPU,
    pub apu: APU,
    pub hram: Hram,
    pub wram: Wram,

    pub joypad_register: JoyPad,
    pub timers: TimerRegisters,
    pub interrupts: InterruptModule,
    pub io_registers: IORegisters,
}

impl Memory {
    pub fn new(cartridge: Cartridge, emu_opts: &EmulatorOptions) -> Self {
        let boot_rom = match &emu_opts.boot_rom {
            None => BootRom::none(),
            Some(rom) if emu_opts.emulator_mode.is_cgb() => {
                let mut data = [0u8; crate::io::bootrom::CGB_BOOTROM_SIZE];
                data[..rom.len().min(data.len())].copy_from_slice(&rom[..rom.len().min(data.len())]);
                BootRom::cgb(data)
            }
            Some(rom) => {
                let mut data = [0u8; crate::io::bootrom::DMG_BOOTROM_SIZE];
                data[..rom.len().min(data.len())].copy_from_slice(&rom[..rom.len().min(data.len())]);
                BootRom::dmg(data)
            }
        };

        let mut emulation_mode = emu_opts.emulator_mode;
        // If we're not doing the CGB bootrom AND the cartridge is not a CGB cartridge, we switch to DMG.
        if boot_rom.is_finished && !cartridge.cartridge_header().cgb_flag {
            emulation_mode = EmulatorMode::Dmg;
        }

        Memory {
            boot_rom,
            cartridge,
            emulation_mode,
            cgb_data: CgbData::new(),
            hdma: HdmaRegister::new(),
            oam_dma: OamDmaState::default(),
            ppu: PPU::new(emulation_mode),
            apu: APU::new(),
            hram: Hram::new(),
            wram: Wram::new(),
            joypad_register: JoyPad::new(),
            timers: Default::default(),
            interrupts: Default::default(),
            io_registers: IORegisters::new(),
        }
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x08FF if self.boot_rom.covers(address) => self.boot_rom.read_byte(address),
            ROM_BANK_00_START..=ROM_BANK_00_END => self.cartridge.read_0000_3fff(address),
            ROM_BANK_NN_START..=ROM_BANK_NN_END => self.cartridge.read_4000_7fff(address),
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END if self.ppu.can_access_vram() => self.ppu.get_tile_byte(address),
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END => INVALID_READ,
            TILEMAP_9800_START..=TILEMAP_9C00_END if self.ppu.can_access_vram() => self.ppu.get_tilemap_byte(address),
            TILEMAP_9800_START..=TILEMAP_9C00_END => INVALID_READ,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read_external_ram(address),
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.read_bank_0(address),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.read_bank_n(address),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.read_echo_ram(address),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END if self.ppu.can_access_oam() => self.ppu.get_oam_byte(address),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => INVALID_READ,
            NOT_USABLE_START..=NOT_USABLE_END => self.non_usable_call(address),
            IO_START..=IO_END => self.read_io_byte(address),
            HRAM_START..=HRAM_END => self.hram.read_byte(address),
            INTERRUPTS_ENABLE => self.interrupts.interrupt_enable.bits(),
            _ => {
                warn!("Reading memory that is out of bounds: 0x{:04X}", address);
                INVALID_READ
            }
        }
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            ROM_BANK_00_START..=ROM_BANK_NN_END => self.cartridge.write_byte(address, value),
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END if self.ppu.can_access_vram() => self.ppu.set_tile_byte(address, value),
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END => {}
            TILEMAP_9800_START..=TILEMAP_9C00_END if self.ppu.can_access_vram() => self.ppu.set_tilemap_byte(address, value),
            TILEMAP_9800_START..=TILEMAP_9C00_END => {}
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write_byte(address, value),
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.write_bank_0(address, value),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.write_bank_n(address, value),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.write_echo_ram(address, value),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END if self.ppu.can_access_oam() => self.ppu.set_oam_byte(address, value),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => {}
            NOT_USABLE_START..=NOT_USABLE_END => trace!("ROM Writing to Non-usable memory: {:04X}", address),
            IO_START..=IO_END => self.write_io_byte(address, value),
            HRAM_START..=HRAM_END => self.hram.set_byte(address, value),
            INTERRUPTS_ENABLE => self.interrupts.overwrite_ie(value),
            _ => warn!("Writing to memory that is not in bounds: 0x{:04X}", address),
        }
    }

    /// Specific method for all calls to the IO registers.
    fn read_io_byte(&self, address: u16) -> u8 {
        use crate::hardware::ppu::*;
        match address {
            JOYPAD_REGISTER => self.joypad_register.get_register(),
            DIVIDER_REGISTER => self.timers.divider_register(),
            TIMER_COUNTER => self.timers.timer_counter,
            TIMER_MODULO => self.timers.timer_modulo,
            TIMER_CONTROL => self.timers.timer_control.to_bits(),
            INTERRUPTS_FLAG => self.interrupts.interrupt_flag.bits(),
            APU_MEM_START..=APU_MEM_END => self.apu.read_register(address),
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => self.apu.read_wave_sample(address),
            LCD_CONTROL_REGISTER => self.ppu.get_lcd_control(),
            LCD_STATUS_REGISTER => self.ppu.get_lcd_status(),
            SCY_REGISTER => self.ppu.get_scy(),
            SCX_REGISTER => self.ppu.get_scx(),
            LY_REGISTER => self.ppu.get_ly(),
            LYC_REGISTER => self.ppu.get_lyc(),
            DMA_TRANSFER => self.io_registers.read_byte(address),
            BG_PALETTE => self.ppu.get_bg_palette(),
            OB_PALETTE_0 => self.ppu.get_oam_palette_0(),
            OB_PALETTE_1 => self.ppu.get_oam_palette_1(),
            WY_REGISTER => self.ppu.get_window_y(),
            WX_REGISTER => self.ppu.get_window_x(),
            CGB_PREPARE_SWITCH => {
                if self.emulation_mode.is_cgb() {
                    self.cgb_data.read_prepare_switch()
                } else {
                    INVALID_READ
                }
            }
            CGB_VRAM_BANK_REGISTER => self.ppu.get_vram_bank(),
            CGB_HDMA_1 | CGB_HDMA_2 | CGB_HDMA_3 | CGB_HDMA_4 => INVALID_READ,
            CGB_HDMA_5 => {
                if self.emulation_mode.is_dmg() {
                    INVALID_READ
                } else {
                    self.hdma.hdma5()
                }
            }
            CGB_RP => self.io_registers.read_byte(address),
            CGB_BG_PALETTE_IND => self.ppu.get_cgb_bg_palette_ind(),
            CGB_BG_PALETTE_DATA => self.ppu.get_cgb_bg_palette_data(),
            CGB_SPRITE_PALETTE_IND => self.ppu.get_cgb_sprite_palette_ind(),
            CGB_SPRITE_PALETTE_DATA => self.ppu.get_cgb_sprite_palette_data(),
            CGB_OBJECT_PRIORITY_MODE => self.ppu.get_object_priority_mode(),
            CGB_WRAM_BANK => self.wram.read_bank_select(),
            _ => self.io_registers.read_byte(address),
        }
    }

    fn write_io_byte(&mut self, address: u16, value: u8) {
        use crate::hardware::ppu::*;
        match address {
            JOYPAD_REGISTER => self.joypad_register.set_register(value, &mut self.interrupts),
            DIVIDER_REGISTER => self.timers.set_divider(),
            TIMER_COUNTER => self.timers.set_timer_counter(value),
            TIMER_MODULO => self.timers.set_tma(value),
            TIMER_CONTROL => self.timers.set_timer_control(value),
            INTERRUPTS_FLAG => self.interrupts.overwrite_if(value),
            APU_MEM_START..=APU_MEM_END => self.apu.write_register(address, value, self.emulation_mode),
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => self.apu.write_wave_sample(address, value),
            LCD_CONTROL_REGISTER => self.ppu.set_lcd_control(value, &mut self.interrupts),
            LCD_STATUS_REGISTER => self.ppu.set_lcd_status(value, &mut self.interrupts),
            SCY_REGISTER => self.ppu.set_scy(value),
            SCX_REGISTER => self.ppu.set_scx(value),
            LY_REGISTER => self.ppu.set_ly(value),
            LYC_REGISTER => self.ppu.set_lyc(value, &mut self.interrupts),
            DMA_TRANSFER => self.dma_transfer(value),
            BG_PALETTE => self.ppu.set_bg_palette(value),
            OB_PALETTE_0 => self.ppu.set_oam_palette_0(value),
            OB_PALETTE_1 => self.ppu.set_oam_palette_1(value),
            WY_REGISTER => self.ppu.set_window_y(value),
            WX_REGISTER => self.ppu.set_window_x(value),
            CGB_PREPARE_SWITCH => self.cgb_data.write_prepare_switch(value),
            CGB_VRAM_BANK_REGISTER => self.ppu.set_vram_bank(value),
            CGB_HDMA_1 => self.hdma.write_hdma1(value),
            CGB_HDMA_2 => self.hdma.write_hdma2(value),
            CGB_HDMA_3 => self.hdma.write_hdma3(value),
            CGB_HDMA_4 => self.hdma.write_hdma4(value),
            CGB_HDMA_5 => self.start_hdma(value),
            0xFF50 if !self.boot_rom.is_finished => {
                self.boot_rom.disable();
                // If the cartridge doesn't support CGB at all we switch to DMG mode.
                if !self.cartridge.cartridge_header().cgb_flag {
                    self.emulation_mode = EmulatorMode::Dmg;
                }
                info!("Finished executing BootRom!");
            }
            CGB_RP => self.io_registers.write_byte(address, value),
            CGB_BG_PALETTE_IND => self.ppu.set_cgb_bg_palette_ind(value),
            CGB_BG_PALETTE_DATA => self.ppu.set_cgb_bg_palette_data(value),
            CGB_SPRITE_PALETTE_IND => self.ppu.set_cgb_sprite_palette_ind(value),
            CGB_SPRITE_PALETTE_DATA => self.ppu.set_cgb_sprite_palette_data(value),
            CGB_OBJECT_PRIORITY_MODE => self.ppu.set_object_priority_mode(value),
            CGB_WRAM_BANK => self.wram.write_bank_select(value),
            _ => self.io_registers.write_byte(address, value),
        }
    }

    /// Starts the delayed sequence for an OAM-DMA transfer. The copy itself happens one
    /// byte per M-cycle, starting 4 cycles after this write, in `tick_oam_dma`.
    fn dma_transfer(&mut self, value: u8) {
        self.io_registers.write_byte(DMA_TRANSFER, value);
        self.oam_dma.request(value);
    }

    /// Simply returns 0xFF while also printing a warning to the logger.
    fn non_usable_call(&self, address: u16) -> u8 {
        warn!("ROM Accessed non usable memory: {:04X}", address);
        INVALID_READ
    }

    fn tick_oam_dma(&mut self) {
        if self.oam_dma.start_delay > 0 {
            self.oam_dma.start_delay -= 1;
            if self.oam_dma.start_delay == 0 {
                self.oam_dma.active = true;
                self.ppu.oam_locked_by_dma = true;
            }
            return;
        }

        if self.oam_dma.active {
            let address = self.oam_dma.source_base + self.oam_dma.index;
            let value = self.read_byte(address);
            self.ppu.oam_dma_write(self.oam_dma.index as usize, value);
            self.oam_dma.index += 1;
            if self.oam_dma.index >= OAM_DMA_LENGTH {
                self.oam_dma.active = false;
                self.ppu.oam_locked_by_dma = false;
            }
        }
    }

    /// Copies a single 16-byte HDMA/GDMA block from source to the VRAM destination.
    fn hdma_copy_block(&mut self) {
        for i in 0..16u16 {
            let value = self.read_byte(self.hdma.source_address.wrapping_add(i));
            self.write_byte(self.hdma.destination_address.wrapping_add(i), value);
        }
        self.hdma.advance_block();
    }

    /// Handles a write to HDMA5: starts a General-purpose (blocking) or H-Blank gated
    /// transfer, or cancels an ongoing H-Blank transfer.
    fn start_hdma(&mut self, value: u8) {
        let mode = self.hdma.write_hdma5(value);

        if mode == HdmaMode::GDMA && self.hdma.transfer_ongoing {
            // A GDMA transfer completes in one shot, spending the CPU's time as it goes,
            // since it is not gated by H-Blank like its sibling.
            let cycles_per_block: u32 = if self.cgb_data.double_speed { 16 } else { 8 };
            while self.hdma.transfer_ongoing {
                self.hdma_copy_block();
                for _ in 0..cycles_per_block {
                    self.do_m_cycle();
                }
            }
        }
    }

    pub fn get_speed_shift(&self) -> u64 {
        self.cgb_data.double_speed as u64
    }

    /// Returns the byte last written to SB if SC's transfer-start bit (bit 7) is set, and
    /// clears that bit so the same byte isn't reported twice. Real hardware clears it once
    /// the (unemulated) serial clock finishes shifting the byte out; since no link cable is
    /// emulated here the transfer is treated as instantaneous.
    pub fn take_serial_byte(&mut self) -> Option<u8> {
        let control = self.io_registers.read_byte(0xFF02);
        if control & 0x80 != 0 {
            let byte = self.io_registers.read_byte(0xFF01);
            self.io_registers.write_byte(0xFF02, control & 0x7F);
            Some(byte)
        } else {
            None
        }
    }
}

impl MemoryMapper for Memory {
    fn read_byte(&self, address: u16) -> u8 {
        self.read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.write_byte(address, value)
    }

    fn boot_rom_finished(&self) -> bool {
        self.boot_rom.is_finished
    }

    fn get_mode(&self) -> EmulatorMode {
        self.emulation_mode
    }

    fn cartridge(&self) -> Option<&Cartridge> {
        Some(&self.cartridge)
    }

    fn interrupts(&self) -> &InterruptModule {
        &self.interrupts
    }

    fn interrupts_mut(&mut self) -> &mut InterruptModule {
        &mut self.interrupts
    }

    fn cgb_data(&mut self) -> &mut CgbData {
        &mut self.cgb_data
    }

    fn do_m_cycle(&mut self) -> bool {
        let double_speed = self.cgb_data.double_speed;
        let t_cycles = if double_speed { 2 } else { 4 };

        self.tick_oam_dma();

        let prev_mode = self.ppu.get_mode();
        self.ppu.tick(t_cycles, &mut self.interrupts);
        let new_mode = self.ppu.get_mode();
        let vblank_occurred = prev_mode != Mode::VBlank && new_mode == Mode::VBlank;

        if self.hdma.transfer_ongoing
            && self.hdma.current_mode == HdmaMode::HDMA
            && prev_mode != Mode::HBlank
            && new_mode == Mode::HBlank
        {
            self.hdma_copy_block();
        }

        if let Some(flag) = self.timers.tick_timers(double_speed) {
            self.interrupts.insert_interrupt(flag);
        }

        self.apu.tick(t_cycles as u64);

        vblank_occurred
    }

    fn turn_on_lcd(&mut self) {
        self.ppu.turn_on_lcd();
    }

    fn turn_off_lcd(&mut self) {
        self.ppu.turn_off_lcd();
    }
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Memory: {:?}\nCartridge header: {:?}", self.io_registers, self.cartridge.cartridge_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmulatorOptionsBuilder;

    fn blank_memory() -> Memory {
        let rom = vec![0u8; 0x8000];
        let cartridge = Cartridge::new(rom, None).unwrap();
        let options = EmulatorOptionsBuilder::new().build();
        Memory::new(cartridge, &options)
    }

    #[test]
    fn take_serial_byte_reports_once_and_clears_start_bit() {
        let mut mem = blank_memory();
        mem.write_byte(0xFF01, 0x42);
        mem.write_byte(0xFF02, 0x81);

        assert_eq!(mem.take_serial_byte(), Some(0x42));
        assert_eq!(mem.take_serial_byte(), None);
        assert_eq!(mem.read_byte(0xFF02) & 0x80, 0);
    }

    #[test]
    fn take_serial_byte_ignores_unset_start_bit() {
        let mut mem = blank_memory();
        mem.write_byte(0xFF01, 0x7);
        mem.write_byte(0xFF02, 0x01);

        assert_eq!(mem.take_serial_byte(), None);
    }

    #[test]
    fn oam_dma_copies_after_start_delay() {
        let mut mem = blank_memory();
        for i in 0..160u16 {
            mem.write_byte(0xC000 + i, i as u8);
        }
        mem.write_byte(DMA_TRANSFER, 0xC0);

        // The transfer doesn't begin until 4 M-cycles after the triggering write.
        for _ in 0..4 {
            mem.do_m_cycle();
        }
        for _ in 0..160 {
            mem.do_m_cycle();
        }

        assert_eq!(mem.ppu.get_oam_byte(0xFE00), 0);
        assert_eq!(mem.ppu.get_oam_byte(0xFE9F), 159);
    }

    #[test]
    fn oam_reads_return_ff_while_dma_transfer_is_active() {
        let mut mem = blank_memory();
        mem.ppu.set_oam_byte(0xFE00, 0x42);
        mem.write_byte(DMA_TRANSFER, 0xC0);

        // Still within the 4-cycle start delay: the bus hasn't locked OAM out yet.
        for _ in 0..4 {
            mem.do_m_cycle();
        }
        assert_eq!(mem.read_byte(0xFE00), 0xFF);

        // Mid-transfer, CPU reads of OAM are blocked...
        for _ in 0..50 {
            mem.do_m_cycle();
        }
        assert_eq!(mem.read_byte(0xFE00), 0xFF);

        // ...but once the transfer finishes, OAM reads return real data again.
        for _ in 0..(160 - 50) {
            mem.do_m_cycle();
        }
        assert_eq!(mem.read_byte(0xFE00), 0);
    }
}
