//! The Picture Processing Unit. Advanced one M-cycle at a time by the bus, the PPU is a
//! straightforward counter-driven state machine: it tracks which of its five modes it is
//! currently in and how many cycles remain in that mode, rather than scheduling discrete
//! future events.

pub mod cgb_vram;
pub mod palette;
pub mod register_flags;
pub mod tiledata;

#[cfg(test)]
mod tests;

use crate::emulator::EmulatorMode;
use crate::hardware::ppu::cgb_vram::{CgbTileAttribute, CgbTileMap};
use crate::hardware::ppu::palette::{DisplayColour, Palette, RGB};
use crate::hardware::ppu::register_flags::{AttributeFlags, LcdControl, LcdStatus};
use crate::hardware::ppu::tiledata::{SpriteAttribute, TileData, TileMap, BACKGROUND_TILE_SIZE};
use crate::io::interrupts::{InterruptFlags, InterruptSink};

pub const RESOLUTION_WIDTH: usize = 160;
pub const RESOLUTION_HEIGHT: usize = 144;
pub const RGB_CHANNELS: usize = 3;
pub const FRAMEBUFFER_SIZE: usize = RESOLUTION_HEIGHT * RESOLUTION_WIDTH * RGB_CHANNELS;

pub const JOYPAD_REGISTER: u16 = 0xFF00;
pub const LCD_CONTROL_REGISTER: u16 = 0xFF40;
pub const LCD_STATUS_REGISTER: u16 = 0xFF41;
pub const SCY_REGISTER: u16 = 0xFF42;
pub const SCX_REGISTER: u16 = 0xFF43;
pub const LY_REGISTER: u16 = 0xFF44;
pub const LYC_REGISTER: u16 = 0xFF45;
pub const DMA_TRANSFER: u16 = 0xFF46;
pub const BG_PALETTE: u16 = 0xFF47;
pub const OB_PALETTE_0: u16 = 0xFF48;
pub const OB_PALETTE_1: u16 = 0xFF49;
pub const WY_REGISTER: u16 = 0xFF4A;
pub const WX_REGISTER: u16 = 0xFF4B;

pub const CGB_VRAM_BANK_REGISTER: u16 = 0xFF4F;
pub const CGB_BG_PALETTE_IND: u16 = 0xFF68;
pub const CGB_BG_PALETTE_DATA: u16 = 0xFF69;
pub const CGB_SPRITE_PALETTE_IND: u16 = 0xFF6A;
pub const CGB_SPRITE_PALETTE_DATA: u16 = 0xFF6B;
pub const CGB_OBJECT_PRIORITY_MODE: u16 = 0xFF6C;

use tiledata::TILE_BLOCK_0_START;

pub const TILEMAP_9800_START: u16 = 0x9800;
pub const TILEMAP_9800_END: u16 = 0x9BFF;
pub const TILEMAP_9C00_START: u16 = 0x9C00;
pub const TILEMAP_9C00_END: u16 = 0x9FFF;
pub const TILEMAP_START: u16 = TILEMAP_9800_START;
pub const TILEMAP_END: u16 = TILEMAP_9C00_END;

pub const OAM_ATTRIBUTE_START: u16 = 0xFE00;

pub const OAM_SEARCH_CYCLES: u16 = 80;
pub const LCD_TRANSFER_CYCLES: u16 = 172;
pub const HBLANK_CYCLES: u16 = 204;
pub const SCANLINE_CYCLES: u16 = 456;
/// `OAM_SEARCH_CYCLES + LCD_TRANSFER_CYCLES + HBLANK_CYCLES`, i.e. the part of the
/// scanline that Transfer and HBlank share out between them once Transfer runs long.
pub const TRANSFER_PLUS_HBLANK_CYCLES: u16 = SCANLINE_CYCLES - OAM_SEARCH_CYCLES;
/// Grace period (in T-cycles) spent in `HBlankFirst` right after the LCD is re-enabled,
/// before the first real `OamSearch` of the newly restarted display begins.
pub const LCD_ON_GRACE_CYCLES: u16 = 18;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    OamSearch,
    Transfer,
    HBlank,
    VBlank,
    /// The brief window right after LCDC.7 is set, during which OAM/VRAM are both
    /// still accessible before the PPU starts its first real scanline.
    HBlankFirst,
}

#[derive(Debug)]
pub struct PPU {
    pub frame_buffer: [u8; FRAMEBUFFER_SIZE],
    mode: Mode,
    mode_cycles: u16,
    pub current_y: u8,
    window_line_counter: u8,
    window_triggered: bool,
    /// Mode 3 duration for the scanline currently in progress, in T-cycles; recomputed
    /// from SCX/window/sprite state the instant OAM search hands off to Transfer.
    current_lcd_transfer_duration: u16,

    pub lcd_control: LcdControl,
    lcd_status: LcdStatus,
    pub scroll_x: u8,
    scroll_y: u8,
    pub window_x: u8,
    window_y: u8,
    lyc: u8,
    stat_irq_line: bool,

    dmg_display_colours: DisplayColour,
    bg_window_palette: Palette,
    oam_palette_0: Palette,
    oam_palette_1: Palette,

    tile_data: [TileData; 2],
    tile_map_9800: TileMap,
    tile_map_9c00: TileMap,
    cgb_tile_map_9800: CgbTileMap,
    cgb_tile_map_9c00: CgbTileMap,
    pub oam: [SpriteAttribute; 40],

    emulated_model: EmulatorMode,
    vram_bank: u8,
    cgb_bg_palette: [u8; 64],
    cgb_bg_palette_ind: u8,
    cgb_sprite_palette: [u8; 64],
    cgb_sprite_palette_ind: u8,
    cgb_object_priority_sort: bool,

    /// Set by the bus while an OAM-DMA transfer is in flight; blocks CPU OAM access but not
    /// the PPU's own rendering reads.
    pub oam_locked_by_dma: bool,
}

impl PPU {
    pub fn new(emulated_model: EmulatorMode) -> Self {
        PPU {
            frame_buffer: [0xFF; FRAMEBUFFER_SIZE],
            mode: Mode::OamSearch,
            mode_cycles: 0,
            current_y: 0,
            window_line_counter: 0,
            window_triggered: false,
            current_lcd_transfer_duration: LCD_TRANSFER_CYCLES,
            lcd_control: LcdControl::from_bits_truncate(0x91),
            lcd_status: LcdStatus::from_bits_truncate(0x85),
            scroll_x: 0,
            scroll_y: 0,
            window_x: 0,
            window_y: 0,
            lyc: 0,
            stat_irq_line: false,
            dmg_display_colours: DisplayColour::default(),
            bg_window_palette: Palette::default(),
            oam_palette_0: Palette::default(),
            oam_palette_1: Palette::default(),
            tile_data: [TileData::new(), TileData::new()],
            tile_map_9800: TileMap::new(),
            tile_map_9c00: TileMap::new(),
            cgb_tile_map_9800: CgbTileMap::new(),
            cgb_tile_map_9c00: CgbTileMap::new(),
            oam: [SpriteAttribute::default(); 40],
            emulated_model,
            vram_bank: 0,
            cgb_bg_palette: [0xFF; 64],
            cgb_bg_palette_ind: 0,
            cgb_sprite_palette: [0xFF; 64],
            cgb_sprite_palette_ind: 0,
            cgb_object_priority_sort: false,
            oam_locked_by_dma: false,
        }
    }

    fn is_cgb(&self) -> bool {
        self.emulated_model == EmulatorMode::Cgb
    }

    pub fn frame_buffer(&self) -> &[u8; FRAMEBUFFER_SIZE] {
        &self.frame_buffer
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    /// Advance the PPU by one M-cycle's worth of dots (4, or 8 in CGB double speed).
    /// Mirrors the top-level bus loop: called once per CPU M-cycle, unconditionally.
    pub fn tick(&mut self, t_cycles: u32, sink: &mut dyn InterruptSink) {
        if !self.lcd_control.contains(LcdControl::LCD_DISPLAY) {
            return;
        }

        let mut remaining = t_cycles;
        while remaining > 0 {
            self.mode_cycles += 1;
            remaining -= 1;
            self.advance_mode(sink);
        }
    }

    fn advance_mode(&mut self, sink: &mut dyn InterruptSink) {
        match self.mode {
            Mode::HBlankFirst => {
                if self.mode_cycles >= LCD_ON_GRACE_CYCLES {
                    self.enter_mode(Mode::OamSearch, sink);
                }
            }
            Mode::OamSearch => {
                if self.mode_cycles >= OAM_SEARCH_CYCLES {
                    self.current_lcd_transfer_duration = self.calculate_lcd_transfer_duration();
                    self.enter_mode(Mode::Transfer, sink);
                }
            }
            Mode::Transfer => {
                if self.mode_cycles >= self.current_lcd_transfer_duration {
                    self.draw_scanline();
                    self.enter_mode(Mode::HBlank, sink);
                }
            }
            Mode::HBlank => {
                if self.mode_cycles >= self.hblank_duration() {
                    self.current_y += 1;
                    if self.current_y == RESOLUTION_HEIGHT as u8 {
                        self.enter_mode(Mode::VBlank, sink);
                        sink.request_interrupt(InterruptFlags::VBLANK);
                    } else {
                        self.enter_mode(Mode::OamSearch, sink);
                    }
                    self.check_lyc(sink);
                }
            }
            Mode::VBlank => {
                if self.mode_cycles >= SCANLINE_CYCLES {
                    self.mode_cycles = 0;
                    self.current_y += 1;
                    if self.current_y > 153 {
                        self.current_y = 0;
                        self.window_line_counter = 0;
                        self.enter_mode(Mode::OamSearch, sink);
                    }
                    self.check_lyc(sink);
                }
            }
        }
    }

    fn enter_mode(&mut self, mode: Mode, sink: &mut dyn InterruptSink) {
        self.mode = mode;
        self.mode_cycles = 0;
        self.lcd_status.set_mode_flag(mode);
        self.request_stat_interrupt(sink);
    }

    fn check_lyc(&mut self, sink: &mut dyn InterruptSink) {
        let coincidence = self.current_y == self.lyc;
        self.lcd_status.set(LcdStatus::COINCIDENCE_FLAG, coincidence);
        self.request_stat_interrupt(sink);
    }

    /// STAT only fires on a rising edge of the OR of its four sources (the well known
    /// "STAT IRQ blocking" quirk), so we latch the combined line and only request an
    /// interrupt when it was previously low.
    fn request_stat_interrupt(&mut self, sink: &mut dyn InterruptSink) {
        let mode_source = match self.mode {
            Mode::HBlank | Mode::HBlankFirst => self.lcd_status.contains(LcdStatus::MODE_0_H_INTERRUPT),
            Mode::VBlank => self.lcd_status.contains(LcdStatus::MODE_1_V_INTERRUPT),
            Mode::OamSearch => self.lcd_status.contains(LcdStatus::MODE_2_OAM_INTERRUPT),
            Mode::Transfer => false,
        };
        let lyc_source =
            self.lcd_status.contains(LcdStatus::COINCIDENCE_INTERRUPT) && self.lcd_status.contains(LcdStatus::COINCIDENCE_FLAG);
        let line = mode_source || lyc_source;

        if line && !self.stat_irq_line {
            sink.request_interrupt(InterruptFlags::LCD);
        }
        self.stat_irq_line = line;
    }

    /// HBlank lasts whatever's left of the scanline once Transfer is done.
    fn hblank_duration(&self) -> u16 {
        TRANSFER_PLUS_HBLANK_CYCLES - self.current_lcd_transfer_duration
    }

    /// Mode 3 has no fixed length: it pauses the pixel FIFO for the first `SCX % 8`
    /// pixels of the scanline, for at least 6 cycles while the window is being fetched,
    /// and for `11 - min(5, (x + to_add) % 8)` cycles per visible sprite (capped at the
    /// usual 10-sprites-per-line limit).
    fn calculate_lcd_transfer_duration(&self) -> u16 {
        let mut cycles = LCD_TRANSFER_CYCLES;
        cycles += (self.scroll_x % 8) as u16;

        if self.window_triggered && self.window_x < 168 && self.lcd_control.contains(LcdControl::WINDOW_DISPLAY) {
            cycles += 6;
        }

        let tall_sprites = self.lcd_control.contains(LcdControl::SPRITE_SIZE);
        let sprite_height: i16 = if tall_sprites { 16 } else { 8 };

        let sprite_cycles: u16 = self
            .oam
            .iter()
            .filter(|sprite| {
                let screen_y = sprite.y_pos as i16 - 16;
                is_sprite_on_scanline(self.current_y as i16, screen_y, sprite_height)
            })
            .take(10)
            .map(|sprite| {
                let to_add = if self.window_triggered && self.window_x >= sprite.x_pos {
                    255u8.wrapping_sub(self.window_x)
                } else {
                    self.scroll_x
                };
                (11 - core::cmp::min(5, sprite.x_pos.wrapping_add(to_add) % 8)) as u16
            })
            .sum();
        cycles += sprite_cycles;

        cycles
    }

    pub fn turn_off_lcd(&mut self) {
        self.lcd_control.remove(LcdControl::LCD_DISPLAY);
        self.mode = Mode::HBlankFirst;
        self.mode_cycles = 0;
        self.current_y = 0;
        self.lcd_status.set_mode_flag(Mode::HBlank);
        self.stat_irq_line = false;
        self.frame_buffer = [0xFF; FRAMEBUFFER_SIZE];
    }

    pub fn turn_on_lcd(&mut self) {
        self.lcd_control.insert(LcdControl::LCD_DISPLAY);
        self.mode = Mode::HBlankFirst;
        self.mode_cycles = 0;
        self.current_y = 0;
    }

    // # Register accessors #

    pub fn get_lcd_control(&self) -> u8 {
        self.lcd_control.bits()
    }

    pub fn set_lcd_control(&mut self, value: u8, sink: &mut dyn InterruptSink) {
        let was_on = self.lcd_control.contains(LcdControl::LCD_DISPLAY);
        self.lcd_control = LcdControl::from_bits_truncate(value);
        let is_on = self.lcd_control.contains(LcdControl::LCD_DISPLAY);

        if was_on && !is_on {
            self.turn_off_lcd();
        } else if !was_on && is_on {
            self.turn_on_lcd();
        }
        self.request_stat_interrupt(sink);
    }

    pub fn get_lcd_status(&self) -> u8 {
        self.lcd_status.bits() | 0x80
    }

    /// DMG hardware quirk: writing to STAT while the PPU is active momentarily ORs in
    /// all three interrupt-source bits, which can spuriously fire STAT if any matching
    /// mode/LYC condition is currently true.
    pub fn set_lcd_status(&mut self, value: u8, sink: &mut dyn InterruptSink) {
        let read_only = self.lcd_status.bits() & 0x07;
        self.lcd_status = LcdStatus::from_bits_truncate((value & 0xF8) | read_only);

        if !self.is_cgb() && self.lcd_control.contains(LcdControl::LCD_DISPLAY) {
            let glitched = (self.lcd_status.bits() | 0x07) & 0xF8 | read_only;
            self.lcd_status = LcdStatus::from_bits_truncate(glitched);
        }
        self.request_stat_interrupt(sink);
    }

    pub fn get_scy(&self) -> u8 {
        self.scroll_y
    }
    pub fn set_scy(&mut self, value: u8) {
        self.scroll_y = value;
    }
    pub fn get_scx(&self) -> u8 {
        self.scroll_x
    }
    pub fn set_scx(&mut self, value: u8) {
        self.scroll_x = value;
    }
    pub fn get_ly(&self) -> u8 {
        self.current_y
    }
    pub fn set_ly(&mut self, _value: u8) {
        // Read-only on real hardware.
    }
    pub fn get_lyc(&self) -> u8 {
        self.lyc
    }
    pub fn set_lyc(&mut self, value: u8, sink: &mut dyn InterruptSink) {
        self.lyc = value;
        self.check_lyc(sink);
    }
    pub fn get_window_y(&self) -> u8 {
        self.window_y
    }
    pub fn set_window_y(&mut self, value: u8) {
        self.window_y = value;
    }
    pub fn get_window_x(&self) -> u8 {
        self.window_x
    }
    pub fn set_window_x(&mut self, value: u8) {
        self.window_x = value;
    }

    pub fn get_bg_palette(&self) -> u8 {
        self.bg_window_palette.into()
    }
    pub fn set_bg_palette(&mut self, value: u8) {
        self.bg_window_palette = Palette::new(value, self.dmg_display_colours);
    }
    pub fn get_oam_palette_0(&self) -> u8 {
        self.oam_palette_0.into()
    }
    pub fn set_oam_palette_0(&mut self, value: u8) {
        self.oam_palette_0 = Palette::new(value, self.dmg_display_colours);
    }
    pub fn get_oam_palette_1(&self) -> u8 {
        self.oam_palette_1.into()
    }
    pub fn set_oam_palette_1(&mut self, value: u8) {
        self.oam_palette_1 = Palette::new(value, self.dmg_display_colours);
    }

    /// Sets custom DMG shade colours (for non-green LCD palette emulation) and re-derives
    /// the three DMG palettes from their last-written palette bytes.
    pub fn update_display_colours(&mut self, colours: DisplayColour) {
        self.dmg_display_colours = colours;
        self.bg_window_palette = Palette::new(self.bg_window_palette.into(), colours);
        self.oam_palette_0 = Palette::new(self.oam_palette_0.into(), colours);
        self.oam_palette_1 = Palette::new(self.oam_palette_1.into(), colours);
    }

    pub fn get_vram_bank(&self) -> u8 {
        self.vram_bank | 0xFE
    }
    pub fn set_vram_bank(&mut self, value: u8) {
        self.vram_bank = value & 0x1;
    }

    pub fn get_cgb_bg_palette_ind(&self) -> u8 {
        self.cgb_bg_palette_ind | 0x40
    }
    pub fn set_cgb_bg_palette_ind(&mut self, value: u8) {
        self.cgb_bg_palette_ind = value & 0xBF;
    }
    pub fn get_cgb_bg_palette_data(&self) -> u8 {
        self.cgb_bg_palette[(self.cgb_bg_palette_ind & 0x3F) as usize]
    }
    pub fn set_cgb_bg_palette_data(&mut self, value: u8) {
        let index = (self.cgb_bg_palette_ind & 0x3F) as usize;
        self.cgb_bg_palette[index] = value;
        if self.cgb_bg_palette_ind & 0x80 != 0 {
            self.cgb_bg_palette_ind = 0x80 | ((index as u8 + 1) & 0x3F);
        }
    }
    pub fn get_cgb_sprite_palette_ind(&self) -> u8 {
        self.cgb_sprite_palette_ind | 0x40
    }
    pub fn set_cgb_sprite_palette_ind(&mut self, value: u8) {
        self.cgb_sprite_palette_ind = value & 0xBF;
    }
    pub fn get_cgb_sprite_palette_data(&self) -> u8 {
        self.cgb_sprite_palette[(self.cgb_sprite_palette_ind & 0x3F) as usize]
    }
    pub fn set_cgb_sprite_palette_data(&mut self, value: u8) {
        let index = (self.cgb_sprite_palette_ind & 0x3F) as usize;
        self.cgb_sprite_palette[index] = value;
        if self.cgb_sprite_palette_ind & 0x80 != 0 {
            self.cgb_sprite_palette_ind = 0x80 | ((index as u8 + 1) & 0x3F);
        }
    }
    pub fn get_object_priority_mode(&self) -> u8 {
        self.cgb_object_priority_sort as u8 | 0xFE
    }
    pub fn set_object_priority_mode(&mut self, value: u8) {
        self.cgb_object_priority_sort = value & 0x1 != 0;
    }

    fn cgb_colour(&self, palette: &[u8; 64], palette_number: u8, colour_index: u8) -> RGB {
        let offset = (palette_number as usize * 8) + (colour_index as usize * 2);
        let lo = palette[offset] as u16;
        let hi = palette[offset + 1] as u16;
        let raw = lo | (hi << 8);
        let r = (raw & 0x1F) as u8;
        let g = ((raw >> 5) & 0x1F) as u8;
        let b = ((raw >> 10) & 0x1F) as u8;
        RGB(r << 3, g << 3, b << 3)
    }

    // # VRAM / OAM byte access, bank-aware in CGB mode #

    pub fn can_access_vram(&self) -> bool {
        !matches!(self.mode, Mode::Transfer)
    }

    pub fn can_access_oam(&self) -> bool {
        !self.oam_locked_by_dma && !matches!(self.mode, Mode::OamSearch | Mode::Transfer)
    }

    pub fn get_tile_byte(&self, address: u16) -> u8 {
        let bank = if self.is_cgb() { self.vram_bank as usize } else { 0 };
        let (tile_index, byte_index) = get_tile_address(address);
        self.tile_data_byte(bank, tile_index, byte_index)
    }

    fn tile_data_byte(&self, bank: usize, tile_index: usize, byte_index: usize) -> u8 {
        let tile = self.tile_data[bank].tile(tile_index);
        let (lo, hi) = tile.get_pixel_line((byte_index / 2) as u8);
        if byte_index % 2 == 0 {
            lo
        } else {
            hi
        }
    }

    pub fn set_tile_byte(&mut self, address: u16, value: u8) {
        let bank = if self.is_cgb() { self.vram_bank as usize } else { 0 };
        let (tile_index, byte_index) = get_tile_address(address);
        self.tile_data[bank].tile_mut(tile_index).update_pixel_data(byte_index, value);
    }

    pub fn get_tilemap_byte(&self, address: u16) -> u8 {
        let bank = if self.is_cgb() { self.vram_bank } else { 0 };
        let offset = (address - TILEMAP_9800_START) as usize & (2 * BACKGROUND_TILE_SIZE - 1);
        let (map, cgb_map, local_offset) = if offset < BACKGROUND_TILE_SIZE {
            (&self.tile_map_9800, &self.cgb_tile_map_9800, offset)
        } else {
            (&self.tile_map_9c00, &self.cgb_tile_map_9c00, offset - BACKGROUND_TILE_SIZE)
        };

        if bank == 1 {
            cgb_map.attributes[local_offset].bits()
        } else {
            map.get_byte(local_offset)
        }
    }

    pub fn set_tilemap_byte(&mut self, address: u16, value: u8) {
        let bank = if self.is_cgb() { self.vram_bank } else { 0 };
        let offset = (address - TILEMAP_9800_START) as usize & (2 * BACKGROUND_TILE_SIZE - 1);
        let in_9800 = offset < BACKGROUND_TILE_SIZE;
        let local_offset = if in_9800 { offset } else { offset - BACKGROUND_TILE_SIZE };

        if bank == 1 {
            let map = if in_9800 {
                &mut self.cgb_tile_map_9800
            } else {
                &mut self.cgb_tile_map_9c00
            };
            map.attributes[local_offset] = CgbTileAttribute::from_bits_truncate(value);
        } else {
            let map = if in_9800 {
                &mut self.tile_map_9800
            } else {
                &mut self.tile_map_9c00
            };
            map.set_byte(local_offset, value);
        }
    }

    pub fn get_oam_byte(&self, address: u16) -> u8 {
        let index = ((address - OAM_ATTRIBUTE_START) / 4) as usize;
        let offset = (address - OAM_ATTRIBUTE_START) % 4;
        self.oam[index].get_byte(offset)
    }

    pub fn set_oam_byte(&mut self, address: u16, value: u8) {
        let index = ((address - OAM_ATTRIBUTE_START) / 4) as usize;
        let offset = (address - OAM_ATTRIBUTE_START) % 4;
        self.oam[index].set_byte(offset, value);
    }

    /// Called by the bus while gathering a completed 160 M-cycle OAM-DMA transfer into
    /// sprite memory, one byte at a time.
    pub fn oam_dma_write(&mut self, index: usize, value: u8) {
        let sprite = index / 4;
        let offset = (index % 4) as u16;
        if sprite < self.oam.len() {
            self.oam[sprite].set_byte(offset, value);
        }
    }

    // # Rendering #

    fn draw_scanline(&mut self) {
        let mut bg_priority = [false; RESOLUTION_WIDTH];
        let mut line_colours = [RGB::default(); RESOLUTION_WIDTH];

        if self.lcd_control.contains(LcdControl::BG_WINDOW_PRIORITY) || self.is_cgb() {
            self.draw_bg_scanline(&mut line_colours, &mut bg_priority);
        }
        if self.lcd_control.contains(LcdControl::WINDOW_DISPLAY) {
            self.draw_window_scanline(&mut line_colours, &mut bg_priority);
        }
        if self.lcd_control.contains(LcdControl::SPRITE_DISPLAY_ENABLE) {
            self.draw_sprite_scanline(&mut line_colours, &bg_priority);
        }

        let row_start = self.current_y as usize * RESOLUTION_WIDTH * RGB_CHANNELS;
        for x in 0..RESOLUTION_WIDTH {
            let RGB(r, g, b) = line_colours[x];
            let pixel_start = row_start + x * RGB_CHANNELS;
            self.frame_buffer[pixel_start] = r;
            self.frame_buffer[pixel_start + 1] = g;
            self.frame_buffer[pixel_start + 2] = b;
        }
    }

    fn draw_bg_scanline(&mut self, line_colours: &mut [RGB; RESOLUTION_WIDTH], bg_priority: &mut [bool; RESOLUTION_WIDTH]) {
        let y = self.current_y.wrapping_add(self.scroll_y);
        let tile_row = (y / 8) as u16;
        let pixel_row = y % 8;
        let use_9c00 = self.lcd_control.contains(LcdControl::BG_TILE_MAP_SELECT);

        for x in 0..RESOLUTION_WIDTH as u8 {
            let scrolled_x = x.wrapping_add(self.scroll_x);
            let tile_col = (scrolled_x / 8) as u16;
            let pixel_col = scrolled_x % 8;
            let map_offset = (tile_row * 32 + tile_col) as usize;

            let (tile_value, attr) = self.lookup_tile_map(use_9c00, map_offset);
            let tile_index = self.resolve_tile_index(tile_value);
            let bank = if self.is_cgb() { attr.bits() & 0x8 != 0 } else { false };
            let row = if attr.contains(AttributeFlags::Y_FLIP) { 7 - pixel_row } else { pixel_row };
            let col = if attr.contains(AttributeFlags::X_FLIP) { 7 - pixel_col } else { pixel_col };

            let colour_index = self.tile_pixel(bank as usize, tile_index, row, col);
            let colour = if self.is_cgb() {
                self.cgb_colour(&self.cgb_bg_palette, attr.get_cgb_palette_number() as u8, colour_index)
            } else {
                self.bg_window_palette.colour(colour_index)
            };

            line_colours[x as usize] = colour;
            bg_priority[x as usize] = (colour_index != 0) && attr.contains(AttributeFlags::BG_TO_OAM_PRIORITY);
        }
    }

    fn draw_window_scanline(&mut self, line_colours: &mut [RGB; RESOLUTION_WIDTH], bg_priority: &mut [bool; RESOLUTION_WIDTH]) {
        if self.current_y < self.window_y || self.window_x > 166 {
            return;
        }
        self.window_triggered = true;

        let use_9c00 = self.lcd_control.contains(LcdControl::WINDOW_MAP_SELECT);
        let window_y = self.window_line_counter;
        let tile_row = (window_y / 8) as u16;
        let pixel_row = window_y % 8;
        let wx = self.window_x as i16 - 7;

        let mut drawn_any = false;
        for x in 0..RESOLUTION_WIDTH as i16 {
            if x < wx {
                continue;
            }
            drawn_any = true;
            let win_x = (x - wx) as u8;
            let tile_col = (win_x / 8) as u16;
            let pixel_col = win_x % 8;
            let map_offset = (tile_row * 32 + tile_col) as usize;

            let (tile_value, attr) = self.lookup_tile_map(use_9c00, map_offset);
            let tile_index = self.resolve_tile_index(tile_value);
            let bank = if self.is_cgb() { attr.bits() & 0x8 != 0 } else { false };
            let row = if attr.contains(AttributeFlags::Y_FLIP) { 7 - pixel_row } else { pixel_row };
            let col = if attr.contains(AttributeFlags::X_FLIP) { 7 - pixel_col } else { pixel_col };

            let colour_index = self.tile_pixel(bank as usize, tile_index, row, col);
            let colour = if self.is_cgb() {
                self.cgb_colour(&self.cgb_bg_palette, attr.get_cgb_palette_number() as u8, colour_index)
            } else {
                self.bg_window_palette.colour(colour_index)
            };

            line_colours[x as usize] = colour;
            bg_priority[x as usize] = (colour_index != 0) && attr.contains(AttributeFlags::BG_TO_OAM_PRIORITY);
        }
        if drawn_any {
            self.window_line_counter += 1;
        }
    }

    fn draw_sprite_scanline(&mut self, line_colours: &mut [RGB; RESOLUTION_WIDTH], bg_priority: &[bool; RESOLUTION_WIDTH]) {
        let tall = self.lcd_control.contains(LcdControl::SPRITE_SIZE);
        let sprite_height: i16 = if tall { 16 } else { 8 };

        let mut visible: Vec<&SpriteAttribute> = self
            .oam
            .iter()
            .filter(|s| {
                let screen_y = s.y_pos as i16 - 16;
                is_sprite_on_scanline(self.current_y as i16, screen_y, sprite_height)
            })
            .take(10)
            .collect();

        if !self.is_cgb() || self.cgb_object_priority_sort {
            // Ascending by X, then reversed: a stable sort preserves OAM order among ties,
            // so after the reverse the lower-index sprite of an equal-X pair is drawn last
            // (and so wins, since later draws overwrite earlier ones).
            visible.sort_by_key(|s| s.x_pos);
            visible.reverse();
        } else {
            visible.reverse();
        }

        for sprite in visible {
            let screen_y = sprite.y_pos as i16 - 16;
            let attr = sprite.attribute_flags;
            let mut row = (self.current_y as i16 - screen_y) as u8;
            if attr.contains(AttributeFlags::Y_FLIP) {
                row = sprite_height as u8 - 1 - row;
            }
            let base_tile = if tall { sprite.tile_number & 0xFE } else { sprite.tile_number };
            let tile_index = if tall && row >= 8 { (base_tile + 1) as usize } else { base_tile as usize };
            let row = row % 8;
            let bank = if self.is_cgb() { attr.contains(AttributeFlags::TILE_VRAM_BANK) } else { false };

            for col in 0..8u8 {
                let screen_x = sprite.x_pos as i16 - 8 + col as i16;
                if screen_x < 0 || screen_x >= RESOLUTION_WIDTH as i16 {
                    continue;
                }
                let eff_col = if attr.contains(AttributeFlags::X_FLIP) { 7 - col } else { col };
                let colour_index = self.tile_pixel(bank as usize, tile_index, row, eff_col);
                if colour_index == 0 {
                    continue;
                }
                if bg_priority[screen_x as usize] {
                    continue;
                }

                let colour = if self.is_cgb() {
                    self.cgb_colour(&self.cgb_sprite_palette, attr.get_cgb_palette_number() as u8, colour_index)
                } else if attr.contains(AttributeFlags::PALETTE_NUMBER) {
                    self.oam_palette_1.colour(colour_index)
                } else {
                    self.oam_palette_0.colour(colour_index)
                };

                line_colours[screen_x as usize] = colour;
            }
        }
    }

    fn lookup_tile_map(&self, use_9c00: bool, offset: usize) -> (u8, AttributeFlags) {
        if use_9c00 {
            (self.tile_map_9c00.get_byte(offset), self.cgb_tile_map_9c00_attr(offset))
        } else {
            (self.tile_map_9800.get_byte(offset), self.cgb_tile_map_9800_attr(offset))
        }
    }

    fn cgb_tile_map_9800_attr(&self, offset: usize) -> AttributeFlags {
        AttributeFlags::from_bits_truncate(self.cgb_tile_map_9800.attributes[offset].bits())
    }
    fn cgb_tile_map_9c00_attr(&self, offset: usize) -> AttributeFlags {
        AttributeFlags::from_bits_truncate(self.cgb_tile_map_9c00.attributes[offset].bits())
    }

    fn resolve_tile_index(&self, tile_value: u8) -> usize {
        if self.lcd_control.contains(LcdControl::BG_WINDOW_TILE_SELECT) {
            tile_value as usize
        } else {
            (256 + (tile_value as i8 as i16)) as usize
        }
    }

    fn tile_pixel(&self, bank: usize, tile_index: usize, row: u8, col: u8) -> u8 {
        let tile = self.tile_data[bank].tile(tile_index);
        let (lo, hi) = tile.get_pixel_line(row);
        let bit = 7 - col;
        let low_bit = (lo >> bit) & 0x1;
        let high_bit = (hi >> bit) & 0x1;
        (high_bit << 1) | low_bit
    }
}

/// Translates a VRAM tile-data address into `(tile_index, byte_within_tile)`.
pub fn get_tile_address(address: u16) -> (usize, usize) {
    let offset = address - TILE_BLOCK_0_START;
    ((offset / 16) as usize, (offset % 16) as usize)
}

pub fn is_sprite_on_scanline(current_y: i16, sprite_screen_y: i16, sprite_height: i16) -> bool {
    current_y >= sprite_screen_y && current_y < sprite_screen_y + sprite_height
}
