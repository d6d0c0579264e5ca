use super::*;
use crate::emulator::EmulatorMode;
use crate::hardware::ppu::palette::DisplayColour;
use crate::hardware::ppu::register_flags::AttributeFlags;
use crate::hardware::ppu::tiledata::SpriteAttribute;

fn blank_ppu() -> PPU {
    PPU::new(EmulatorMode::Dmg)
}

#[test]
fn oam_search_blocks_oam_but_not_vram() {
    let mut ppu = blank_ppu();
    ppu.mode = Mode::OamSearch;

    assert!(ppu.can_access_vram());
    assert!(!ppu.can_access_oam());
}

#[test]
fn transfer_blocks_both_vram_and_oam() {
    let mut ppu = blank_ppu();
    ppu.mode = Mode::Transfer;

    assert!(!ppu.can_access_vram());
    assert!(!ppu.can_access_oam());
}

#[test]
fn hblank_allows_both_unless_dma_is_active() {
    let mut ppu = blank_ppu();
    ppu.mode = Mode::HBlank;

    assert!(ppu.can_access_vram());
    assert!(ppu.can_access_oam());

    ppu.oam_locked_by_dma = true;
    assert!(ppu.can_access_vram());
    assert!(!ppu.can_access_oam());
}

#[test]
fn transfer_duration_lengthens_with_scroll_x_and_no_sprites() {
    let mut ppu = blank_ppu();
    ppu.scroll_x = 7;

    let duration = ppu.calculate_lcd_transfer_duration();

    assert_eq!(duration, LCD_TRANSFER_CYCLES + 7);
    ppu.current_lcd_transfer_duration = duration;
    assert_eq!(ppu.hblank_duration(), TRANSFER_PLUS_HBLANK_CYCLES - duration);
}

#[test]
fn transfer_duration_adds_a_penalty_per_visible_sprite() {
    let mut ppu = blank_ppu();
    ppu.scroll_x = 0;
    ppu.current_y = 0;
    // On-screen at row 0 (y_pos 16 => screen_y 0); x_pos 13 => (13 + 0) % 8 == 5, so this
    // sprite costs `11 - min(5, 5)` = 6 cycles.
    ppu.oam[0] = SpriteAttribute {
        y_pos: 16,
        x_pos: 13,
        tile_number: 0,
        attribute_flags: AttributeFlags::empty(),
    };

    let duration = ppu.calculate_lcd_transfer_duration();

    assert_eq!(duration, LCD_TRANSFER_CYCLES + 6);
}

#[test]
fn sprite_draw_order_favours_the_lower_oam_index_on_a_tied_x_position() {
    let mut ppu = blank_ppu();
    // LCD on, sprites on, background/window off so only sprite pixels land in the buffer.
    ppu.lcd_control = LcdControl::from_bits_truncate(0b1000_0010);
    ppu.current_y = 0;
    // Distinct shades so the winning sprite's colour index is unambiguous in the result.
    ppu.update_display_colours(DisplayColour {
        white: RGB(255, 255, 255),
        light_grey: RGB(200, 200, 200),
        dark_grey: RGB(100, 100, 100),
        black: RGB(0, 0, 0),
    });

    // Both sprites sit on the same scanline at the same X; index 0 should win the tie.
    ppu.oam[0] = SpriteAttribute {
        y_pos: 16,
        x_pos: 50,
        tile_number: 0,
        attribute_flags: AttributeFlags::empty(),
    };
    ppu.oam[1] = SpriteAttribute {
        y_pos: 16,
        x_pos: 50,
        tile_number: 1,
        attribute_flags: AttributeFlags::empty(),
    };

    // Tile 0's first row is entirely colour index 1; tile 1's is entirely colour index 3.
    ppu.set_tile_byte(0x8000, 0xFF);
    ppu.set_tile_byte(0x8010, 0xFF);
    ppu.set_tile_byte(0x8011, 0xFF);

    ppu.draw_scanline();

    let expected = ppu.oam_palette_0.colour(1);
    let pixel_start = (50 - 8) * RGB_CHANNELS;
    let pixel = RGB(
        ppu.frame_buffer[pixel_start],
        ppu.frame_buffer[pixel_start + 1],
        ppu.frame_buffer[pixel_start + 2],
    );
    assert_eq!(pixel, expected);
}
