//! Joypad implementation, heavily inspired by MoonEyeGB,
//! as I couldn't glean from the docs how the Joypad was implemented
//! with games writing to the Joypad register.

use bitflags::*;

use crate::io::interrupts::{InterruptFlags, InterruptSink};

pub const JOYPAD_REGISTER: u16 = 0xFF00;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum InputKey {
    START,
    SELECT,
    A,
    B,
    UP,
    DOWN,
    LEFT,
    RIGHT,
}

#[derive(Debug, Clone)]
pub struct JoyPad {
    pressed_buttons: JoypadFlags,
    pressed_directions: JoypadFlags,
    selected_mode: JoypadFlags,
    /// Low nibble of the register as of the last `update_flags`, used to edge-detect
    /// a 1->0 transition for `IF.JOYPAD`.
    previous_low_nibble: u8,
}

impl JoyPad {
    pub fn new() -> Self {
        let mut pad = JoyPad {
            pressed_buttons: JoypadFlags::empty(),
            pressed_directions: JoypadFlags::empty(),
            selected_mode: JoypadFlags::from_bits_truncate(0xFF),
            previous_low_nibble: 0x0F,
        };
        pad.previous_low_nibble = pad.get_register() & 0x0F;
        pad
    }

    /// Get the current JoyPad register for the most recently selected mode (Button, Direction)
    pub fn get_register(&self) -> u8 {
        !self.selected_mode.bits
    }

    /// Set the register, primarily used to set the current mode (Button, Direction) by games.
    /// If a game tries to write to the lower nibble for some reason those bits will just be
    /// discarded.
    pub fn set_register(&mut self, mode: u8, sink: &mut dyn InterruptSink) {
        self.selected_mode = JoypadFlags::from_bits_truncate(!mode);
        self.update_flags(sink);
    }

    /// Register a key as pressed down.
    pub fn press_key(&mut self, input: InputKey, sink: &mut dyn InterruptSink) {
        use InputKey::*;
        match input {
            DOWN | UP | LEFT | RIGHT => self.pressed_directions.insert(input.get_flag_value()),
            A | B | SELECT | START => self.pressed_buttons.insert(input.get_flag_value()),
        }
        self.update_flags(sink);
    }

    /// Release a key that was pressed down before.
    pub fn release_key(&mut self, input: InputKey, sink: &mut dyn InterruptSink) {
        use InputKey::*;
        match input {
            DOWN | UP | LEFT | RIGHT => self.pressed_directions.remove(input.get_flag_value()),
            A | B | SELECT | START => self.pressed_buttons.remove(input.get_flag_value()),
        }
        self.update_flags(sink)
    }

    fn update_flags(&mut self, sink: &mut dyn InterruptSink) {
        // Discard any writes that may have been made to the lower nibble.
        self.selected_mode = JoypadFlags::from_bits_truncate(self.selected_mode.bits() & 0b0011_0000);
        if self.selected_mode.contains(JoypadFlags::BUTTON_KEYS) {
            self.selected_mode.insert(self.pressed_buttons);
        }
        if self.selected_mode.contains(JoypadFlags::DIRECTION_KEYS) {
            self.selected_mode.insert(self.pressed_directions);
        }

        // The register is active-low: a button going from "not pressed" (1) to "pressed" (0)
        // on any bit that's part of the currently selected group is the documented edge that
        // raises the joypad interrupt.
        let new_low_nibble = self.get_register() & 0x0F;
        let falling_edges = self.previous_low_nibble & !new_low_nibble;
        if falling_edges != 0 {
            sink.request_interrupt(InterruptFlags::JOYPAD);
        }
        self.previous_low_nibble = new_low_nibble;
    }
}

impl InputKey {
    fn get_flag_value(&self) -> JoypadFlags {
        match self {
            InputKey::START | InputKey::DOWN => JoypadFlags::DOWN_START,
            InputKey::SELECT | InputKey::UP => JoypadFlags::UP_SELECT,
            InputKey::B | InputKey::LEFT => JoypadFlags::LEFT_B,
            InputKey::A | InputKey::RIGHT => JoypadFlags::RIGHT_A,
        }
    }
}

bitflags! {
    #[derive(Default)]
    struct JoypadFlags: u8 {
        /// Right or A
        const RIGHT_A         = 0b0000_0001;
        /// Left or B
        const LEFT_B          = 0b0000_0010;
        /// Input Up or Select
        const UP_SELECT       = 0b0000_0100;
        /// Input Down or Start
        const DOWN_START      = 0b0000_1000;
        /// Select Direction Keys
        const DIRECTION_KEYS  = 0b0001_0000;
        /// Select Button Keys
        const BUTTON_KEYS     = 0b0010_0000;
        /// Unused, but necessary for bits() to return 0xFF
        const UNUSED_0        = 0b0100_0000;
        /// Unused, but necessary for bits() to return 0xFF
        const UNUSED_1        = 0b1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink(u32);
    impl InterruptSink for CountingSink {
        fn request_interrupt(&mut self, interrupt: InterruptFlags) {
            assert_eq!(interrupt, InterruptFlags::JOYPAD);
            self.0 += 1;
        }
    }

    #[test]
    fn pressing_a_selected_key_raises_joypad_interrupt() {
        let mut pad = JoyPad::new();
        let mut sink = CountingSink(0);
        // Select the button group.
        pad.set_register(0b0001_0000, &mut sink);
        assert_eq!(sink.0, 0);

        pad.press_key(InputKey::A, &mut sink);
        assert_eq!(sink.0, 1);

        // Releasing does not re-trigger (it's a falling edge only).
        pad.release_key(InputKey::A, &mut sink);
        assert_eq!(sink.0, 1);
    }

    #[test]
    fn unselected_group_does_not_raise_interrupt() {
        let mut pad = JoyPad::new();
        let mut sink = CountingSink(0);
        // Select the direction group only.
        pad.set_register(0b0010_0000, &mut sink);

        pad.press_key(InputKey::A, &mut sink);
        assert_eq!(sink.0, 0);
    }
}
