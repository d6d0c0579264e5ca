use bitflags::*;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum Interrupts {
    VBLANK = 0b0000_0001,
    LcdStat = 0b0000_0010,
    TIMER = 0b0000_0100,
    SERIAL = 0b0000_1000,
    JOYPAD = 0b0001_0000,
}

impl Interrupts {
    pub fn iter() -> impl Iterator<Item = Interrupts> {
        use crate::io::interrupts::Interrupts::{LcdStat, JOYPAD, SERIAL, TIMER, VBLANK};
        [VBLANK, LcdStat, TIMER, SERIAL, JOYPAD].iter().copied()
    }

    pub fn handler_address(self) -> u16 {
        match self {
            Interrupts::VBLANK => 0x0040,
            Interrupts::LcdStat => 0x0048,
            Interrupts::TIMER => 0x0050,
            Interrupts::SERIAL => 0x0058,
            Interrupts::JOYPAD => 0x0060,
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        /// V-Blank
        const VBLANK = 0b0000_0001;
        /// LCD Stat
        const LCD    = 0b0000_0010;
        /// Timer
        const TIMER  = 0b0000_0100;
        /// Serial
        const SERIAL = 0b0000_1000;
        /// Joypad
        const JOYPAD = 0b0001_0000;
        /// The top three bits of IF always read back as 1.
        const UNUSED = 0b1110_0000;
    }
}

impl InterruptFlags {
    pub fn contains_interrupt(&self, interrupt: Interrupts) -> bool {
        self.contains(InterruptFlags::from_bits_truncate(interrupt as u8))
    }

    pub fn iter() -> impl Iterator<Item = InterruptFlags> {
        [
            InterruptFlags::VBLANK,
            InterruptFlags::LCD,
            InterruptFlags::TIMER,
            InterruptFlags::SERIAL,
            InterruptFlags::JOYPAD,
        ]
        .iter()
        .copied()
    }
}

/// Narrow capability handed to peripherals (Timer, PPU, APU, Joypad) instead of a
/// back-reference to the full bus, so a peripheral can request an interrupt but can't
/// reach into ROM/WRAM/VRAM while doing so.
pub trait InterruptSink {
    fn request_interrupt(&mut self, interrupt: InterruptFlags);
}

/// The CPU's IME automaton. `EI` moves `Disabled -> WillEnable1`; each bus tick advances the
/// state by one step, so `EI` followed immediately by `RETI` exhibits the documented
/// one-instruction delay before interrupts actually fire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImeState {
    Disabled,
    WillEnable1,
    WillEnable2,
    Enabled,
}

impl Default for ImeState {
    fn default() -> Self {
        ImeState::Disabled
    }
}

impl ImeState {
    pub fn request_enable(&mut self) {
        *self = ImeState::WillEnable1;
    }

    pub fn disable(&mut self) {
        *self = ImeState::Disabled;
    }

    pub fn is_enabled(self) -> bool {
        self == ImeState::Enabled
    }

    /// Advance the automaton by one M-cycle of bus ticking.
    pub fn tick(&mut self) {
        *self = match self {
            ImeState::WillEnable1 => ImeState::WillEnable2,
            ImeState::WillEnable2 => ImeState::Enabled,
            other => *other,
        };
    }
}

#[derive(Default, Debug, Clone)]
pub struct InterruptModule {
    pub interrupt_enable: InterruptFlags,
    pub interrupt_flag: InterruptFlags,
}

impl InterruptModule {
    pub fn insert_interrupt(&mut self, interrupt: InterruptFlags) {
        self.interrupt_flag.insert(interrupt);
    }

    /// Replace IE outright, as happens on a raw write to 0xFFFF.
    pub fn overwrite_ie(&mut self, value: u8) {
        self.interrupt_enable = InterruptFlags::from_bits_truncate(value);
    }

    /// Replace IF outright, as happens on a raw write to 0xFF0F. The top three bits
    /// always read back as 1 regardless of what's written.
    pub fn overwrite_if(&mut self, value: u8) {
        self.interrupt_flag = InterruptFlags::from_bits_truncate(0xE0 | value);
    }

    /// `IE & IF & 0x1F`, the set of interrupts both enabled and pending.
    pub fn pending(&self) -> InterruptFlags {
        self.interrupt_enable & self.interrupt_flag & InterruptFlags::all()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending().is_empty()
    }

    /// The lowest-priority-bit pending+enabled interrupt, if any. Does not clear anything.
    pub fn next_pending(&self) -> Option<Interrupts> {
        Interrupts::iter().find(|i| self.pending().contains_interrupt(*i))
    }
}

impl InterruptSink for InterruptModule {
    fn request_interrupt(&mut self, interrupt: InterruptFlags) {
        self.insert_interrupt(interrupt);
    }
}

#[cfg(test)]
mod test {
    use super::Interrupts;
    use super::Interrupts::*;

    #[test]
    fn test_interrupt_order() {
        let ordered_array = [VBLANK, LcdStat, TIMER, SERIAL, JOYPAD];
        for (i, interrupt) in Interrupts::iter().enumerate() {
            assert_eq!(ordered_array[i], interrupt)
        }
    }

    #[test]
    fn test_handler_addresses() {
        assert_eq!(VBLANK.handler_address(), 0x0040);
        assert_eq!(JOYPAD.handler_address(), 0x0060);
    }
}
