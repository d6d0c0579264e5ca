use crate::hardware::cartridge::header::RamSizes;
use crate::hardware::cartridge::mbc::{EXTERNAL_RAM_SIZE, ROM_BANK_SIZE};
use crate::hardware::cartridge::MBC;
use crate::hardware::mmu::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, INVALID_READ};

pub struct MBC3 {
    has_battery: bool,
    ram_enabled: bool,
    rom_bank: u16,
    /// 0x00-0x03 selects a RAM bank, 0x08-0x0C selects one of the RTC registers instead.
    ram_bank: u8,
    effective_banks: u16,
    rom: Vec<u8>,
    ram: Vec<u8>,
    rtc: RealTimeClockRegs,
}

impl MBC3 {
    pub fn new(rom: Vec<u8>, has_battery: bool, ram_size: &RamSizes, saved_ram: Option<Vec<u8>>) -> Self {
        log::info!(
            "MBC3 ROM Size: {} - Effective banks: {}",
            rom.len(),
            (rom.len() / ROM_BANK_SIZE)
        );
        let mut result = MBC3 {
            ram_enabled: false,
            has_battery,
            rom_bank: 1,
            ram_bank: 0,
            effective_banks: (rom.len() / ROM_BANK_SIZE) as u16,
            rom,
            ram: vec![INVALID_READ; ram_size.to_usize()],
            rtc: RealTimeClockRegs::default(),
        };

        if let Some(ram) = saved_ram {
            result.ram = ram;
        }

        result
    }

    #[inline]
    fn set_lower_rom_bank(&mut self, value: u8) {
        // Select the first 7 bits and use that as the bank number.
        self.rom_bank = (value & 0x7F) as u16;

        if self.rom_bank == 0 {
            self.rom_bank = 1;
        }

        self.rom_bank %= self.effective_banks;
    }
}

impl MBC for MBC3 {
    fn read_3fff(&self, address: u16) -> u8 {
        self.rom[address as usize]
    }

    fn read_7fff(&self, address: u16) -> u8 {
        // first 14 bits of the address, and then the rom bank shifted onto it.
        let result_address = (address & 0x3FFF) as usize | (self.rom_bank as usize) << 14;
        self.rom[result_address]
    }

    fn read_ex_ram(&self, address: u16) -> u8 {
        if !self.ram_enabled {
            return INVALID_READ;
        }
        if self.ram_bank >= 0x08 {
            self.rtc.read_register(self.ram_bank)
        } else {
            let true_address = (address - EXTERNAL_RAM_START) as usize + EXTERNAL_RAM_SIZE * self.ram_bank as usize;
            self.ram[true_address]
        }
    }

    fn get_battery_ram(&self) -> Option<&[u8]> {
        if self.has_battery {
            Some(&self.ram)
        } else {
            None
        }
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_enabled = (value & 0xF) == 0xA,
            0x2000..=0x3FFF => self.set_lower_rom_bank(value),
            0x4000..=0x5FFF => self.ram_bank = value,
            0x6000..=0x7FFF => self.rtc.latch(value),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if !self.ram_enabled {
                    return;
                }
                if self.ram_bank >= 0x08 {
                    self.rtc.write_register(self.ram_bank, value);
                } else {
                    let true_address = (address - EXTERNAL_RAM_START) as usize;
                    let offset = EXTERNAL_RAM_SIZE * self.ram_bank as usize;
                    self.ram[offset + true_address] = value;
                }
            }
            _ => return,
        }
    }
}

/// The RTC's S/M/H/DL/DH latch-and-read protocol. Per the top-level non-goal on wall-clock
/// precision, this is a monotonic counter advanced once per `latch()` call rather than a
/// wall-clock-accurate calendar.
#[derive(Debug, Default, Clone)]
pub struct RealTimeClockRegs {
    seconds: u8,
    minutes: u8,
    hours: u8,
    day_low: u8,
    day_high: u8,
    latched_seconds: u8,
    latched_minutes: u8,
    latched_hours: u8,
    latched_day_low: u8,
    latched_day_high: u8,
    last_latch_write: u8,
}

impl RealTimeClockRegs {
    /// Writing 0x00 then 0x01 to 0x6000-0x7FFF latches the live counters into the
    /// readable shadow registers, advancing the counter by one step in the process.
    pub fn latch(&mut self, value: u8) {
        if self.last_latch_write == 0x00 && value == 0x01 {
            self.advance();
            self.latched_seconds = self.seconds;
            self.latched_minutes = self.minutes;
            self.latched_hours = self.hours;
            self.latched_day_low = self.day_low;
            self.latched_day_high = self.day_high;
        }
        self.last_latch_write = value;
    }

    fn advance(&mut self) {
        self.seconds = self.seconds.wrapping_add(1);
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes = self.minutes.wrapping_add(1);
        if self.minutes < 60 {
            return;
        }
        self.minutes = 0;
        self.hours = self.hours.wrapping_add(1);
        if self.hours < 24 {
            return;
        }
        self.hours = 0;
        let (day, overflowed) = self.day_low.overflowing_add(1);
        self.day_low = day;
        if overflowed {
            // Bit 0 of DH is the 9th day-counter bit, bit 7 is the day-carry flag.
            self.day_high ^= 0x01;
            self.day_high |= 0x80;
        }
    }

    pub fn read_register(&self, register: u8) -> u8 {
        match register {
            0x08 => self.latched_seconds,
            0x09 => self.latched_minutes,
            0x0A => self.latched_hours,
            0x0B => self.latched_day_low,
            0x0C => self.latched_day_high,
            _ => INVALID_READ,
        }
    }

    pub fn write_register(&mut self, register: u8, value: u8) {
        match register {
            0x08 => self.seconds = value,
            0x09 => self.minutes = value,
            0x0A => self.hours = value,
            0x0B => self.day_low = value,
            0x0C => self.day_high = value,
            _ => {}
        }
    }
}
