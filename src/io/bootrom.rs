/// DMG boot ROM: 256 bytes, overlays 0x0000-0x00FF.
pub const DMG_BOOTROM_SIZE: usize = 0x100;
/// CGB boot ROM: 2304 bytes, overlays 0x0000-0x00FF and 0x0200-0x08FF
/// (0x0100-0x01FF is the cartridge header the boot ROM jumps over).
pub const CGB_BOOTROM_SIZE: usize = 0x900;

#[derive(Debug, Clone)]
enum BootRomData {
    Dmg(Box<[u8; DMG_BOOTROM_SIZE]>),
    Cgb(Box<[u8; CGB_BOOTROM_SIZE]>),
}

/// The optional boot ROM overlay. While present and not yet disabled (`is_finished`), reads
/// in its covered ranges are served from here instead of cartridge ROM.
#[derive(Debug, Clone)]
pub struct BootRom {
    pub is_finished: bool,
    data: Option<BootRomData>,
}

impl BootRom {
    pub fn none() -> Self {
        BootRom {
            is_finished: true,
            data: None,
        }
    }

    pub fn dmg(data: [u8; DMG_BOOTROM_SIZE]) -> Self {
        BootRom {
            is_finished: false,
            data: Some(BootRomData::Dmg(Box::new(data))),
        }
    }

    pub fn cgb(data: [u8; CGB_BOOTROM_SIZE]) -> Self {
        BootRom {
            is_finished: false,
            data: Some(BootRomData::Cgb(Box::new(data))),
        }
    }

    /// Whether the given address currently falls within the overlaid boot ROM region.
    pub fn covers(&self, address: u16) -> bool {
        if self.is_finished {
            return false;
        }
        match &self.data {
            None => false,
            Some(BootRomData::Dmg(_)) => address <= 0x00FF,
            Some(BootRomData::Cgb(_)) => address <= 0x00FF || (0x0200..=0x08FF).contains(&address),
        }
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        match &self.data {
            Some(BootRomData::Dmg(rom)) => rom[address as usize],
            Some(BootRomData::Cgb(rom)) => rom[address as usize],
            None => 0xFF,
        }
    }

    /// Writing any value to the BOOT register (0xFF50) permanently disables the overlay.
    pub fn disable(&mut self) {
        self.is_finished = true;
    }
}
