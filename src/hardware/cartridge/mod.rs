use crate::error::Error;
use crate::hardware::cartridge::header::{CartridgeHeader, MbcKind};
use crate::hardware::cartridge::mbc::{MBC0, MBC1};
use crate::hardware::cartridge::mbc3::MBC3;
use crate::hardware::cartridge::mbc5::MBC5;

pub mod header;
mod mbc;
mod mbc3;
mod mbc5;

/// Common interface implemented by every memory bank controller variant.
pub trait MBC {
    fn read_3fff(&self, address: u16) -> u8;
    fn read_7fff(&self, address: u16) -> u8;
    fn read_ex_ram(&self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);

    /// `Some` only for battery-backed cartridges, used for save-RAM persistence.
    fn get_battery_ram(&self) -> Option<&[u8]> {
        None
    }
}

/// Tagged union over the supported memory bank controllers. Kept as a closed sum type
/// rather than a `dyn MBC` hierarchy so cartridge state can be copied in/out of save states
/// without trait-object plumbing.
pub enum Mbc {
    None(MBC0),
    Mbc1(MBC1),
    Mbc3(MBC3),
    Mbc5(MBC5),
}

impl Mbc {
    fn as_mbc(&self) -> &dyn MBC {
        match self {
            Mbc::None(m) => m,
            Mbc::Mbc1(m) => m,
            Mbc::Mbc3(m) => m,
            Mbc::Mbc5(m) => m,
        }
    }

    fn as_mbc_mut(&mut self) -> &mut dyn MBC {
        match self {
            Mbc::None(m) => m,
            Mbc::Mbc1(m) => m,
            Mbc::Mbc3(m) => m,
            Mbc::Mbc5(m) => m,
        }
    }
}

pub struct Cartridge {
    header: CartridgeHeader,
    mbc: Mbc,
}

impl Cartridge {
    pub fn new(rom: Vec<u8>, saved_ram: Option<Vec<u8>>) -> Result<Self, Error> {
        if rom.len() < 0x150 {
            return Err(Error::InvalidRom {
                reason: format!("ROM is only {} bytes, header requires at least 0x150", rom.len()),
            });
        }

        let header = CartridgeHeader::new(&rom);
        let has_battery = header.has_battery();
        let ram_size = header.ram_sizes();

        let mbc = match header.mbc_kind() {
            MbcKind::None => Mbc::None(MBC0::new(rom)),
            MbcKind::Mbc1 => Mbc::Mbc1(MBC1::new(rom)),
            MbcKind::Mbc3 => Mbc::Mbc3(MBC3::new(rom, has_battery, &ram_size, saved_ram)),
            MbcKind::Mbc5 => Mbc::Mbc5(MBC5::new(rom, has_battery, &ram_size, saved_ram)),
            MbcKind::Unsupported => return Err(Error::UnsupportedMbc),
        };

        Ok(Cartridge { header, mbc })
    }

    pub fn cartridge_header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn read_0000_3fff(&self, address: u16) -> u8 {
        self.mbc.as_mbc().read_3fff(address)
    }

    pub fn read_4000_7fff(&self, address: u16) -> u8 {
        self.mbc.as_mbc().read_7fff(address)
    }

    pub fn read_external_ram(&self, address: u16) -> u8 {
        self.mbc.as_mbc().read_ex_ram(address)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        self.mbc.as_mbc_mut().write_byte(address, value);
    }

    /// `Some` only for battery-backed cartridges; used for save-RAM persistence.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.mbc.as_mbc().get_battery_ram()
    }
}
