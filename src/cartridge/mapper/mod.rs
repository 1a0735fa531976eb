//! NES mappers for PRG/CHR memory mapping.
//!
//! [`Mapper`] is a closed set of boards matched on every access: NROM (0), MMC1 (1), UxROM (2),
//! plus an unconfigured variant for identifiers the console does not implement.

use log::warn;

use crate::cartridge::CartridgeImage;

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;

pub use mapper::Board;
pub use mapper0::Mapper0;
pub use mapper1::Mapper1;
pub use mapper2::Mapper2;

/// Nametable mirroring mode for PPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
}

/// What the console knows about its cartridge slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapperStatus {
    NoCartridge,
    Active(u8),
    Unsupported(u8),
}

/// Cartridge board selected by the image's mapper identifier.
pub enum Mapper {
    Nrom(Mapper0),
    Mmc1(Mapper1),
    Uxrom(Mapper2),
    /// Unrecognized identifier: reads are unmapped, writes are ignored.
    Unsupported { id: u8, mirroring: Mirroring },
}

impl Mapper {
    /// Build the board for `image`. Unknown identifiers are not an error.
    pub fn new(image: CartridgeImage) -> Self {
        let id = image.mapper_id();
        let mirroring = image.mirroring();
        let (prg_rom, chr, chr_is_ram) = image.into_parts();
        match id {
            0 => Mapper::Nrom(Mapper0::new(prg_rom, chr, chr_is_ram, mirroring)),
            1 => Mapper::Mmc1(Mapper1::new(prg_rom, chr, chr_is_ram)),
            2 => Mapper::Uxrom(Mapper2::new(prg_rom, chr, chr_is_ram, mirroring)),
            _ => {
                warn!("unsupported mapper {id}; cartridge space is unmapped");
                Mapper::Unsupported { id, mirroring }
            }
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
            Mapper::Mmc1(_) => 1,
            Mapper::Uxrom(_) => 2,
            Mapper::Unsupported { id, .. } => *id,
        }
    }

    pub fn status(&self) -> MapperStatus {
        match self {
            Mapper::Unsupported { id, .. } => MapperStatus::Unsupported(*id),
            _ => MapperStatus::Active(self.id()),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.read(addr),
            Mapper::Mmc1(m) => m.read(addr),
            Mapper::Uxrom(m) => m.read(addr),
            Mapper::Unsupported { .. } => 0,
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match self {
            Mapper::Nrom(m) => m.write(addr, data),
            Mapper::Mmc1(m) => m.write(addr, data),
            Mapper::Uxrom(m) => m.write(addr, data),
            Mapper::Unsupported { .. } => {}
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        match self {
            Mapper::Nrom(m) => m.mirroring(),
            Mapper::Mmc1(m) => m.mirroring(),
            Mapper::Uxrom(m) => m.mirroring(),
            Mapper::Unsupported { mirroring, .. } => *mirroring,
        }
    }
}
