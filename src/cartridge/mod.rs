//! NES cartridge images and mapper support.
//!
//! - **cartridge**: validated [`CartridgeImage`] (PRG, CHR, mapper id, mirroring) and
//!   [iNES](https://www.nesdev.org/wiki/INES) parsing.
//! - **mapper**: NROM (0), MMC1 (1), UxROM (2); PRG/CHR bank switching and nametable mirroring.

pub mod cartridge;
pub mod mapper;

pub use cartridge::{CartridgeError, CartridgeImage};
pub use mapper::{Mapper, MapperStatus, Mirroring};
