//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.

use log::warn;

use crate::cartridge::mapper::{Mirroring, mapper::Board};

/// NROM mapper: fixed PRG and CHR, 16KB PRG mirrored into $C000, solder-pad mirroring.
pub struct Mapper0 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; 0x2000],
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; 0x2000],
            chr,
            chr_is_ram,
            mirroring,
        }
    }
}

impl Board for Mapper0 {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            // CHR ROM/RAM: $0000-$1FFF
            0x0000..=0x1FFF => self.chr[addr as usize % self.chr.len()],
            // Family Basic style PRG RAM
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            // PRG ROM: $8000-$FFFF, mirror if 16KB
            0x8000..=0xFFFF => self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF if self.chr_is_ram => {
                let len = self.chr.len();
                self.chr[addr as usize % len] = data;
            }
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0xFFFF => warn!("NROM: ignored write ${data:02X} to PRG ROM at ${addr:04X}"),
            _ => {}
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
