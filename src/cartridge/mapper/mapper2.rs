//! Mapper 2 (UxROM): switchable 16 KiB bank at $8000, last bank fixed at $C000, 8 KiB CHR RAM.
//!
//! [UxROM](https://www.nesdev.org/wiki/UxROM): any write to $8000–$FFFF selects the bank.

use log::debug;

use crate::cartridge::mapper::{Mirroring, mapper::Board};

pub struct Mapper2 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    bank_select: u8,
}

impl Mapper2 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            mirroring,
            bank_select: 0,
        }
    }

    fn bank_count(&self) -> usize {
        (self.prg_rom.len() / 0x4000).max(1)
    }
}

impl Board for Mapper2 {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.chr[addr as usize % self.chr.len()],
            0x8000..=0xBFFF => {
                let bank = self.bank_select as usize % self.bank_count();
                self.prg_rom[bank * 0x4000 + (addr - 0x8000) as usize]
            }
            0xC000..=0xFFFF => {
                let bank = self.bank_count() - 1;
                self.prg_rom[bank * 0x4000 + (addr - 0xC000) as usize]
            }
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF if self.chr_is_ram => {
                let len = self.chr.len();
                self.chr[addr as usize % len] = data;
            }
            0x8000..=0xFFFF => {
                self.bank_select = data;
                debug!("UxROM: bank {data} at $8000");
            }
            _ => {}
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
