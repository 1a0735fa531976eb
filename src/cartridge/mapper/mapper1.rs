//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register.
//! Otherwise, bit 0 is shifted in (LSB first); after 5 writes, the value is latched to the selected
//! register. Control (bits 0–1) = mirroring; bits 2–3 = PRG mode; bit 4 = CHR mode.

use log::debug;

use crate::cartridge::mapper::{Mirroring, mapper::Board};

/// MMC1 state: 5-bit shift register, control byte (mirroring + PRG/CHR mode), bank selects.
pub struct Mapper1 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; 0x2000],
    chr: Vec<u8>,
    chr_is_ram: bool,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    /// Control defaults to $0C (PRG mode 3: $8000 switchable, $C000 fixed last).
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; 0x2000],
            chr,
            chr_is_ram,
            shift_reg: 0,
            shift_count: 0,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB mode; 2 = $8000 fixed first, $C000
    /// switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg_rom.len() / 0x4000).max(1)
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let count = self.prg_bank_count();
        let select = (self.prg_bank & 0x0F) as usize;
        let (bank, offset) = match self.prg_bank_mode() {
            0 | 1 => {
                let first = select & !1;
                let bank = if addr < 0xC000 { first } else { first | 1 };
                (bank, (addr & 0x3FFF) as usize)
            }
            2 if addr < 0xC000 => (0, (addr - 0x8000) as usize),
            2 => (select, (addr - 0xC000) as usize),
            _ if addr < 0xC000 => (select, (addr - 0x8000) as usize),
            _ => (count - 1, (addr - 0xC000) as usize),
        };
        (bank % count) * 0x4000 + offset
    }

    /// CHR mode from control bit 4: 0 = one 8 KiB bank, 1 = two 4 KiB banks.
    fn chr_offset(&self, addr: u16) -> usize {
        let bank = if self.control & 0x10 == 0 {
            (self.chr_bank0 & 0x1E) as usize | (addr as usize >> 12)
        } else if addr < 0x1000 {
            self.chr_bank0 as usize
        } else {
            self.chr_bank1 as usize
        };
        (bank * 0x1000 + (addr & 0x0FFF) as usize) % self.chr.len()
    }

    fn prg_ram_enabled(&self) -> bool {
        self.prg_bank & 0x10 == 0
    }

    fn commit(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        debug!("MMC1: ${addr:04X} <- ${value:02X}");
    }
}

impl Board for Mapper1 {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.chr[self.chr_offset(addr)],
            0x6000..=0x7FFF if self.prg_ram_enabled() => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => self.prg_rom[self.prg_offset(addr)],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF if self.chr_is_ram => {
                let offset = self.chr_offset(addr);
                self.chr[offset] = data;
            }
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                self.prg_ram[(addr - 0x6000) as usize] = data;
            }
            0x8000..=0xFFFF => {
                // Reset: clear the shift register and force PRG mode 3.
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }

                self.shift_reg >>= 1;
                self.shift_reg |= (data & 1) << 4;
                self.shift_count += 1;

                if self.shift_count == 5 {
                    let value = self.shift_reg & 0x1F;
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.commit(addr, value);
                }
            }
            _ => {}
        }
    }

    /// Mirroring from control bits 0–1: 0 = one-screen lower, 1 = one-screen upper, 2 = vertical, 3 = horizontal.
    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}
