//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, APU, controllers and the cartridge
//! ([CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map)). The bus also owns the
//! stall counter that OAM DMA and DMC sample fetches charge to the CPU.

use crate::{
    apu::APU,
    cartridge::Mapper,
    controller::Controller,
    ppu::PPU,
};

/// Value seen on reads of unmapped or write-only locations.
pub const OPEN_BUS: u8 = 0x40;

/// CPU cycles the DMC memory reader steals per sample byte.
const DMC_FETCH_STALL: u32 = 4;

/// Memory and interrupt lines as seen by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Side-effect-free read for tracing and disassembly.
    fn peek(&mut self, addr: u16) -> u8 {
        self.read(addr)
    }

    /// Consume a pending NMI edge.
    fn poll_nmi(&mut self) -> bool {
        false
    }

    /// Level of the shared IRQ line.
    fn poll_irq(&mut self) -> bool {
        false
    }

    /// Cycles the CPU must idle for DMA since the last call.
    fn take_stall_cycles(&mut self) -> u32 {
        0
    }
}

/// Main NES bus: RAM, PPU, APU, controllers, and the cartridge slot.
pub struct NesBus {
    pub ram: [u8; 2048],
    pub mapper: Option<Mapper>,
    pub ppu: PPU,
    pub apu: APU,
    pub controllers: [Controller; 2],
    stall_cycles: u32,
}

impl Default for NesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NesBus {
    /// Create a bus with an empty cartridge slot.
    pub fn new() -> Self {
        Self {
            ram: [0; 2048],
            mapper: None,
            ppu: PPU::new(),
            apu: APU::new(),
            controllers: [Controller::new(), Controller::new()],
            stall_cycles: 0,
        }
    }

    /// Create a fresh bus around a cartridge.
    pub fn with_mapper(mapper: Mapper) -> Self {
        Self {
            mapper: Some(mapper),
            ..Self::new()
        }
    }

    /// Advance the PPU one dot; a finished visible scanline is rendered from cartridge CHR.
    pub fn step_ppu(&mut self) {
        if let Some(scanline) = self.ppu.step() {
            if let Some(mapper) = self.mapper.as_ref() {
                self.ppu.render_scanline(mapper, scanline);
            }
        }
    }

    /// Advance the APU one CPU cycle and service its DMC memory reader. Returns the mixed sample.
    pub fn step_apu(&mut self) -> f32 {
        let sample = self.apu.step();
        if let Some(addr) = self.apu.dmc_fetch_request() {
            let byte = self.read(addr);
            self.apu.dmc_feed_byte(byte);
            self.stall_cycles += DMC_FETCH_STALL;
        }
        sample
    }

    /// Copy page `$XX00–$XXFF` into OAM ($4014). Costs 513 cycles, plus one on an odd cycle.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..=0xFF {
            let byte = self.read(base | i);
            self.ppu.write_oam_data(byte);
        }
        self.stall_cycles += 513 + (self.apu.cycle() % 2) as u32;
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.read_register(addr, self.mapper.as_ref()),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            // APU write-only registers, test mode, expansion
            0x4000..=0x5FFF => OPEN_BUS,
            0x6000..=0xFFFF => match self.mapper.as_ref() {
                Some(mapper) => mapper.read(addr),
                None => OPEN_BUS,
            },
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            0x2000..=0x3FFF => self.ppu.write_register(addr, data, self.mapper.as_mut()),
            0x4014 => self.oam_dma(data),
            // One strobe line feeds both ports.
            0x4016 => {
                self.controllers[0].write(data);
                self.controllers[1].write(data);
            }
            0x4000..=0x4017 => self.apu.write(addr, data),
            0x4018..=0x5FFF => {}
            0x6000..=0xFFFF => {
                if let Some(mapper) = self.mapper.as_mut() {
                    mapper.write(addr, data);
                }
            }
        }
    }

    /// Peek avoids register side effects; I/O space reads as open bus.
    fn peek(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x6000..=0xFFFF => self.mapper.as_ref().map_or(OPEN_BUS, |m| m.read(addr)),
            _ => OPEN_BUS,
        }
    }

    fn poll_nmi(&mut self) -> bool {
        std::mem::take(&mut self.ppu.nmi)
    }

    fn poll_irq(&mut self) -> bool {
        self.apu.irq_pending()
    }

    fn take_stall_cycles(&mut self) -> u32 {
        std::mem::take(&mut self.stall_cycles)
    }
}
