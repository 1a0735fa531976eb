//! famiclock: a cycle-locked NES emulator core.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): Ricoh 2A03 (CPU+APU),
//! 2C02 PPU, cartridge mappers, and controller I/O, driven in a fixed 1:3:1 CPU/PPU/APU ratio by
//! [`Console`].
//!
//! ## Modules (NESdev references)
//!
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU): pulse×2, triangle, noise, DMC, frame
//!   counter, [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer)
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU, APU,
//!   controllers, cartridge, DMA stalls
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0), MMC1 (1), UxROM (2)
//! - **console** – lockstep orchestration, run modes, breakpoints, FPS
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 strobe, shift-out
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: full + undocumented opcodes, [NMI](https://www.nesdev.org/wiki/NMI)
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers), OAM, nametables, 256×240
//! - **config**, **error**, **pacer** – settings, error taxonomy, host loop cadence

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod console;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod pacer;
pub mod ppu;

pub use cartridge::{CartridgeImage, MapperStatus, Mirroring};
pub use config::ConsoleConfig;
pub use console::{AudioSink, Console, ConsoleState, RunMode, StopHandle, Tick};
pub use error::{Error, Result};
