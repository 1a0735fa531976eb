//! 2C02 picture unit.
//!
//! Dot-accurate timing (341 dots, 262 scanlines, odd-frame skip) with a scanline renderer. See
//! [PPU registers](https://www.nesdev.org/wiki/PPU_registers) and
//! [PPU rendering](https://www.nesdev.org/wiki/PPU_rendering).

pub mod ppu;

pub use ppu::{NES_PALETTE_RGB, PPU, SCREEN_HEIGHT, SCREEN_WIDTH};
