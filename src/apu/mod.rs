//! NES APU (Audio Processing Unit).
//!
//! [`APU`] owns the five channels, the frame sequencer and the mixer; each channel lives in
//! its own module and follows the same write/step/output shape.

pub mod apu;
pub mod dmc;
pub mod envelope;
pub mod noise;
pub mod pulse;
pub mod triangle;

pub use apu::APU;

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
pub(crate) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];
