//! 6502 CPU emulation for the NES.
//!
//! Table-driven decoder covering all 256 opcodes, including the undocumented set; nestest-compatible
//! cycle counts. Memory and interrupt lines come from the [`Bus`](crate::bus::Bus) trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
pub mod trace;


pub use cpu::{CPU, CpuError, Registers};
pub use trace::TraceLine;
