//! Board trait: PRG/CHR memory access and mirroring, implemented by each mapper variant.

use crate::cartridge::mapper::Mirroring;

/// Address decoding for one cartridge board. CPU addresses ($4020–$FFFF) and PPU pattern-table
/// addresses ($0000–$1FFF) share one address space since the two never overlap.
pub trait Board {
    /// Read from PRG ($6000–$FFFF) or CHR ($0000–$1FFF). Unmapped addresses read 0.
    fn read(&self, addr: u16) -> u8;
    /// Write to CHR RAM, PRG RAM or mapper registers. PRG ROM is read-only.
    fn write(&mut self, addr: u16, data: u8);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;
}
