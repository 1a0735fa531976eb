//! NES cartridge images.
//!
//! A [`CartridgeImage`] is the validated tuple the console loads: program ROM, character ROM
//! (or RAM when the image carries none), mapper identifier, and the hard-wired mirroring mode.
//! Images can be built directly or parsed from the [iNES](https://www.nesdev.org/wiki/INES)
//! format: 16-byte header (magic "NES\x1A", PRG size in 16 KiB units, CHR size in 8 KiB units,
//! flags 6–7 for mapper and mirroring), optional 512-byte trainer, then PRG ROM, then CHR ROM.

use std::fs;
use std::path::Path;

use crate::cartridge::mapper::Mirroring;

pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;

const INES_MAGIC: &[u8; 4] = b"NES\x1A";
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;

/// Reasons an image is rejected at load. Raised before the console is touched.
#[derive(Debug, thiserror::Error)]
pub enum CartridgeError {
    #[error("image is {0} bytes, shorter than the 16-byte iNES header")]
    TooShort(usize),
    #[error("missing iNES magic \"NES\\x1A\"")]
    BadMagic,
    #[error("{section} is truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("program ROM is empty")]
    EmptyProgramRom,
    #[error("program ROM size {0} is not a multiple of 16 KiB")]
    ProgramRomSize(usize),
    #[error("character memory size {0} is not a multiple of 8 KiB")]
    CharacterSize(usize),
    #[error("failed to read image {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Validated cartridge contents. CHR is ROM when the image carried any, otherwise 8 KiB of RAM.
#[derive(Debug, Clone)]
pub struct CartridgeImage {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mapper_id: u8,
    mirroring: Mirroring,
}

impl CartridgeImage {
    /// Build an image from raw parts. An empty `chr` selects 8 KiB of CHR RAM.
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        mapper_id: u8,
        mirroring: Mirroring,
    ) -> Result<Self, CartridgeError> {
        if prg_rom.is_empty() {
            return Err(CartridgeError::EmptyProgramRom);
        }
        if prg_rom.len() % PRG_BANK_SIZE != 0 {
            return Err(CartridgeError::ProgramRomSize(prg_rom.len()));
        }
        if chr.len() % CHR_BANK_SIZE != 0 {
            return Err(CartridgeError::CharacterSize(chr.len()));
        }

        let chr_is_ram = chr.is_empty();
        let chr = if chr_is_ram { vec![0; CHR_BANK_SIZE] } else { chr };

        Ok(Self {
            prg_rom,
            chr,
            chr_is_ram,
            mapper_id,
            mirroring,
        })
    }

    /// Parse an iNES image. Mapper number is the low nibble of byte 6 ORed with the high nibble of
    /// byte 7; byte 6 bit 0 selects vertical mirroring, bit 2 announces a trainer (skipped).
    pub fn from_ines(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort(data.len()));
        }
        if &data[0..4] != INES_MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let prg_size = data[4] as usize * PRG_BANK_SIZE;
        let chr_size = data[5] as usize * CHR_BANK_SIZE;
        let flags6 = data[6];
        let flags7 = data[7];

        let mut offset = HEADER_SIZE;
        if flags6 & 0x04 != 0 {
            offset += TRAINER_SIZE;
        }

        let prg_rom = section(data, offset, prg_size, "program ROM")?.to_vec();
        offset += prg_size;
        let chr = section(data, offset, chr_size, "character ROM")?.to_vec();

        let mapper_id = (flags6 >> 4) | (flags7 & 0xF0);
        let mirroring = if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Self::new(prg_rom, chr, mapper_id, mirroring)
    }

    /// Read and parse an iNES file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ines(&data)
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr(&self) -> &[u8] {
        &self.chr
    }

    pub fn chr_is_ram(&self) -> bool {
        self.chr_is_ram
    }

    pub fn mapper_id(&self) -> u8 {
        self.mapper_id
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// Split into owned parts for the mapper: (prg, chr, chr_is_ram).
    pub(crate) fn into_parts(self) -> (Vec<u8>, Vec<u8>, bool) {
        (self.prg_rom, self.chr, self.chr_is_ram)
    }
}

fn section<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    let available = data.len().saturating_sub(offset);
    if available < len {
        return Err(CartridgeError::Truncated {
            section: name,
            expected: len,
            actual: available,
        });
    }
    Ok(&data[offset..offset + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ines(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut data = vec![b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6, flags7];
        data.resize(HEADER_SIZE, 0);
        data.extend(vec![0xEA; prg_banks as usize * PRG_BANK_SIZE]);
        data.extend(vec![0x55; chr_banks as usize * CHR_BANK_SIZE]);
        data
    }

    #[test]
    fn parses_header_fields() {
        let image = CartridgeImage::from_ines(&ines(2, 1, 0x11, 0x00)).unwrap();
        assert_eq!(image.mapper_id(), 1);
        assert_eq!(image.mirroring(), Mirroring::Vertical);
        assert_eq!(image.prg_rom().len(), 2 * PRG_BANK_SIZE);
        assert_eq!(image.chr().len(), CHR_BANK_SIZE);
        assert!(!image.chr_is_ram());
    }

    #[test]
    fn mapper_id_combines_both_nibbles() {
        let image = CartridgeImage::from_ines(&ines(1, 1, 0x20, 0x40)).unwrap();
        assert_eq!(image.mapper_id(), 0x42);
        assert_eq!(image.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn missing_chr_becomes_ram() {
        let image = CartridgeImage::from_ines(&ines(1, 0, 0x00, 0x00)).unwrap();
        assert!(image.chr_is_ram());
        assert_eq!(image.chr().len(), CHR_BANK_SIZE);
    }

    #[test]
    fn trainer_is_skipped() {
        let mut data = ines(1, 0, 0x04, 0x00);
        let trainer = vec![0xFF; TRAINER_SIZE];
        data.splice(HEADER_SIZE..HEADER_SIZE, trainer);
        let image = CartridgeImage::from_ines(&data).unwrap();
        assert!(image.prg_rom().iter().all(|&b| b == 0xEA));
    }

    #[test]
    fn rejects_bad_images() {
        assert!(matches!(
            CartridgeImage::from_ines(&[0; 4]),
            Err(CartridgeError::TooShort(4))
        ));
        assert!(matches!(
            CartridgeImage::from_ines(&[0; 16]),
            Err(CartridgeError::BadMagic)
        ));

        let mut data = ines(2, 0, 0, 0);
        data.truncate(HEADER_SIZE + PRG_BANK_SIZE);
        assert!(matches!(
            CartridgeImage::from_ines(&data),
            Err(CartridgeError::Truncated {
                section: "program ROM",
                expected,
                actual,
            }) if expected == 2 * PRG_BANK_SIZE && actual == PRG_BANK_SIZE
        ));

        assert!(matches!(
            CartridgeImage::from_ines(&ines(0, 1, 0, 0)),
            Err(CartridgeError::EmptyProgramRom)
        ));
    }

    #[test]
    fn new_validates_sizes() {
        assert!(matches!(
            CartridgeImage::new(vec![0; 100], vec![], 0, Mirroring::Horizontal),
            Err(CartridgeError::ProgramRomSize(100))
        ));
        assert!(matches!(
            CartridgeImage::new(vec![0; PRG_BANK_SIZE], vec![0; 10], 0, Mirroring::Horizontal),
            Err(CartridgeError::CharacterSize(10))
        ));
    }

    #[test]
    fn unreadable_file_keeps_io_source() {
        use std::error::Error as _;

        let err = CartridgeImage::load("/nonexistent/game.nes").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/game.nes"));
        let source = err.source().and_then(|s| s.downcast_ref::<std::io::Error>());
        assert_eq!(source.map(|e| e.kind()), Some(std::io::ErrorKind::NotFound));
    }
}
