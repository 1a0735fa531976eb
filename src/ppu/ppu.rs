//! NES PPU (Picture Processing Unit) implementation.
//!
//! Handles dot/scanline timing, vblank and NMI, nametable mirroring, VRAM access, background and
//! sprite rendering, OAM, and the 256×240 framebuffer. Registers: $2000–$2007 (mirrored).
//!
//! Rendering is scanline-granular: [`PPU::step`] reports each visible scanline as it finishes and
//! the bus hands it to [`PPU::render_scanline`] together with the cartridge's CHR memory.

use crate::cartridge::{Mapper, Mirroring};

/// NES 2C02-style 64-color palette (0xRRGGBB). Index 0 = backdrop.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;

/// Dots per scanline and the scanline on which vblank begins.
pub const DOTS_PER_SCANLINE: u16 = 341;
pub const VBLANK_SCANLINE: i16 = 241;
/// Last scanline before wrapping to the pre-render line (-1).
const LAST_SCANLINE: i16 = 260;

const MASK_GRAYSCALE: u8 = 0x01;
const MASK_LEFT_BACKGROUND: u8 = 0x02;
const MASK_LEFT_SPRITES: u8 = 0x04;
const MASK_BACKGROUND: u8 = 0x08;
const MASK_SPRITES: u8 = 0x10;

/// PPU state: timing, VRAM, nametables, palettes, OAM, and framebuffer.
pub struct PPU {
    pub cycle: u16,
    pub scanline: i16,
    /// Completed frames; bumped once per frame when vblank begins.
    pub frame: u64,
    /// Dots stepped since power-on.
    pub dots: u64,
    odd_frame: bool,
    pub nmi: bool,
    pub vblank: bool,
    pub ctrl: u8,
    pub mask: u8,
    pub addr: u16,
    pub addr_latch: bool,
    pub scroll_x: u8,
    pub scroll_y: u8,
    /// PPUDATA read buffer: non-palette reads return the previous fetch.
    read_buffer: u8,
    /// Last value written to any register; write-only registers read back as this.
    io_latch: u8,
    pub nametable: [u8; 0x800],
    /// Palette RAM $3F00-$3F1F (32 bytes, with NES mirroring).
    pub palette: [u8; 32],
    /// OAM: 64 sprites × 4 bytes (Y, tile, attr, X). Written via $2003/$2004 or $4014 DMA.
    pub oam: [u8; OAM_LEN],
    pub oam_addr: u8,
    /// Sprite 0 hit (PPUSTATUS bit 6); cleared at pre-render.
    pub sprite_0_hit: bool,
    /// Sprite overflow (PPUSTATUS bit 5); cleared at pre-render.
    pub sprite_overflow: bool,
    /// 256×240 framebuffer (0xRRGGBB per pixel). Row-major, left-to-right, top-to-bottom.
    pub framebuffer: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

impl PPU {
    /// Create PPU in initial state (pre-render scanline -1, cycle 0).
    pub fn new() -> Self {
        Self {
            cycle: 0,
            scanline: -1,
            frame: 0,
            dots: 0,
            odd_frame: false,
            nmi: false,
            vblank: false,
            ctrl: 0,
            mask: 0,
            addr: 0,
            addr_latch: false,
            scroll_x: 0,
            scroll_y: 0,
            read_buffer: 0,
            io_latch: 0,
            nametable: [0; 0x800],
            palette: [0; 32],
            oam: [0; OAM_LEN],
            oam_addr: 0,
            sprite_0_hit: false,
            sprite_overflow: false,
            framebuffer: Box::new([0; SCREEN_WIDTH * SCREEN_HEIGHT]),
        }
    }

    /// Return timing and registers to the power-on position. VRAM, OAM and the frame count survive.
    pub fn reset(&mut self) {
        self.cycle = 0;
        self.scanline = -1;
        self.odd_frame = false;
        self.nmi = false;
        self.vblank = false;
        self.ctrl = 0;
        self.mask = 0;
        self.addr_latch = false;
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.read_buffer = 0;
        self.sprite_0_hit = false;
        self.sprite_overflow = false;
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask & (MASK_BACKGROUND | MASK_SPRITES) != 0
    }

    /// Advance PPU by one dot (341 per scanline, 262 scanlines). Updates vblank/NMI and the frame
    /// counter. Returns `Some(scanline)` when a visible scanline (0..240) has just finished.
    pub fn step(&mut self) -> Option<u16> {
        self.dots += 1;
        self.cycle += 1;

        // Odd frames drop the last dot of the pre-render line while rendering.
        if self.scanline == -1
            && self.cycle == DOTS_PER_SCANLINE - 1
            && self.odd_frame
            && self.rendering_enabled()
        {
            self.cycle = DOTS_PER_SCANLINE;
        }

        if self.scanline == VBLANK_SCANLINE && self.cycle == 1 {
            self.vblank = true;
            self.frame += 1;
            self.odd_frame = !self.odd_frame;
            if self.ctrl & 0x80 != 0 {
                self.nmi = true;
            }
        }

        if self.scanline == -1 && self.cycle == 1 {
            self.vblank = false;
            self.sprite_0_hit = false;
            self.sprite_overflow = false;
        }

        let mut completed_scanline = None;
        if self.cycle >= DOTS_PER_SCANLINE {
            if (0..SCREEN_HEIGHT as i16).contains(&self.scanline) {
                completed_scanline = Some(self.scanline as u16);
            }
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > LAST_SCANLINE {
                self.scanline = -1;
            }
        }
        completed_scanline
    }

    /// CPU read of $2000–$2007 (register index 0..8).
    pub fn read_register(&mut self, reg: u16, mapper: Option<&Mapper>) -> u8 {
        match reg & 7 {
            2 => self.read_status(),
            4 => self.read_oam_data(),
            7 => self.read_data(mapper),
            _ => self.io_latch,
        }
    }

    /// CPU write of $2000–$2007 (register index 0..8).
    pub fn write_register(&mut self, reg: u16, data: u8, mapper: Option<&mut Mapper>) {
        self.io_latch = data;
        match reg & 7 {
            0 => self.write_ctrl(data),
            1 => self.mask = data,
            3 => self.oam_addr = data,
            4 => self.write_oam_data(data),
            5 => self.write_scroll(data),
            6 => self.write_addr(data),
            7 => self.write_data(mapper, data),
            _ => {}
        }
    }

    /// Read PPUSTATUS ($2002); clears vblank and the shared address/scroll latch.
    pub fn read_status(&mut self) -> u8 {
        let mut status = self.io_latch & 0x1F;
        if self.vblank {
            status |= 0x80;
        }
        if self.sprite_0_hit {
            status |= 0x40;
        }
        if self.sprite_overflow {
            status |= 0x20;
        }
        self.vblank = false;
        self.addr_latch = false;
        status
    }

    /// Read OAMDATA ($2004); returns OAM byte at current OAMADDR (read does not increment on real NES).
    pub fn read_oam_data(&self) -> u8 {
        self.oam[self.oam_addr as usize]
    }

    /// Write OAMDATA ($2004); writes OAM and increments OAMADDR.
    pub fn write_oam_data(&mut self, data: u8) {
        self.oam[self.oam_addr as usize] = data;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    /// Write PPUCTRL ($2000). Enabling NMI during vblank raises one immediately.
    pub fn write_ctrl(&mut self, data: u8) {
        let was_enabled = self.ctrl & 0x80 != 0;
        self.ctrl = data;
        if !was_enabled && data & 0x80 != 0 && self.vblank {
            self.nmi = true;
        }
    }

    /// Write PPUSCROLL ($2005): first write = X scroll, second write = Y scroll.
    pub fn write_scroll(&mut self, data: u8) {
        if !self.addr_latch {
            self.scroll_x = data;
        } else {
            self.scroll_y = data;
        }
        self.addr_latch = !self.addr_latch;
    }

    /// Write PPUADDR ($2006): two-byte write for 14-bit VRAM address (high then low).
    pub fn write_addr(&mut self, data: u8) {
        if !self.addr_latch {
            self.addr = ((data & 0x3F) as u16) << 8 | (self.addr & 0x00FF);
        } else {
            self.addr = (self.addr & 0xFF00) | data as u16;
        }
        self.addr_latch = !self.addr_latch;
    }

    fn increment_addr(&mut self) {
        let inc = if self.ctrl & 0x04 != 0 { 32 } else { 1 };
        self.addr = self.addr.wrapping_add(inc) & 0x3FFF;
    }

    /// Read PPUDATA ($2007); buffered except for palette reads. Auto-increments VRAM address.
    pub fn read_data(&mut self, mapper: Option<&Mapper>) -> u8 {
        let addr = self.addr & 0x3FFF;
        let data = if addr >= 0x3F00 {
            // Palette reads are immediate; the buffer picks up the nametable byte underneath.
            self.read_buffer = self.read_vram(addr - 0x1000, mapper);
            self.palette[Self::palette_index(addr)]
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.read_vram(addr, mapper);
            buffered
        };
        self.increment_addr();
        data
    }

    /// Write PPUDATA ($2007): writes VRAM at current address, then increments (by 1 or 32 per PPUCTRL).
    pub fn write_data(&mut self, mapper: Option<&mut Mapper>, data: u8) {
        let addr = self.addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => {
                if let Some(mapper) = mapper {
                    mapper.write(addr, data);
                }
            }
            0x2000..=0x3EFF => {
                let mirroring = mapper.map_or(Mirroring::Horizontal, |m| m.mirroring());
                self.nametable[Self::map_nametable_addr(addr, mirroring)] = data;
            }
            // Palette RAM (upper 2 bits of data ignored on real NES)
            _ => self.palette[Self::palette_index(addr)] = data & 0x3F,
        }
        self.increment_addr();
    }

    fn read_vram(&self, addr: u16, mapper: Option<&Mapper>) -> u8 {
        match addr {
            0x0000..=0x1FFF => mapper.map_or(0, |m| m.read(addr)),
            _ => {
                let mirroring = mapper.map_or(Mirroring::Horizontal, |m| m.mirroring());
                self.nametable[Self::map_nametable_addr(addr, mirroring)]
            }
        }
    }

    /// Resolve PPU palette address $3F00–$3F1F (and $3F20–$3FFF mirrors) to 32-byte index.
    /// Addresses $3F10, $3F14, $3F18, $3F1C mirror $3F00–$3F0C.
    fn palette_index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i >= 16 && i % 4 == 0 { i - 16 } else { i }
    }

    /// Map PPU nametable address ($2000–$3EFF) to an index into the internal 2 KiB.
    pub fn map_nametable_addr(addr: u16, mirroring: Mirroring) -> usize {
        let addr = (addr - 0x2000) & 0x0FFF;
        let table = addr / 0x400;
        let offset = (addr & 0x3FF) as usize;
        let page = match mirroring {
            Mirroring::Vertical => table & 1,
            Mirroring::Horizontal => table >> 1,
            Mirroring::OneScreenLower => 0,
            Mirroring::OneScreenUpper => 1,
        };
        page as usize * 0x400 + offset
    }

    fn color(&self, palette_addr: u16) -> u32 {
        let mut index = self.palette[Self::palette_index(palette_addr)];
        if self.mask & MASK_GRAYSCALE != 0 {
            index &= 0x30;
        }
        NES_PALETTE_RGB[(index & 0x3F) as usize]
    }

    /// Render one visible scanline into the framebuffer (background + sprites).
    pub fn render_scanline(&mut self, mapper: &Mapper, scanline: u16) {
        let y = scanline as usize;
        let row = y * SCREEN_WIDTH;
        let mirroring = mapper.mirroring();

        // Background pixel values (0-3) per x for sprite 0 hit and priority. 0 = transparent.
        let mut bg_pixel = [0u8; SCREEN_WIDTH];
        let backdrop = self.color(0x3F00);

        if self.mask & MASK_BACKGROUND != 0 {
            let bg_pattern_base = if self.ctrl & 0x10 != 0 { 0x1000u16 } else { 0 };
            let base_x = self.scroll_x as usize + (self.ctrl & 1) as usize * 256;
            let base_y = self.scroll_y as usize + ((self.ctrl >> 1) & 1) as usize * 240;
            let total_y = (y + base_y) % 480;
            let nt_y = total_y / 240;
            let tile_y = (total_y % 240) / 8;
            let py_in_tile = (total_y % 8) as u16;

            for x in 0..SCREEN_WIDTH {
                if x < 8 && self.mask & MASK_LEFT_BACKGROUND == 0 {
                    self.framebuffer[row + x] = backdrop;
                    continue;
                }
                let total_x = (x + base_x) % 512;
                let nt_x = total_x / 256;
                let tile_x = (total_x % 256) / 8;
                let logical = 0x2000 + ((nt_y << 1 | nt_x) * 0x400) as u16;

                let tile_addr = logical + (tile_y * 32 + tile_x) as u16;
                let tile_id = self.nametable[Self::map_nametable_addr(tile_addr, mirroring)];

                let attr_addr = logical + 0x3C0 + ((tile_y / 4) * 8 + tile_x / 4) as u16;
                let attr_byte = self.nametable[Self::map_nametable_addr(attr_addr, mirroring)];
                let shift = (((tile_y >> 1) & 1) << 2) | (((tile_x >> 1) & 1) << 1);
                let palette_bank = (attr_byte >> shift) & 3;

                let pattern = bg_pattern_base + tile_id as u16 * 16 + py_in_tile;
                let bit = 7 - (total_x % 8);
                let low = (mapper.read(pattern) >> bit) & 1;
                let high = (mapper.read(pattern + 8) >> bit) & 1;
                let pixel_value = (high << 1) | low;

                bg_pixel[x] = pixel_value;
                self.framebuffer[row + x] = if pixel_value == 0 {
                    backdrop
                } else {
                    self.color(0x3F00 + palette_bank as u16 * 4 + pixel_value as u16)
                };
            }
        } else {
            self.framebuffer[row..row + SCREEN_WIDTH].fill(backdrop);
        }

        if self.mask & MASK_SPRITES != 0 {
            self.render_sprites(mapper, scanline, &bg_pixel);
        }
    }

    fn render_sprites(&mut self, mapper: &Mapper, scanline: u16, bg_pixel: &[u8; SCREEN_WIDTH]) {
        let row = scanline as usize * SCREEN_WIDTH;
        let sprite_height: u16 = if self.ctrl & 0x20 != 0 { 16 } else { 8 };
        let sprite_pattern_base = if self.ctrl & 0x08 != 0 { 0x1000u16 } else { 0 };
        let background_on = self.mask & MASK_BACKGROUND != 0;

        // Sprite evaluation: up to 8 sprites on this scanline (lower OAM index = higher priority).
        let mut slots = [0usize; 8];
        let mut slot_count = 0;
        for i in 0..64 {
            let top = self.oam[i * 4] as u16 + 1;
            if scanline >= top && scanline < top + sprite_height {
                if slot_count < 8 {
                    slots[slot_count] = i;
                    slot_count += 1;
                } else {
                    self.sprite_overflow = true;
                    break;
                }
            }
        }

        // Draw back-to-front so lower-index sprites end up on top.
        for &i in slots[..slot_count].iter().rev() {
            let base = i * 4;
            let tile = self.oam[base + 1];
            let attr = self.oam[base + 2];
            let sprite_x = self.oam[base + 3] as usize;
            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;
            let behind_bg = attr & 0x20 != 0;
            let palette_base = 0x3F10 + (attr & 3) as u16 * 4;

            let y_offset = scanline - (self.oam[base] as u16 + 1);
            let row_in_sprite = if flip_v {
                sprite_height - 1 - y_offset
            } else {
                y_offset
            };

            let tile_addr = if sprite_height == 8 {
                sprite_pattern_base + tile as u16 * 16 + row_in_sprite
            } else {
                let table = (tile & 1) as u16 * 0x1000;
                let top_tile = (tile & 0xFE) as u16;
                let (index, row) = if row_in_sprite < 8 {
                    (top_tile, row_in_sprite)
                } else {
                    (top_tile + 1, row_in_sprite - 8)
                };
                table + index * 16 + row
            };
            let row_lo = mapper.read(tile_addr);
            let row_hi = mapper.read(tile_addr + 8);

            for px in 0..8 {
                let screen_x = sprite_x + px;
                if screen_x >= SCREEN_WIDTH {
                    break;
                }
                if screen_x < 8 && self.mask & MASK_LEFT_SPRITES == 0 {
                    continue;
                }
                let bit = if flip_h { px } else { 7 - px };
                let pixel_value = (((row_hi >> bit) & 1) << 1) | ((row_lo >> bit) & 1);
                if pixel_value == 0 {
                    continue;
                }

                let bg_val = bg_pixel[screen_x];
                if i == 0 && bg_val != 0 && background_on && screen_x != 255 {
                    self.sprite_0_hit = true;
                }
                if behind_bg && bg_val != 0 {
                    continue;
                }
                self.framebuffer[row + screen_x] = self.color(palette_base + pixel_value as u16);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::CartridgeImage;

    const DOTS_PER_FRAME: u32 = 341 * 262;

    fn chr_ram_mapper(mirroring: Mirroring) -> Mapper {
        let image = CartridgeImage::new(vec![0; 0x4000], vec![], 0, mirroring).unwrap();
        Mapper::new(image)
    }

    fn run_dots(ppu: &mut PPU, dots: u32) {
        for _ in 0..dots {
            ppu.step();
        }
    }

    #[test]
    fn vblank_starts_at_scanline_241_and_counts_frames() {
        let mut ppu = PPU::new();
        // Pre-render line plus 241 lines, then dot 1 of scanline 241.
        run_dots(&mut ppu, 242 * 341);
        assert!(!ppu.vblank);
        assert_eq!(ppu.frame, 0);
        run_dots(&mut ppu, 1);
        assert!(ppu.vblank);
        assert_eq!(ppu.frame, 1);
        run_dots(&mut ppu, DOTS_PER_FRAME);
        assert_eq!(ppu.frame, 2);
    }

    #[test]
    fn nmi_raised_only_when_enabled() {
        let mut ppu = PPU::new();
        run_dots(&mut ppu, DOTS_PER_FRAME);
        assert!(!ppu.nmi);

        let mut ppu = PPU::new();
        ppu.write_ctrl(0x80);
        run_dots(&mut ppu, DOTS_PER_FRAME);
        assert!(ppu.nmi);
    }

    #[test]
    fn enabling_nmi_inside_vblank_fires() {
        let mut ppu = PPU::new();
        run_dots(&mut ppu, 242 * 341 + 1);
        assert!(ppu.vblank && !ppu.nmi);
        ppu.write_ctrl(0x80);
        assert!(ppu.nmi);
    }

    #[test]
    fn status_read_clears_vblank_and_latch() {
        let mut ppu = PPU::new();
        ppu.vblank = true;
        ppu.write_addr(0x21);
        assert_eq!(ppu.read_status() & 0x80, 0x80);
        assert_eq!(ppu.read_status() & 0x80, 0);
        ppu.write_addr(0x23);
        ppu.write_addr(0x05);
        assert_eq!(ppu.addr, 0x2305);
    }

    #[test]
    fn visible_scanlines_are_reported() {
        let mut ppu = PPU::new();
        let mut lines = Vec::new();
        for _ in 0..DOTS_PER_FRAME {
            if let Some(line) = ppu.step() {
                lines.push(line);
            }
        }
        assert_eq!(lines, (0..240).collect::<Vec<u16>>());
    }

    #[test]
    fn ppudata_reads_are_buffered() {
        let mut ppu = PPU::new();
        let mut mapper = chr_ram_mapper(Mirroring::Horizontal);
        ppu.write_addr(0x20);
        ppu.write_addr(0x00);
        ppu.write_data(Some(&mut mapper), 0x11);
        ppu.write_data(Some(&mut mapper), 0x22);

        ppu.write_addr(0x20);
        ppu.write_addr(0x00);
        assert_eq!(ppu.read_data(Some(&mapper)), 0x00);
        assert_eq!(ppu.read_data(Some(&mapper)), 0x11);
        assert_eq!(ppu.read_data(Some(&mapper)), 0x22);
    }

    #[test]
    fn palette_reads_are_immediate_and_mirrored() {
        let mut ppu = PPU::new();
        ppu.write_addr(0x3F);
        ppu.write_addr(0x10);
        ppu.write_data(None, 0x2A);
        ppu.write_addr(0x3F);
        ppu.write_addr(0x00);
        assert_eq!(ppu.read_data(None), 0x2A);
    }

    #[test]
    fn increment_32_mode() {
        let mut ppu = PPU::new();
        ppu.write_ctrl(0x04);
        ppu.write_addr(0x20);
        ppu.write_addr(0x00);
        ppu.write_data(None, 1);
        assert_eq!(ppu.addr, 0x2020);
    }

    #[test]
    fn nametable_mirroring_modes() {
        use Mirroring::*;
        assert_eq!(PPU::map_nametable_addr(0x2400, Vertical), 0x400);
        assert_eq!(PPU::map_nametable_addr(0x2800, Vertical), 0x000);
        assert_eq!(PPU::map_nametable_addr(0x2400, Horizontal), 0x000);
        assert_eq!(PPU::map_nametable_addr(0x2C01, Horizontal), 0x401);
        assert_eq!(PPU::map_nametable_addr(0x2C01, OneScreenLower), 0x001);
        assert_eq!(PPU::map_nametable_addr(0x2001, OneScreenUpper), 0x401);
        assert_eq!(PPU::map_nametable_addr(0x3000, Vertical), 0x000);
    }

    #[test]
    fn background_tile_renders_palette_color() {
        let mut ppu = PPU::new();
        let mut mapper = chr_ram_mapper(Mirroring::Horizontal);
        // Tile 1, row 0: low plane all ones → pixel value 1.
        mapper.write(0x0010, 0xFF);
        ppu.nametable[0] = 1;
        ppu.palette[0] = 0x0F;
        ppu.palette[1] = 0x30;
        ppu.mask = MASK_BACKGROUND | MASK_LEFT_BACKGROUND;
        ppu.render_scanline(&mapper, 0);
        assert_eq!(ppu.framebuffer[0], NES_PALETTE_RGB[0x30]);
        assert_eq!(ppu.framebuffer[8], NES_PALETTE_RGB[0x0F]);
    }

    #[test]
    fn sprite_zero_hit_over_opaque_background() {
        let mut ppu = PPU::new();
        let mut mapper = chr_ram_mapper(Mirroring::Horizontal);
        for row in 0..8 {
            mapper.write(0x0010 + row, 0xFF);
        }
        ppu.nametable.fill(1);
        ppu.oam[0] = 9; // top at scanline 10
        ppu.oam[1] = 1;
        ppu.oam[3] = 40;
        ppu.mask = MASK_BACKGROUND | MASK_SPRITES | MASK_LEFT_BACKGROUND | MASK_LEFT_SPRITES;
        ppu.render_scanline(&mapper, 9);
        assert!(!ppu.sprite_0_hit);
        ppu.render_scanline(&mapper, 10);
        assert!(ppu.sprite_0_hit);
    }

    #[test]
    fn ninth_sprite_sets_overflow() {
        let mut ppu = PPU::new();
        let mapper = chr_ram_mapper(Mirroring::Horizontal);
        for i in 0..9 {
            ppu.oam[i * 4] = 0;
        }
        for i in 9..64 {
            ppu.oam[i * 4] = 0xF0;
        }
        ppu.mask = MASK_SPRITES;
        ppu.render_scanline(&mapper, 1);
        assert!(ppu.sprite_overflow);
    }

    #[test]
    fn disabled_rendering_shows_backdrop() {
        let mut ppu = PPU::new();
        let mapper = chr_ram_mapper(Mirroring::Horizontal);
        ppu.palette[0] = 0x21;
        ppu.render_scanline(&mapper, 5);
        assert!(
            ppu.framebuffer[5 * 256..6 * 256]
                .iter()
                .all(|&c| c == NES_PALETTE_RGB[0x21])
        );
    }

    #[test]
    fn reset_returns_to_pre_render() {
        let mut ppu = PPU::new();
        run_dots(&mut ppu, 1000);
        ppu.write_ctrl(0x80);
        ppu.reset();
        assert_eq!(ppu.scanline, -1);
        assert_eq!(ppu.cycle, 0);
        assert_eq!(ppu.ctrl, 0);
    }
}
