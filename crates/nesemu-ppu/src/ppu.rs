//! The 2C02 PPU: registers, VRAM, OAM, and the background/sprite pipelines
//! tied together into a single per-dot-steppable unit.

use nesemu_cartridge::Mapper;

use crate::background::Background;
use crate::oam::{Oam, SpriteEntry};
use crate::registers::{Ctrl, Mask, StatusFlags};
use crate::scroll::Scroll;
use crate::sprites::{flip_horizontal, SpriteRenderer};
use crate::timing::Timing;
use crate::vram::Vram;

/// Screen width in pixels.
pub const WIDTH: usize = 256;
/// Screen height in pixels.
pub const HEIGHT: usize = 240;

/// One output pixel: 6-bit NES color index (bits 0-5) plus the emphasis
/// bits from PPUMASK in effect when it was drawn (bits 6-8).
pub type Pixel = u16;

/// The 2C02 PPU.
pub struct Ppu {
    ctrl: Ctrl,
    mask: Mask,
    status: StatusFlags,
    scroll: Scroll,
    oam: Oam,
    vram: Vram,
    background: Background,
    sprite_renderer: SpriteRenderer,
    timing: Timing,

    /// $2007 buffered-read latch (reads of nametable/pattern space are
    /// delayed by one read; palette reads bypass the buffer).
    read_buffer: u8,
    /// Open-bus decay value driving unused register read bits.
    open_bus: u8,

    /// Set on the rising edge of VBlank+NMI_ENABLE; cleared once the CPU
    /// samples it via [`Ppu::nmi_pending`] and [`Ppu::clear_nmi`].
    nmi_pending: bool,

    /// Framebuffer for the most recently completed (or in-progress) frame.
    pub framebuffer: Vec<Pixel>,

    sprite_zero_hit_possible_this_scanline: bool,
}

impl Default for Ppu {
    fn default() -> Self {
        Self {
            ctrl: Ctrl::empty(),
            mask: Mask::empty(),
            status: StatusFlags::empty(),
            scroll: Scroll::default(),
            oam: Oam::new(),
            vram: Vram::new(),
            background: Background::default(),
            sprite_renderer: SpriteRenderer::default(),
            timing: Timing::ntsc(),
            read_buffer: 0,
            open_bus: 0,
            nmi_pending: false,
            framebuffer: vec![0; WIDTH * HEIGHT],
            sprite_zero_hit_possible_this_scanline: false,
        }
    }
}

impl Ppu {
    /// Construct a PPU with NTSC timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to PAL (312 scanline) frame timing.
    pub fn set_pal_timing(&mut self) {
        self.timing = Timing::pal();
    }

    /// Whether an NMI is pending for the CPU to service.
    #[must_use]
    pub const fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    /// Acknowledge the pending NMI.
    pub fn clear_nmi(&mut self) {
        self.nmi_pending = false;
    }

    /// Current scanline (0-261 NTSC), for mapper IRQ bookkeeping and debug.
    #[must_use]
    pub const fn scanline(&self) -> u16 {
        self.timing.scanline
    }

    /// Current dot (0-340), for debug/testing.
    #[must_use]
    pub const fn dot(&self) -> u16 {
        self.timing.dot
    }

    // ---- CPU-facing register interface ($2000-$2007) ----

    /// CPU read from $2000-$2007 (mirrored every 8 bytes through $3FFF).
    ///
    /// Returns `(value, driven_mask)`: `driven_mask` has a 1 bit for every
    /// bit of `value` this register genuinely drives this read. The rest
    /// are pass-through open bus and must not refresh the bus's decay
    /// timers, so a caller feeding this into an open-bus model should pass
    /// `driven_mask` (not a blanket `0xFF`) to the drive step.
    pub fn read_register(&mut self, addr: u16, mapper: &mut dyn Mapper) -> (u8, u8) {
        match addr % 8 {
            2 => {
                let value = (self.status.bits() & 0xE0) | (self.open_bus & 0x1F);
                self.status.remove(StatusFlags::VBLANK);
                self.scroll.reset_latch();
                self.open_bus = value;
                (value, 0xE0)
            }
            4 => {
                let value = self.oam.read_data();
                self.open_bus = value;
                (value, 0xFF)
            }
            7 => {
                let addr = self.scroll.v & 0x3FFF;
                let (value, mask) = if addr >= 0x3F00 {
                    let palette = self.vram.read_palette(addr);
                    self.read_buffer = self.read_vram_through_mapper(addr - 0x1000, mapper);
                    (palette | (self.open_bus & 0xC0), 0x3F)
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.read_vram_through_mapper(addr, mapper);
                    (buffered, 0xFF)
                };
                self.scroll.v = self.scroll.v.wrapping_add(self.ctrl.vram_increment());
                self.open_bus = value;
                (value, mask)
            }
            _ => (self.open_bus, 0x00),
        }
    }

    /// CPU write to $2000-$2007 (mirrored every 8 bytes through $3FFF).
    pub fn write_register(&mut self, addr: u16, value: u8, mapper: &mut dyn Mapper) {
        self.open_bus = value;
        match addr % 8 {
            0 => {
                let nmi_enable_was_set = self.ctrl.contains(Ctrl::NMI_ENABLE);
                self.ctrl = Ctrl::from_bits_truncate(value);
                self.scroll.write_ctrl_nametable(value);
                if !nmi_enable_was_set
                    && self.ctrl.contains(Ctrl::NMI_ENABLE)
                    && self.status.contains(StatusFlags::VBLANK)
                {
                    self.nmi_pending = true;
                }
            }
            1 => self.mask = Mask::from_bits_truncate(value),
            3 => self.oam.addr = value,
            4 => self.oam.write_data(value),
            5 => self.scroll.write_scroll(value),
            6 => self.scroll.write_addr(value),
            7 => {
                let addr = self.scroll.v & 0x3FFF;
                self.write_vram_through_mapper(addr, value, mapper);
                self.scroll.v = self.scroll.v.wrapping_add(self.ctrl.vram_increment());
            }
            _ => {}
        }
    }

    /// One byte of an OAM DMA transfer (the 256-byte burst triggered by a
    /// $4014 write); the host/bus drives the stall cycles separately.
    pub fn oam_dma_write(&mut self, value: u8) {
        self.oam.dma_write(value);
    }

    fn read_vram_through_mapper(&mut self, addr: u16, mapper: &mut dyn Mapper) -> u8 {
        match addr {
            0x0000..=0x1FFF => {
                mapper.clock_ppu_address(addr);
                mapper.read_chr(addr)
            }
            0x2000..=0x3EFF => self.vram.read_nametable(addr, mapper.mirroring()),
            _ => self.vram.read_palette(addr),
        }
    }

    fn write_vram_through_mapper(&mut self, addr: u16, value: u8, mapper: &mut dyn Mapper) {
        match addr {
            0x0000..=0x1FFF => mapper.write_chr(addr, value),
            0x2000..=0x3EFF => self.vram.write_nametable(addr, mapper.mirroring(), value),
            _ => self.vram.write_palette(addr, value),
        }
    }

    // ---- Per-dot stepping ----

    /// Advance the PPU by one dot (1/3 of a CPU cycle on NTSC).
    pub fn tick(&mut self, mapper: &mut dyn Mapper) {
        let rendering = self.mask.rendering_enabled();
        let timing = self.timing;

        if timing.is_visible() || timing.is_pre_render() {
            self.step_background(mapper, timing.dot, rendering);
            if timing.dot == 257 && rendering {
                self.evaluate_sprites_for_next_scanline(mapper, timing.scanline);
            }
            if rendering && (timing.dot >= 1 && timing.dot <= 256) {
                self.sprite_renderer.tick();
            }
        }

        if timing.is_pre_render() {
            if timing.dot == 1 {
                self.status.remove(StatusFlags::VBLANK);
                self.status.remove(StatusFlags::SPRITE_ZERO_HIT);
                self.status.remove(StatusFlags::SPRITE_OVERFLOW);
            }
            if rendering && (280..=304).contains(&timing.dot) {
                self.scroll.copy_vertical();
            }
        }

        if timing.is_visible() && timing.dot >= 1 && timing.dot <= 256 {
            self.render_pixel(timing.dot - 1);
        }

        if timing.scanline == 241 && timing.dot == 1 {
            self.status.insert(StatusFlags::VBLANK);
            if self.ctrl.contains(Ctrl::NMI_ENABLE) {
                self.nmi_pending = true;
            }
        }

        self.timing.advance(rendering);
    }

    fn step_background(&mut self, mapper: &mut dyn Mapper, dot: u16, rendering: bool) {
        if !rendering {
            return;
        }
        let fetch_dot = (1..=256).contains(&dot) || (321..=336).contains(&dot);
        if fetch_dot {
            self.background.shift();
            match dot % 8 {
                1 => {
                    let value = self.read_vram_through_mapper(self.scroll.nametable_addr(), mapper);
                    self.background.latch_nametable(value);
                }
                3 => {
                    let value = self.read_vram_through_mapper(self.scroll.attribute_addr(), mapper);
                    let coarse_x = self.scroll.v & 0x1F;
                    let coarse_y = (self.scroll.v >> 5) & 0x1F;
                    self.background.latch_attribute(value, coarse_x, coarse_y);
                }
                5 => {
                    let tile = self.background.nametable_latch();
                    let base = self.ctrl.background_pattern_table();
                    let addr = base + u16::from(tile) * 16 + self.scroll.fine_y();
                    let value = self.read_vram_through_mapper(addr, mapper);
                    self.background.latch_pattern_lo(value);
                }
                7 => {
                    let tile = self.background.nametable_latch();
                    let base = self.ctrl.background_pattern_table();
                    let addr = base + u16::from(tile) * 16 + self.scroll.fine_y() + 8;
                    let value = self.read_vram_through_mapper(addr, mapper);
                    self.background.latch_pattern_hi(value);
                    self.background.reload_shift_registers();
                    self.scroll.increment_coarse_x();
                }
                _ => {}
            }
        }
        if dot == 256 {
            self.scroll.increment_fine_y();
        }
        if dot == 257 {
            self.scroll.copy_horizontal();
        }
    }

    fn evaluate_sprites_for_next_scanline(&mut self, mapper: &mut dyn Mapper, scanline: u16) {
        self.oam.clear_secondary();
        let height: u16 = if self.ctrl.tall_sprites() { 16 } else { 8 };
        let mut found = 0u8;
        for i in 0..64u8 {
            let y = self.oam.primary_byte(i, 0);
            let row = scanline.wrapping_sub(u16::from(y));
            if row >= height {
                continue;
            }
            if found < 8 {
                let tile = self.oam.primary_byte(i, 1);
                let attr = self.oam.primary_byte(i, 2);
                let x = self.oam.primary_byte(i, 3);
                self.oam.push_secondary(i, y, tile, attr, x);
            } else {
                self.status.insert(StatusFlags::SPRITE_OVERFLOW);
                break;
            }
            found += 1;
        }

        let entries = self.oam.secondary_entries();
        let mut patterns = [(0u8, 0u8); 8];
        for i in 0..usize::from(self.oam.secondary_count) {
            patterns[i] = self.fetch_sprite_pattern(mapper, &entries[i], scanline, height);
        }
        self.sprite_renderer.load(&entries, self.oam.secondary_count, &patterns);
        self.sprite_zero_hit_possible_this_scanline = self.oam.sprite_zero_in_secondary;
    }

    fn fetch_sprite_pattern(
        &mut self,
        mapper: &mut dyn Mapper,
        entry: &SpriteEntry,
        scanline: u16,
        height: u16,
    ) -> (u8, u8) {
        let flip_y = entry.attributes & 0x80 != 0;
        let flip_x = entry.attributes & 0x40 != 0;
        let mut row = scanline.wrapping_sub(u16::from(entry.y));
        if flip_y {
            row = height - 1 - row;
        }

        let (table, tile) = if height == 16 {
            let table = u16::from(entry.tile & 0x01) * 0x1000;
            let mut tile_index = entry.tile & 0xFE;
            if row >= 8 {
                tile_index += 1;
                row -= 8;
            }
            (table, tile_index)
        } else {
            (self.ctrl.sprite_pattern_table(), entry.tile)
        };

        let addr = table + u16::from(tile) * 16 + row;
        let lo = self.read_vram_through_mapper(addr, mapper);
        let hi = self.read_vram_through_mapper(addr + 8, mapper);
        if flip_x {
            (flip_horizontal(lo), flip_horizontal(hi))
        } else {
            (lo, hi)
        }
    }

    fn render_pixel(&mut self, x: u16) {
        let fine_x = self.scroll.x;
        let (bg_pattern, bg_palette) = if self.mask.contains(Mask::SHOW_BACKGROUND)
            && (x >= 8 || self.mask.contains(Mask::SHOW_BACKGROUND_LEFT))
        {
            self.background.sample(fine_x)
        } else {
            (0, 0)
        };

        let sprite = if self.mask.contains(Mask::SHOW_SPRITES)
            && (x >= 8 || self.mask.contains(Mask::SHOW_SPRITES_LEFT))
        {
            self.sprite_renderer.sample()
        } else {
            None
        };

        let bg_opaque = bg_pattern != 0;
        let (sprite_opaque, sprite_palette, sprite_behind, sprite_is_zero) = match sprite {
            Some((pattern, palette, behind, is_zero)) => (pattern != 0, palette, behind, is_zero),
            None => (false, 0, false, false),
        };

        if bg_opaque
            && sprite_opaque
            && sprite_is_zero
            && self.sprite_zero_hit_possible_this_scanline
            && x != 255
        {
            self.status.insert(StatusFlags::SPRITE_ZERO_HIT);
        }

        let palette_addr = if sprite_opaque && (!bg_opaque || !sprite_behind) {
            0x3F00 + u16::from(sprite_palette) * 4 + u16::from(sprite.map_or(0, |s| s.0))
        } else if bg_opaque {
            0x3F00 + u16::from(bg_palette) * 4 + u16::from(bg_pattern)
        } else {
            0x3F00
        };

        let mut color = self.vram.read_palette(palette_addr) & 0x3F;
        if self.mask.contains(Mask::GRAYSCALE) {
            color &= 0x30;
        }
        let emphasis = (self.mask.bits() >> 5) & 0x07;
        let pixel = u16::from(color) | (u16::from(emphasis) << 6);

        let scanline = self.scanline();
        self.framebuffer[usize::from(scanline) * WIDTH + usize::from(x)] = pixel;
    }
}
