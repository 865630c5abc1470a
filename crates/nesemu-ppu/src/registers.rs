//! PPUCTRL ($2000), PPUMASK ($2001), and PPUSTATUS ($2002) bitflags.

use bitflags::bitflags;

bitflags! {
    /// $2000 PPUCTRL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Ctrl: u8 {
        /// Base nametable select, bits 0-1 (also the high bits of Loopy `t`).
        const NAMETABLE_X = 0b0000_0001;
        const NAMETABLE_Y = 0b0000_0010;
        /// VRAM address increment per $2007 access: 0 = +1, 1 = +32.
        const VRAM_INCREMENT = 0b0000_0100;
        /// Sprite pattern table for 8x8 sprites: 0 = $0000, 1 = $1000.
        const SPRITE_PATTERN_TABLE = 0b0000_1000;
        /// Background pattern table: 0 = $0000, 1 = $1000.
        const BACKGROUND_PATTERN_TABLE = 0b0001_0000;
        /// Sprite size: 0 = 8x8, 1 = 8x16.
        const SPRITE_SIZE = 0b0010_0000;
        /// PPU master/slave select; unused on the NES (no second PPU).
        const MASTER_SLAVE = 0b0100_0000;
        /// Generate an NMI at the start of VBlank.
        const NMI_ENABLE = 0b1000_0000;
    }
}

impl Ctrl {
    /// Per-access VRAM address increment (1 or 32).
    #[must_use]
    pub const fn vram_increment(self) -> u16 {
        if self.contains(Self::VRAM_INCREMENT) {
            32
        } else {
            1
        }
    }

    /// Sprite pattern table base address for 8x8 sprite mode.
    #[must_use]
    pub const fn sprite_pattern_table(self) -> u16 {
        if self.contains(Self::SPRITE_PATTERN_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Background pattern table base address.
    #[must_use]
    pub const fn background_pattern_table(self) -> u16 {
        if self.contains(Self::BACKGROUND_PATTERN_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Whether sprites are 8x16 (true) or 8x8 (false).
    #[must_use]
    pub const fn tall_sprites(self) -> bool {
        self.contains(Self::SPRITE_SIZE)
    }
}

bitflags! {
    /// $2001 PPUMASK.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mask: u8 {
        /// Render in grayscale (AND all palette entries with $30).
        const GRAYSCALE = 0b0000_0001;
        /// Show background in the leftmost 8 pixels of the screen.
        const SHOW_BACKGROUND_LEFT = 0b0000_0010;
        /// Show sprites in the leftmost 8 pixels of the screen.
        const SHOW_SPRITES_LEFT = 0b0000_0100;
        /// Enable background rendering.
        const SHOW_BACKGROUND = 0b0000_1000;
        /// Enable sprite rendering.
        const SHOW_SPRITES = 0b0001_0000;
        /// Emphasize red.
        const EMPHASIZE_RED = 0b0010_0000;
        /// Emphasize green.
        const EMPHASIZE_GREEN = 0b0100_0000;
        /// Emphasize blue.
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

impl Mask {
    /// Whether either layer is enabled (rendering active this frame).
    #[must_use]
    pub const fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BACKGROUND.union(Self::SHOW_SPRITES))
    }
}

bitflags! {
    /// $2002 PPUSTATUS. Only the top 3 bits are real registers; the bottom
    /// 5 read back whatever was last on the bus (open-bus decay).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        /// Sprite overflow (more than 8 sprites on a scanline).
        const SPRITE_OVERFLOW = 0b0010_0000;
        /// Sprite 0 hit this frame.
        const SPRITE_ZERO_HIT = 0b0100_0000;
        /// Currently in VBlank.
        const VBLANK = 0b1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vram_increment_matches_bit_two() {
        assert_eq!(Ctrl::empty().vram_increment(), 1);
        assert_eq!(Ctrl::VRAM_INCREMENT.vram_increment(), 32);
    }

    #[test]
    fn rendering_enabled_requires_either_layer() {
        assert!(!Mask::empty().rendering_enabled());
        assert!(Mask::SHOW_BACKGROUND.rendering_enabled());
        assert!(Mask::SHOW_SPRITES.rendering_enabled());
    }
}
