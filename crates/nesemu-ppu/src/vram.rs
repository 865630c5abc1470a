//! Nametable VRAM (2KiB on-PPU storage, mirrored per cartridge wiring) and
//! palette RAM (32 bytes, with its own mirroring rules).

use nesemu_cartridge::Mirroring;

/// 2KiB nametable RAM plus 32-byte palette RAM.
#[derive(Debug, Clone)]
pub struct Vram {
    nametables: [u8; 0x0800],
    palette: [u8; 32],
}

impl Default for Vram {
    fn default() -> Self {
        Self { nametables: [0; 0x0800], palette: [0; 32] }
    }
}

impl Vram {
    /// Construct empty (power-on-undefined, here zeroed) VRAM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a $2000-$2FFF nametable address to an offset in the 2KiB
    /// physical storage, honoring the cartridge's mirroring mode.
    #[must_use]
    pub fn mirror_nametable(addr: u16, mirroring: Mirroring) -> usize {
        let addr = (addr - 0x2000) % 0x1000;
        let table = addr / 0x0400;
        let offset = addr % 0x0400;
        let physical_table = match mirroring {
            Mirroring::Horizontal => table / 2,
            Mirroring::Vertical => table % 2,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
            Mirroring::FourScreen => table,
        };
        (usize::from(physical_table) * 0x0400 + usize::from(offset)) % self_len()
    }

    /// Read a nametable byte through the mirroring map.
    #[must_use]
    pub fn read_nametable(&self, addr: u16, mirroring: Mirroring) -> u8 {
        self.nametables[Self::mirror_nametable(addr, mirroring)]
    }

    /// Write a nametable byte through the mirroring map.
    pub fn write_nametable(&mut self, addr: u16, mirroring: Mirroring, value: u8) {
        let offset = Self::mirror_nametable(addr, mirroring);
        self.nametables[offset] = value;
    }

    /// Map a $3F00-$3FFF palette address to an index into the 32-byte
    /// palette RAM, folding the backdrop-color mirrors ($3F10/$3F14/$3F18/
    /// $3F1C alias $3F00/$3F04/$3F08/$3F0C).
    #[must_use]
    pub fn mirror_palette(addr: u16) -> usize {
        let mut index = usize::from(addr) % 32;
        if index >= 16 && index % 4 == 0 {
            index -= 16;
        }
        index
    }

    /// Read a palette byte.
    #[must_use]
    pub fn read_palette(&self, addr: u16) -> u8 {
        self.palette[Self::mirror_palette(addr)]
    }

    /// Write a palette byte.
    pub fn write_palette(&mut self, addr: u16, value: u8) {
        let index = Self::mirror_palette(addr);
        self.palette[index] = value;
    }
}

// `mirror_nametable` is a free function's worth of logic but lives as an
// associated fn above; this helper just names the physical table size.
const fn self_len() -> usize {
    0x0800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_mirroring_maps_0_and_2_together() {
        assert_eq!(
            Vram::mirror_nametable(0x2000, Mirroring::Vertical),
            Vram::mirror_nametable(0x2800, Mirroring::Vertical)
        );
    }

    #[test]
    fn horizontal_mirroring_maps_0_and_1_together() {
        assert_eq!(
            Vram::mirror_nametable(0x2000, Mirroring::Horizontal),
            Vram::mirror_nametable(0x2400, Mirroring::Horizontal)
        );
    }

    #[test]
    fn palette_backdrop_mirrors_fold_down() {
        assert_eq!(Vram::mirror_palette(0x3F10), Vram::mirror_palette(0x3F00));
        assert_eq!(Vram::mirror_palette(0x3F14), Vram::mirror_palette(0x3F04));
        assert_ne!(Vram::mirror_palette(0x3F11), Vram::mirror_palette(0x3F01).wrapping_sub(1));
    }

    #[test]
    fn palette_round_trips() {
        let mut vram = Vram::new();
        vram.write_palette(0x3F05, 0x2A);
        assert_eq!(vram.read_palette(0x3F05), 0x2A);
    }
}
