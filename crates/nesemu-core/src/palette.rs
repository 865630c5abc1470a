//! The 2C02's fixed 64-entry color generator, mapping a 6-bit palette index
//! (with emphasis bits folded in by the PPU) to display RGB.

/// The standard NTSC NES palette: 64 base colors. Index bit layout matches
/// the PPU's packed palette byte (`0x00-0x3F`); emphasis bits are applied
/// separately in [`apply_emphasis`].
pub const NES_PALETTE: [(u8, u8, u8); 64] = [
    (0x62, 0x62, 0x62), (0x00, 0x1F, 0xB2), (0x24, 0x04, 0xC8), (0x52, 0x00, 0xB2),
    (0x73, 0x00, 0x76), (0x80, 0x00, 0x24), (0x73, 0x0B, 0x00), (0x52, 0x28, 0x00),
    (0x24, 0x44, 0x00), (0x00, 0x57, 0x00), (0x00, 0x5C, 0x00), (0x00, 0x53, 0x24),
    (0x00, 0x3C, 0x76), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xAB, 0xAB, 0xAB), (0x0D, 0x57, 0xFF), (0x4B, 0x30, 0xFF), (0x8A, 0x13, 0xFF),
    (0xBC, 0x08, 0xD6), (0xD2, 0x12, 0x69), (0xC7, 0x2E, 0x00), (0x9D, 0x54, 0x00),
    (0x60, 0x7B, 0x00), (0x20, 0x98, 0x00), (0x00, 0xA3, 0x00), (0x00, 0x99, 0x42),
    (0x00, 0x7D, 0xB4), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFF, 0xFF), (0x53, 0xAE, 0xFF), (0x90, 0x85, 0xFF), (0xD3, 0x65, 0xFF),
    (0xFF, 0x57, 0xFF), (0xFF, 0x5D, 0xCF), (0xFF, 0x77, 0x57), (0xFA, 0x9E, 0x00),
    (0xBD, 0xC7, 0x00), (0x7A, 0xE7, 0x00), (0x43, 0xF6, 0x11), (0x26, 0xEF, 0x7E),
    (0x2C, 0xD5, 0xF6), (0x4E, 0x4E, 0x4E), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFF, 0xFF), (0xB6, 0xE1, 0xFF), (0xCE, 0xD1, 0xFF), (0xE9, 0xC3, 0xFF),
    (0xFF, 0xBC, 0xFF), (0xFF, 0xBD, 0xF4), (0xFF, 0xC6, 0xC3), (0xFF, 0xD5, 0x9A),
    (0xE9, 0xE6, 0x81), (0xCE, 0xF4, 0x81), (0xB6, 0xFB, 0x9A), (0xA9, 0xFA, 0xC3),
    (0xA9, 0xF0, 0xF4), (0xB8, 0xB8, 0xB8), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
];

/// Apply PPUMASK color-emphasis bits (red/green/blue, bits 6-8 of the
/// PPU's packed [`nesemu_ppu::Pixel`]) by scaling the non-emphasized
/// channels down, matching the approximate hardware behavior.
#[must_use]
pub fn apply_emphasis(rgb: (u8, u8, u8), emphasis: u8) -> (u8, u8, u8) {
    if emphasis == 0 {
        return rgb;
    }
    let dim = |channel: u8| (u16::from(channel) * 3 / 4) as u8;
    let (r, g, b) = rgb;
    let emphasize_red = emphasis & 0x01 != 0;
    let emphasize_green = emphasis & 0x02 != 0;
    let emphasize_blue = emphasis & 0x04 != 0;
    (
        if emphasize_red { r } else { dim(r) },
        if emphasize_green { g } else { dim(g) },
        if emphasize_blue { b } else { dim(b) },
    )
}

/// Convert one packed PPU pixel (6-bit color index in bits 0-5, emphasis in
/// bits 6-8) into display RGB.
#[must_use]
pub fn pixel_to_rgb(pixel: u16) -> (u8, u8, u8) {
    let index = usize::from(pixel & 0x3F);
    let emphasis = (pixel >> 6) as u8 & 0x07;
    apply_emphasis(NES_PALETTE[index], emphasis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_sixty_four_entries() {
        assert_eq!(NES_PALETTE.len(), 64);
    }

    #[test]
    fn white_and_black_indices_match_known_values() {
        assert_eq!(NES_PALETTE[0x30], (0xFF, 0xFF, 0xFF));
        assert_eq!(NES_PALETTE[0x0F], (0x00, 0x00, 0x00));
    }

    #[test]
    fn no_emphasis_is_identity() {
        let rgb = NES_PALETTE[0x16];
        assert_eq!(apply_emphasis(rgb, 0), rgb);
    }

    #[test]
    fn emphasis_dims_non_emphasized_channels() {
        let rgb = (0xFF, 0xFF, 0xFF);
        let dimmed = apply_emphasis(rgb, 0x01); // red emphasis only
        assert_eq!(dimmed.0, 0xFF);
        assert!(dimmed.1 < 0xFF);
        assert!(dimmed.2 < 0xFF);
    }

    #[test]
    fn pixel_to_rgb_masks_to_valid_index() {
        let (r, g, b) = pixel_to_rgb(0x30);
        assert_eq!((r, g, b), (0xFF, 0xFF, 0xFF));
    }
}
