//! Conversion between 8-bit-per-channel palettes and the hardware's packed
//! 4-bit-per-channel layout.
//!
//! Each packed color takes two bytes:
//!
//! ```text
//! byte 0: GGGG BBBB
//! byte 1: 0000 RRRR
//! ```

use crate::params::{PACKED_PALETTE_BYTES, PALETTE_COLORS};
use ::image::Rgba;

/// Sixteen opaque colors, 8 bits per channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgba<u8>; PALETTE_COLORS],
}

/// Sixteen colors, 4 bits per channel, as stored in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedPalette([u8; PACKED_PALETTE_BYTES]);

impl Palette {
    pub fn new(colors: [Rgba<u8>; PALETTE_COLORS]) -> Self {
        Self { colors }
    }

    /// Builds a palette out of flat `RGBRGB...` bytes; missing colors are
    /// black, extra colors are ignored.
    pub fn from_rgb(rgb: &[u8]) -> Self {
        let mut this = Self::default();

        for (color, rgb) in this.colors.iter_mut().zip(rgb.chunks_exact(3)) {
            *color = Rgba([rgb[0], rgb[1], rgb[2], 0xFF]);
        }

        this
    }

    pub fn colors(&self) -> &[Rgba<u8>; PALETTE_COLORS] {
        &self.colors
    }

    pub fn color(&self, idx: u8) -> Rgba<u8> {
        self.colors[(idx & 0x0F) as usize]
    }

    /// Flat `RGBRGB...` bytes, as GIF palettes expect them.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.colors
            .iter()
            .flat_map(|Rgba([r, g, b, _])| [*r, *g, *b])
            .collect()
    }

    /// Drops the low 4 bits of every channel.
    pub fn pack(&self) -> PackedPalette {
        let mut packed = [0; PACKED_PALETTE_BYTES];

        for (bytes, Rgba([r, g, b, _])) in packed.chunks_exact_mut(2).zip(self.colors.iter()) {
            bytes[0] = (g & 0xF0) | (b >> 4);
            bytes[1] = r >> 4;
        }

        PackedPalette(packed)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: [Rgba([0, 0, 0, 0xFF]); PALETTE_COLORS],
        }
    }
}

impl PackedPalette {
    pub fn from_bytes(bytes: [u8; PACKED_PALETTE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PACKED_PALETTE_BYTES] {
        &self.0
    }

    /// Expands every 4-bit channel `n` into `n * 17`; alpha is always opaque.
    pub fn unpack(&self) -> Palette {
        let mut colors = [Rgba([0, 0, 0, 0xFF]); PALETTE_COLORS];

        for (color, bytes) in colors.iter_mut().zip(self.0.chunks_exact(2)) {
            let r = bytes[1] & 0x0F;
            let g = bytes[0] >> 4;
            let b = bytes[0] & 0x0F;

            *color = Rgba([r * 17, g * 17, b * 17, 0xFF]);
        }

        Palette { colors }
    }
}
