//! Fixed geometry and format constants of the target hardware.

/// Screen width, in pixels.
pub const WIDTH: u32 = 320;

/// Screen height, in pixels.
pub const HEIGHT: u32 = 200;

/// Two 4-bit pixels share a byte.
pub const PIXELS_PER_BYTE: usize = 2;

/// Size of one packed frame, in bytes.
pub const FRAME_BYTES: usize = (WIDTH as usize) * (HEIGHT as usize) / PIXELS_PER_BYTE;

/// Number of colors in a palette.
pub const PALETTE_COLORS: usize = 16;

/// Size of a packed (4 bits per channel) palette, in bytes.
pub const PACKED_PALETTE_BYTES: usize = PALETTE_COLORS * 2;

/// Size of the little-endian chunk size field.
pub const SIZE_FIELD_BYTES: usize = 2;

/// Any size field at or above this value ends the stream.
pub const END_OF_STREAM: u16 = 0xFF00;

/// Smallest chunk the decoder accepts: a bare size field (empty payload,
/// which repeats the previous frame).
pub const MIN_CHUNK_SIZE: u16 = SIZE_FIELD_BYTES as u16;

/// How long each decoded frame is displayed, in centiseconds.
pub const FRAME_DELAY: u16 = 100 / 8;

pub(crate) fn check_geometry(width: u32, height: u32) -> crate::Result<()> {
    if width == WIDTH && height == HEIGHT {
        Ok(())
    } else {
        Err(crate::Error::GeometryMismatch { width, height })
    }
}
