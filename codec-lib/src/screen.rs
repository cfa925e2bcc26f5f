use crate::prelude::*;
use std::mem;

/// One 320x200 frame, two 4-bit pixels per byte (even pixel in the high
/// nibble), rows stored back to back.
#[derive(Clone, PartialEq, Eq)]
pub struct Screen {
    bytes: Box<[u8; FRAME_BYTES]>,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; FRAME_BYTES]),
        }
    }

    /// Packs 8-bit pixel indices (one per pixel) into this screen; only the
    /// low nibble of each index is kept.
    pub fn load_indices(&mut self, indices: &[u8]) -> Result<()> {
        if indices.len() != FRAME_BYTES * PIXELS_PER_BYTE {
            return Err(Error::PixelCountMismatch {
                pixels: indices.len(),
            });
        }

        for (byte, pair) in self.bytes.iter_mut().zip(indices.chunks_exact(2)) {
            *byte = (pair[0] << 4) | (pair[1] & 0x0F);
        }

        Ok(())
    }

    pub fn from_indices(indices: &[u8]) -> Result<Self> {
        let mut this = Self::new();
        this.load_indices(indices)?;
        Ok(this)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != FRAME_BYTES {
            return None;
        }

        let mut this = Self::new();
        this.bytes.copy_from_slice(bytes);
        Some(this)
    }

    /// Unpacks this screen into one 8-bit index per pixel.
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.bytes.iter().flat_map(|byte| [byte >> 4, byte & 0x0F])
    }

    pub fn to_indices(&self) -> Vec<u8> {
        self.indices().collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..]
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("bytes", &format_args!("[{} bytes]", FRAME_BYTES))
            .finish()
    }
}

/// The encoder's pair of screens: `curr` is refilled for every source frame,
/// `prev` holds the last frame that made it into the stream.
#[derive(Debug, Default)]
pub struct FrameBuffers {
    curr: Screen,
    prev: Screen,
    has_prev: bool,
}

impl FrameBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curr_mut(&mut self) -> &mut Screen {
        &mut self.curr
    }

    pub fn ctxt(&self) -> FrameCtxt<'_> {
        FrameCtxt {
            prev: if self.has_prev { Some(&self.prev) } else { None },
            curr: &self.curr,
        }
    }

    /// Promotes `curr` to `prev` once its frame has been written; the old
    /// `prev` becomes scratch space for the next frame.
    pub fn swap(&mut self) {
        mem::swap(&mut self.curr, &mut self.prev);
        self.has_prev = true;
    }
}
