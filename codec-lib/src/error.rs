use crate::params::{HEIGHT, MIN_CHUNK_SIZE, WIDTH};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while encoding or decoding a stream.
///
/// None of these are recoverable: the current pass is aborted and the
/// error is reported as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("source frame is {width}x{height}, expected {}x{}", WIDTH, HEIGHT)]
    GeometryMismatch { width: u32, height: u32 },

    #[error("source frame has {pixels} pixels, expected {}", WIDTH * HEIGHT)]
    PixelCountMismatch { pixels: usize },

    #[error(
        "stream truncated at offset {offset}: needed {needed} bytes, but only {available} remain"
    )]
    TruncatedStream {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error(
        "chunk at offset {offset} declares size {size}, below the minimum of {}",
        MIN_CHUNK_SIZE
    )]
    MalformedChunk { offset: usize, size: u16 },

    #[error("chunk at offset {offset} is corrupt: {reason}")]
    CorruptChunk { offset: usize, reason: CorruptReason },

    #[error("encoded chunk of {size} bytes doesn't fit the size field")]
    ChunkTooLarge { size: usize },
}

/// Why a chunk's payload couldn't be decoded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CorruptReason {
    /// A token (or the palette) reads past the chunk's declared end.
    #[error("payload ends in the middle of a token")]
    PayloadUnderrun,

    /// Tokens expand past the end of the frame.
    #[error("tokens expand past the end of the frame")]
    FrameOverrun,
}
