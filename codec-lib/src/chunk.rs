//! Chunk framing.
//!
//! ```text
//! +---------------------+
//! | size (u16 LE)       |  whole chunk, size field included
//! +---------------------+
//! | type flags (u8)     |  absent when size == 2
//! +---------------------+
//! | packed palette (32) |  present iff flags & 0x80
//! +---------------------+
//! | tokens              |  keyframe or delta token stream
//! +---------------------+
//! ```
//!
//! The stream ends with a size field of 0xFF00 or above.

use crate::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TypeFlags {
    /// A packed palette follows the flags byte.
    pub palette: bool,
    /// The tokens are keyframe tokens (otherwise delta tokens).
    pub keyframe: bool,
    /// First chunk of the stream.
    pub first: bool,
}

impl TypeFlags {
    const CHUNK: u8 = 0x01;
    const FIRST: u8 = 0x20;
    const KEYFRAME: u8 = 0x40;
    const PALETTE: u8 = 0x80;

    pub fn to_u8(self) -> u8 {
        let mut flags = Self::CHUNK;

        if self.palette {
            flags |= Self::PALETTE;
        }

        if self.keyframe {
            flags |= Self::KEYFRAME;
        }

        if self.first {
            flags |= Self::FIRST | Self::KEYFRAME;
        }

        flags
    }

    pub fn from_u8(v: u8) -> Self {
        Self {
            palette: v & Self::PALETTE != 0,
            keyframe: v & Self::KEYFRAME != 0,
            first: v & (Self::FIRST | Self::KEYFRAME) == Self::FIRST | Self::KEYFRAME,
        }
    }
}

/// One encoded frame, ready to be appended to a stream.
#[derive(Debug)]
pub struct Chunk {
    flags: TypeFlags,
    palette: Option<PackedPalette>,
    body: Vec<u8>,
}

impl Chunk {
    fn new(keyframe: bool, body: Vec<u8>) -> Self {
        Self {
            flags: TypeFlags {
                keyframe,
                ..Default::default()
            },
            palette: None,
            body,
        }
    }

    /// Marks this chunk as the stream's first one.
    pub fn into_first(mut self) -> Self {
        self.flags.first = true;
        self.flags.keyframe = true;
        self
    }

    pub fn with_palette(mut self, palette: Option<PackedPalette>) -> Self {
        self.flags.palette = palette.is_some();
        self.palette = palette;
        self
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn len(&self) -> usize {
        let palette = if self.palette.is_some() {
            PACKED_PALETTE_BYTES
        } else {
            0
        };

        SIZE_FIELD_BYTES + 1 + palette + self.body.len()
    }

    /// Appends this chunk to `out`, returning its size.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<u16> {
        let mark = out.len();

        out.extend([0, 0]);
        out.push(self.flags.to_u8());

        if let Some(palette) = &self.palette {
            out.extend_from_slice(palette.as_bytes());
        }

        out.extend_from_slice(&self.body);

        let size = out.len() - mark;

        match u16::try_from(size) {
            Ok(size16) if size16 < END_OF_STREAM => {
                out[mark..mark + SIZE_FIELD_BYTES].copy_from_slice(&size16.to_le_bytes());
                Ok(size16)
            }

            _ => {
                out.truncate(mark);
                Err(Error::ChunkTooLarge { size })
            }
        }
    }
}

impl From<KeyFrame> for Chunk {
    fn from(frame: KeyFrame) -> Self {
        Self::new(true, frame.serialize())
    }
}

impl From<DeltaFrame> for Chunk {
    fn from(frame: DeltaFrame) -> Self {
        Self::new(false, frame.serialize())
    }
}

pub fn write_end_of_stream(out: &mut Vec<u8>) {
    out.extend(END_OF_STREAM.to_le_bytes());
}

/// What sits at some offset of a stream.
#[derive(Debug, PartialEq, Eq)]
pub enum RawChunk<'a> {
    EndOfStream,

    Chunk {
        offset: usize,
        size: u16,
        /// Everything after the size field.
        payload: &'a [u8],
    },
}

/// Slices the chunk starting at `offset` out of `input`.
pub fn read_chunk(input: &[u8], offset: usize) -> Result<RawChunk<'_>> {
    let rest = input.get(offset..).unwrap_or_default();

    let size = match rest {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),

        _ => {
            return Err(Error::TruncatedStream {
                offset,
                needed: SIZE_FIELD_BYTES,
                available: rest.len(),
            })
        }
    };

    if size >= END_OF_STREAM {
        return Ok(RawChunk::EndOfStream);
    }

    if size < MIN_CHUNK_SIZE {
        return Err(Error::MalformedChunk { offset, size });
    }

    let payload = rest
        .get(SIZE_FIELD_BYTES..size as usize)
        .ok_or(Error::TruncatedStream {
            offset,
            needed: size as usize,
            available: rest.len(),
        })?;

    Ok(RawChunk::Chunk {
        offset,
        size,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chunk_sets_both_bits() {
        let flags = TypeFlags {
            palette: true,
            keyframe: false,
            first: true,
        };

        assert_eq!(flags.to_u8(), 0xE1);

        assert_eq!(
            TypeFlags::from_u8(0xE1),
            TypeFlags {
                palette: true,
                keyframe: true,
                first: true,
            }
        );
    }

    #[test]
    fn delta_without_palette_is_plain() {
        assert_eq!(TypeFlags::default().to_u8(), 0x01);
        assert_eq!(TypeFlags::from_u8(0x01), TypeFlags::default());

        assert_eq!(
            TypeFlags::from_u8(0x41),
            TypeFlags {
                palette: false,
                keyframe: true,
                first: false,
            }
        );
    }

    #[test]
    fn backpatches_size() {
        let mut out = vec![0xAA];
        let chunk = Chunk::new(false, vec![1, 2, 3]);

        assert_eq!(chunk.len(), 6);
        assert_eq!(chunk.write(&mut out), Ok(6));
        assert_eq!(out, vec![0xAA, 6, 0, 0x01, 1, 2, 3]);
    }

    #[test]
    fn palette_follows_flags() {
        let mut bytes = [0; PACKED_PALETTE_BYTES];
        bytes[0] = 0x12;
        bytes[31] = 0x0F;

        let chunk = Chunk::new(true, vec![0])
            .into_first()
            .with_palette(Some(PackedPalette::from_bytes(bytes)));

        let mut out = Vec::new();

        assert_eq!(chunk.write(&mut out), Ok(36));
        assert_eq!(&out[..4], &[36, 0, 0xE1, 0x12]);
        assert_eq!(out[34], 0x0F);
        assert_eq!(out[35], 0);
        assert_eq!(out.len(), chunk.len());
    }

    #[test]
    fn oversized_chunk_is_rolled_back() {
        let mut out = vec![7];
        let chunk = Chunk::new(true, vec![0; 0xFF00]);

        assert_eq!(
            chunk.write(&mut out),
            Err(Error::ChunkTooLarge { size: 0xFF03 })
        );
        assert_eq!(out, vec![7]);
    }

    #[test]
    fn reads_chunks_and_sentinel() {
        let input = [5, 0, 0x01, 9, 9, 2, 0, 0x00, 0xFF];

        assert_eq!(
            read_chunk(&input, 0),
            Ok(RawChunk::Chunk {
                offset: 0,
                size: 5,
                payload: &[0x01, 9, 9],
            })
        );

        assert_eq!(
            read_chunk(&input, 5),
            Ok(RawChunk::Chunk {
                offset: 5,
                size: 2,
                payload: &[],
            })
        );

        assert_eq!(read_chunk(&input, 7), Ok(RawChunk::EndOfStream));
    }

    #[test]
    fn any_size_above_sentinel_ends_the_stream() {
        assert_eq!(read_chunk(&[0x34, 0xFF], 0), Ok(RawChunk::EndOfStream));
    }

    #[test]
    fn reports_truncation() {
        assert_eq!(
            read_chunk(&[10, 0, 1, 2], 0),
            Err(Error::TruncatedStream {
                offset: 0,
                needed: 10,
                available: 4,
            })
        );

        assert_eq!(
            read_chunk(&[3, 0, 1, 9], 3),
            Err(Error::TruncatedStream {
                offset: 3,
                needed: 2,
                available: 1,
            })
        );

        assert_eq!(
            read_chunk(&[3, 0, 1], 3),
            Err(Error::TruncatedStream {
                offset: 3,
                needed: 2,
                available: 0,
            })
        );
    }

    #[test]
    fn rejects_undersized_chunk() {
        assert_eq!(
            read_chunk(&[1, 0, 0x01], 0),
            Err(Error::MalformedChunk { offset: 0, size: 1 })
        );
    }
}
