use crate::frames::ByteReader;
use crate::prelude::*;
use log::{debug, info, warn};

/// Where a decoded frame came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    pub offset: usize,
    pub size: u16,
    /// `None` for an empty chunk, which repeats the previous frame.
    pub flags: Option<TypeFlags>,
}

#[derive(Debug)]
pub struct DecodedFrame<'a> {
    pub index: usize,
    pub chunk: ChunkInfo,
    pub palette: &'a Palette,
    pub screen: &'a Screen,
}

/// Walks a stream chunk by chunk, applying each one to a single display
/// screen.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
    screen: Screen,
    palette: Palette,
    frames: usize,
    done: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            screen: Screen::new(),
            palette: Palette::default(),
            frames: 0,
            done: false,
        }
    }

    /// Number of frames decoded so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Decodes the next chunk; returns `None` once the end-of-stream marker
    /// has been reached.
    ///
    /// After an error the decoder is done and keeps returning `None`.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>> {
        if self.done {
            return Ok(None);
        }

        let chunk = match self.step() {
            Ok(Some(chunk)) => chunk,

            Ok(None) => {
                self.done = true;
                info!("End of stream after {} frame(s)", self.frames);
                return Ok(None);
            }

            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };

        self.frames += 1;

        Ok(Some(DecodedFrame {
            index: self.frames - 1,
            chunk,
            palette: &self.palette,
            screen: &self.screen,
        }))
    }

    fn step(&mut self) -> Result<Option<ChunkInfo>> {
        let (offset, size, payload) = match read_chunk(self.input, self.offset)? {
            RawChunk::EndOfStream => return Ok(None),

            RawChunk::Chunk {
                offset,
                size,
                payload,
            } => (offset, size, payload),
        };

        self.offset += size as usize;

        let flags = if payload.is_empty() {
            None
        } else {
            Some(self.apply(offset, payload)?)
        };

        debug!(
            "Chunk #{} at {:#06x}: {} bytes, flags {:?}",
            self.frames, offset, size, flags
        );

        Ok(Some(ChunkInfo {
            offset,
            size,
            flags,
        }))
    }

    fn apply(&mut self, offset: usize, payload: &[u8]) -> Result<TypeFlags> {
        let corrupt = |reason| Error::CorruptChunk { offset, reason };
        let mut reader = ByteReader::new(payload);
        let flags = TypeFlags::from_u8(reader.byte().map_err(corrupt)?);

        if flags.palette {
            let palette = reader.array().map_err(corrupt)?;
            self.palette = PackedPalette::from_bytes(palette).unpack();
        }

        let tokens = &payload[reader.pos()..];

        let used = if flags.keyframe {
            KeyFrame::decode(tokens, &mut self.screen)
        } else {
            DeltaFrame::decode(tokens, &mut self.screen)
        }
        .map_err(corrupt)?;

        if used < tokens.len() {
            warn!(
                "Chunk at {:#06x} has {} unused trailing byte(s)",
                offset,
                tokens.len() - used
            );
        }

        Ok(flags)
    }
}
