mod chunk;
mod decoder;
mod error;
mod frame;
mod frames;
mod palette;
mod params;
mod screen;
mod sink;
mod source;
mod stats;

pub use self::{
    chunk::*, decoder::*, error::*, frame::*, frames::*, palette::*, params::*, screen::*,
    sink::*, source::*, stats::*,
};
use anyhow::Context;
use log::{debug, info};

mod prelude {
    pub(crate) use crate::{
        chunk::*,
        decoder::*,
        error::*,
        frame::*,
        frames::{DeltaFrame, KeyFrame},
        palette::*,
        params::*,
        screen::*,
        source::SourceFrame,
    };
}

use self::prelude::*;

/// Builds a stream out of consecutive frames: the first one is a keyframe,
/// every following one is a delta against its predecessor.
#[derive(Debug, Default)]
pub struct Encoder {
    stats: Stats,
    buffer: Vec<u8>,
    screens: FrameBuffers,
    palette: Option<PackedPalette>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, frame: &SourceFrame) -> Result<()> {
        check_geometry(frame.width, frame.height)?;
        self.screens.curr_mut().load_indices(&frame.pixels)?;

        let ctxt = self.screens.ctxt();

        let chunk = match DeltaFrame::build_chunk(ctxt) {
            Some(chunk) => chunk,
            None => Chunk::from(KeyFrame::encode(ctxt.curr)).into_first(),
        };

        let palette = frame.palette.pack();
        let palette_changed = self.palette != Some(palette);
        let chunk = chunk.with_palette(Some(palette).filter(|_| palette_changed));
        let size = chunk.write(&mut self.buffer)?;

        debug!(
            "Frame #{}: chunk {:#04x}, {} bytes",
            self.stats.frames,
            chunk.flags().to_u8(),
            size
        );

        self.stats.record(size, Some(chunk.flags()));

        if palette_changed {
            self.palette = Some(palette);
        }

        self.screens.swap();

        Ok(())
    }

    /// Size of the stream so far, without the end-of-stream marker.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn finish(mut self) -> (Stats, Vec<u8>) {
        write_end_of_stream(&mut self.buffer);
        self.stats.bytes += SIZE_FIELD_BYTES;

        info!(
            "Encoded {} frame(s) into {} bytes ({} palette change(s))",
            self.stats.frames, self.stats.bytes, self.stats.palettes
        );

        (self.stats, self.buffer)
    }
}

pub fn encode<'a>(frames: impl IntoIterator<Item = &'a SourceFrame>) -> Result<(Stats, Vec<u8>)> {
    let mut encoder = Encoder::new();

    for frame in frames {
        encoder.add(frame)?;
    }

    Ok(encoder.finish())
}

/// Decodes a whole stream into `sink`.
pub fn decode<S: Sink>(input: &[u8], mut sink: S) -> anyhow::Result<S::Output> {
    let mut decoder = Decoder::new(input);

    while let Some(frame) = decoder.next_frame()? {
        sink.add(&frame)
            .with_context(|| format!("Couldn't write frame #{}", frame.index))?;
    }

    sink.finish().context("Couldn't finish output")
}
