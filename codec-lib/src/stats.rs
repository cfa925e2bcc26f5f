use crate::chunk::TypeFlags;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Stats {
    /// Stream size, sentinel included once the stream is finished.
    pub bytes: usize,
    pub frames: usize,
    /// Number of chunks carrying a palette.
    pub palettes: usize,
    /// Number of chunks per type flags byte; empty (repeat) chunks aren't
    /// counted here.
    pub chunks: BTreeMap<u8, usize>,
}

impl Stats {
    /// Accounts for one chunk of `size` bytes.
    pub fn record(&mut self, size: u16, flags: Option<TypeFlags>) {
        self.bytes += size as usize;
        self.frames += 1;

        if let Some(flags) = flags {
            *self.chunks.entry(flags.to_u8()).or_default() += 1;

            if flags.palette {
                self.palettes += 1;
            }
        }
    }

    /// Number of chunks that merely repeat the previous frame.
    pub fn repeats(&self) -> usize {
        self.frames - self.chunks.values().sum::<usize>()
    }
}
