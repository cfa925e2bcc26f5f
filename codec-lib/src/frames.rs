mod delta;
mod keyframe;

pub use self::{delta::*, keyframe::*};
use crate::error::CorruptReason;

/// Cursor over a chunk's payload.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn byte(&mut self) -> Result<u8, CorruptReason> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CorruptReason::PayloadUnderrun)?;

        self.pos += 1;
        Ok(byte)
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], CorruptReason> {
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(CorruptReason::PayloadUnderrun)?;

        self.pos += len;
        Ok(bytes)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CorruptReason> {
        let mut array = [0; N];
        array.copy_from_slice(self.bytes(N)?);
        Ok(array)
    }
}

/// Number of leading bytes equal to `data[0]`, up to `max`.
fn run_len(data: &[u8], max: usize) -> usize {
    match data.first() {
        Some(&first) => data.iter().take(max).take_while(|&&b| b == first).count(),
        None => 0,
    }
}

/// Number of leading positions where `prev` and `curr` agree, up to `max`.
fn match_len(prev: &[u8], curr: &[u8], max: usize) -> usize {
    prev.iter()
        .zip(curr)
        .take(max)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Writes `count` copies of `value` at `*pos`, advancing it.
fn fill(out: &mut [u8], pos: &mut usize, count: usize, value: u8) -> Result<(), CorruptReason> {
    out.get_mut(*pos..*pos + count)
        .ok_or(CorruptReason::FrameOverrun)?
        .fill(value);

    *pos += count;
    Ok(())
}

/// Copies `bytes` to `*pos`, advancing it.
fn copy(out: &mut [u8], pos: &mut usize, bytes: &[u8]) -> Result<(), CorruptReason> {
    out.get_mut(*pos..*pos + bytes.len())
        .ok_or(CorruptReason::FrameOverrun)?
        .copy_from_slice(bytes);

    *pos += bytes.len();
    Ok(())
}
