use crate::prelude::*;

/// A way of encoding one screen into a chunk's token stream, together with
/// its inverse.
pub trait Frame
where
    Self: Sized,
    Chunk: From<Self>,
{
    /// Encodes `ctxt.curr`; returns `None` when this kind of frame can't
    /// be built out of the given context.
    fn build(ctxt: FrameCtxt<'_>) -> Option<Self>;

    /// Applies the token stream at the beginning of `payload` to `screen`,
    /// returning how many payload bytes were consumed.
    fn decode(payload: &[u8], screen: &mut Screen) -> Result<usize, CorruptReason>;

    fn build_chunk(ctxt: FrameCtxt<'_>) -> Option<Chunk> {
        Self::build(ctxt).map(Chunk::from)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct FrameCtxt<'a> {
    pub prev: Option<&'a Screen>,
    pub curr: &'a Screen,
}
