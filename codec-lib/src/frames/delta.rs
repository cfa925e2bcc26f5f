//! Inter-frame encoding against the previously displayed screen.
//!
//! ```text
//! n (1..=127)           keep the next n bytes of the previous screen
//! 0x00, n, value        `value` repeated n times (no value byte if n == 0)
//! 0x80 | n, bytes[n]    n raw bytes
//! ```
//!
//! There's no terminator: the decoder stops once the whole frame has been
//! produced.

use super::{copy, fill, match_len, run_len, ByteReader};
use crate::prelude::*;

const LITERAL_FLAG: u8 = 0x80;
const MIN_SKIP: usize = 3;
const MAX_SKIP: usize = 127;
const MIN_RUN: usize = 4;
const MAX_RUN: usize = 255;
const MAX_LITERAL: usize = 127;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaToken<'a> {
    Skip { count: u8 },
    Run { count: u8, value: u8 },
    Literal { bytes: &'a [u8] },
}

impl<'a> DeltaToken<'a> {
    /// Number of frame bytes this token covers.
    pub fn len(&self) -> usize {
        match self {
            DeltaToken::Skip { count } => *count as usize,
            DeltaToken::Run { count, .. } => *count as usize,
            DeltaToken::Literal { bytes } => bytes.len(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match *self {
            DeltaToken::Skip { count } => {
                // 0 would read back as a run
                debug_assert!((1..=MAX_SKIP).contains(&(count as usize)));

                out.push(count);
            }

            DeltaToken::Run { count, value } => {
                out.push(0);
                out.push(count);

                if count > 0 {
                    out.push(value);
                }
            }

            DeltaToken::Literal { bytes } => {
                debug_assert!(bytes.len() <= MAX_LITERAL);

                out.push(LITERAL_FLAG | bytes.len() as u8);
                out.extend_from_slice(bytes);
            }
        }
    }

    pub fn read(reader: &mut ByteReader<'a>) -> Result<Self, CorruptReason> {
        let head = reader.byte()?;

        if head == 0 {
            let count = reader.byte()?;
            let value = if count > 0 { reader.byte()? } else { 0 };

            Ok(DeltaToken::Run { count, value })
        } else if head & LITERAL_FLAG != 0 {
            let count = head & !LITERAL_FLAG;

            Ok(DeltaToken::Literal {
                bytes: reader.bytes(count as usize)?,
            })
        } else {
            Ok(DeltaToken::Skip { count: head })
        }
    }

    fn apply(&self, out: &mut [u8], pos: &mut usize) -> Result<(), CorruptReason> {
        match *self {
            DeltaToken::Skip { count } => {
                let end = *pos + count as usize;

                if end > out.len() {
                    return Err(CorruptReason::FrameOverrun);
                }

                *pos = end;
                Ok(())
            }

            DeltaToken::Run { count, value } => fill(out, pos, count as usize, value),
            DeltaToken::Literal { bytes } => copy(out, pos, bytes),
        }
    }
}

/// Whether a literal should stop at the beginning of `curr`, handing over
/// to a run or a skip.
fn ends_literal(prev: &[u8], curr: &[u8]) -> bool {
    if run_len(curr, MIN_RUN) >= MIN_RUN {
        return true;
    }

    let skip = match_len(prev, curr, MIN_SKIP);

    skip >= MIN_SKIP || skip == curr.len()
}

/// Splits the difference between `prev` and `curr` into delta tokens that,
/// applied over `prev`, reproduce `curr`.
pub fn delta_tokens<'a>(prev: &[u8], curr: &'a [u8]) -> Vec<DeltaToken<'a>> {
    debug_assert_eq!(prev.len(), curr.len());

    let mut tokens = Vec::new();
    let mut at = 0;

    while curr.len() - at >= 2 {
        let (prev, curr) = (&prev[at..], &curr[at..]);
        let skip = match_len(prev, curr, MAX_SKIP);

        let token = if skip == curr.len() || skip >= MIN_SKIP {
            DeltaToken::Skip { count: skip as u8 }
        } else {
            let run = run_len(curr, MAX_RUN);

            if run >= MIN_RUN {
                DeltaToken::Run {
                    count: run as u8,
                    value: curr[0],
                }
            } else {
                let max = curr.len().min(MAX_LITERAL);

                let len = (1..max)
                    .find(|&i| ends_literal(&prev[i..], &curr[i..]))
                    .unwrap_or(max);

                // A literal of one or two unchanged bytes is cheaper as a skip
                if len <= 2 && prev[..len] == curr[..len] {
                    DeltaToken::Skip { count: len as u8 }
                } else {
                    DeltaToken::Literal {
                        bytes: &curr[..len],
                    }
                }
            }
        };

        at += token.len();
        tokens.push(token);
    }

    if at < curr.len() {
        if prev[at] == curr[at] {
            tokens.push(DeltaToken::Skip { count: 1 });
        } else {
            tokens.push(DeltaToken::Literal {
                bytes: &curr[at..],
            });
        }
    }

    tokens
}

#[derive(Debug)]
pub struct DeltaFrame {
    body: Vec<u8>,
}

impl DeltaFrame {
    pub fn encode(prev: &Screen, curr: &Screen) -> Self {
        let mut body = Vec::new();

        for token in delta_tokens(prev.as_bytes(), curr.as_bytes()) {
            token.write(&mut body);
        }

        Self { body }
    }

    pub fn serialize(self) -> Vec<u8> {
        self.body
    }
}

impl Frame for DeltaFrame {
    fn build(ctxt: FrameCtxt<'_>) -> Option<Self> {
        Some(Self::encode(ctxt.prev?, ctxt.curr))
    }

    fn decode(payload: &[u8], screen: &mut Screen) -> Result<usize, CorruptReason> {
        let mut reader = ByteReader::new(payload);
        let out = screen.as_bytes_mut();
        let mut pos = 0;

        while pos < out.len() {
            DeltaToken::read(&mut reader)?.apply(out, &mut pos)?;
        }

        Ok(reader.pos())
    }
}
