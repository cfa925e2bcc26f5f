//! Intra-frame encoding: runs of at least 3 equal bytes become run tokens,
//! everything else is copied verbatim, and a zero byte ends the frame.
//!
//! ```text
//! 0x00                  end of frame
//! 0x80 | n, value       `value` repeated n times
//! n, bytes[n]           n raw bytes (1..=127)
//! ```

use super::{copy, fill, run_len, ByteReader};
use crate::prelude::*;

const RUN_FLAG: u8 = 0x80;
const MIN_RUN: usize = 3;
const MAX_RUN: usize = 127;
const MAX_LITERAL: usize = 127;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyToken<'a> {
    End,
    Run { count: u8, value: u8 },
    Literal { bytes: &'a [u8] },
}

impl<'a> KeyToken<'a> {
    /// Number of frame bytes this token produces.
    pub fn len(&self) -> usize {
        match self {
            KeyToken::End => 0,
            KeyToken::Run { count, .. } => *count as usize,
            KeyToken::Literal { bytes } => bytes.len(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match *self {
            KeyToken::End => {
                out.push(0);
            }

            KeyToken::Run { count, value } => {
                debug_assert!(count as usize <= MAX_RUN);

                out.push(RUN_FLAG | count);

                if count > 0 {
                    out.push(value);
                }
            }

            KeyToken::Literal { bytes } => {
                debug_assert!((1..=MAX_LITERAL).contains(&bytes.len()));

                out.push(bytes.len() as u8);
                out.extend_from_slice(bytes);
            }
        }
    }

    pub fn read(reader: &mut ByteReader<'a>) -> Result<Self, CorruptReason> {
        let head = reader.byte()?;

        if head == 0 {
            Ok(KeyToken::End)
        } else if head & RUN_FLAG != 0 {
            let count = head & !RUN_FLAG;

            // A zero-length run carries no value byte
            let value = if count > 0 { reader.byte()? } else { 0 };

            Ok(KeyToken::Run { count, value })
        } else {
            Ok(KeyToken::Literal {
                bytes: reader.bytes(head as usize)?,
            })
        }
    }

    fn apply(&self, out: &mut [u8], pos: &mut usize) -> Result<(), CorruptReason> {
        match *self {
            KeyToken::End => Ok(()),
            KeyToken::Run { count, value } => fill(out, pos, count as usize, value),
            KeyToken::Literal { bytes } => copy(out, pos, bytes),
        }
    }
}

/// Splits `data` into keyframe tokens, terminated with [`KeyToken::End`].
pub fn key_tokens(data: &[u8]) -> Vec<KeyToken<'_>> {
    let mut tokens = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let token = if rest.len() < MIN_RUN {
            KeyToken::Literal { bytes: rest }
        } else {
            let run = run_len(rest, MAX_RUN);

            if run >= MIN_RUN {
                KeyToken::Run {
                    count: run as u8,
                    value: rest[0],
                }
            } else {
                let max = rest.len().min(MAX_LITERAL);

                let len = (1..max)
                    .find(|&at| run_len(&rest[at..], MIN_RUN) >= MIN_RUN)
                    .unwrap_or(max);

                KeyToken::Literal {
                    bytes: &rest[..len],
                }
            }
        };

        rest = &rest[token.len()..];
        tokens.push(token);
    }

    tokens.push(KeyToken::End);
    tokens
}

#[derive(Debug)]
pub struct KeyFrame {
    body: Vec<u8>,
}

impl KeyFrame {
    pub fn encode(curr: &Screen) -> Self {
        let mut body = Vec::new();

        for token in key_tokens(curr.as_bytes()) {
            token.write(&mut body);
        }

        Self { body }
    }

    pub fn serialize(self) -> Vec<u8> {
        self.body
    }
}

impl Frame for KeyFrame {
    fn build(ctxt: FrameCtxt<'_>) -> Option<Self> {
        Some(Self::encode(ctxt.curr))
    }

    fn decode(payload: &[u8], screen: &mut Screen) -> Result<usize, CorruptReason> {
        let mut reader = ByteReader::new(payload);
        let out = screen.as_bytes_mut();
        let mut pos = 0;

        loop {
            match KeyToken::read(&mut reader)? {
                KeyToken::End => return Ok(reader.pos()),
                token => token.apply(out, &mut pos)?,
            }
        }
    }
}
