// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Length-prefixed framing of opaque payloads over a byte stream.
//!
//! Wire grammar for a single message:
//!
//! ```text
//! +----------------+------------------------+
//! | length L (u32) |  payload (L bytes)     |
//! |   big-endian   |                        |
//! +----------------+------------------------+
//! ```
//!
//! The decoder is a streaming state machine; partial data stays buffered
//! between chunks and an arbitrary chunking of the input yields the same
//! sequence of payloads.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Length-prefix size on the wire.
pub const LEN_PREFIX: usize = 4;

/// Upper bound on a single payload. Anything larger is a protocol error
/// and fatal to the connection.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Fatal framing failures. Unlike payload decode errors these close the
/// connection: once the length prefix cannot be trusted there is no way
/// to resynchronise the stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length {0} exceeds the {MAX_FRAME_LEN} byte limit")]
    TooLarge(usize),
    #[error("stream ended mid-frame ({have}/{need} bytes)")]
    Truncated { have: usize, need: usize },
}

#[derive(Debug)]
enum DecodeState {
    /// Accumulating the 4-byte length prefix.
    NeedLen,
    /// Accumulating `len` body bytes.
    NeedBody { len: usize },
}

/// Streaming frame decoder. One instance per connection; state is never
/// shared.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    buf: BytesMut,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::NeedLen,
            buf: BytesMut::with_capacity(LEN_PREFIX),
        }
    }

    /// Feeds a chunk of raw bytes into the decoder.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete payload, if the buffer holds one.
    ///
    /// Call in a loop after `extend`: a single chunk may complete zero or
    /// more frames.
    pub fn next_payload(&mut self) -> Result<Option<Bytes>, FrameError> {
        loop {
            match self.state {
                DecodeState::NeedLen => {
                    if self.buf.len() < LEN_PREFIX {
                        return Ok(None);
                    }
                    let len = self.buf.get_u32() as usize;
                    if len > MAX_FRAME_LEN {
                        return Err(FrameError::TooLarge(len));
                    }
                    self.buf.reserve(len);
                    self.state = DecodeState::NeedBody { len };
                },
                DecodeState::NeedBody { len } => {
                    if self.buf.len() < len {
                        return Ok(None);
                    }
                    let payload = self.buf.split_to(len).freeze();
                    self.state = DecodeState::NeedLen;
                    return Ok(Some(payload));
                },
            }
        }
    }

    /// Checks the end-of-stream invariant: EOF is only legal on a frame
    /// boundary with nothing buffered.
    pub fn finish(&self) -> Result<(), FrameError> {
        match self.state {
            DecodeState::NeedLen if self.buf.is_empty() => Ok(()),
            DecodeState::NeedLen => Err(FrameError::Truncated {
                have: self.buf.len(),
                need: LEN_PREFIX,
            }),
            DecodeState::NeedBody { len } => Err(FrameError::Truncated {
                have: self.buf.len(),
                need: len,
            }),
        }
    }
}

/// Frames a payload into a single contiguous byte sequence ready for the
/// socket. Writers handle partial writes; the encoder does not.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let mut out = BytesMut::with_capacity(LEN_PREFIX + payload.len());
    out.put_u32(payload.len() as u32);
    out.put_slice(payload);
    Ok(out.freeze())
}
