// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Primitive field codecs shared by every payload type.
//!
//! Scalars travel big-endian. Strings are a `u32` byte length followed by
//! UTF-8. Optional fields carry a one-byte present/absent marker. Sequences
//! carry a `u32` element count. Enum tags travel as their string names.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::models::person::{InvalidPerson, UnknownTag};

/// Longest string the decoder accepts; larger values cannot be legitimate
/// inside a 16 MiB frame.
const MAX_STR_LEN: usize = 16 * 1024 * 1024;

/// Per-message payload decode failure. The router answers these with a
/// uniform error response; the connection stays open.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload ended early: needed {need} more byte(s)")]
    UnexpectedEof { need: usize },
    #[error("string field is not valid UTF-8")]
    BadUtf8,
    #[error("string length {0} is implausible")]
    StringTooLong(usize),
    #[error("optional-field marker must be 0 or 1, got {0}")]
    BadMarker(u8),
    #[error(transparent)]
    BadTag(#[from] UnknownTag),
    #[error("timestamp {0} is out of range")]
    BadTimestamp(i64),
    #[error(transparent)]
    Invalid(#[from] InvalidPerson),
    #[error("{0} trailing byte(s) after payload")]
    TrailingBytes(usize),
}

fn need(buf: &impl Buf, n: usize) -> Result<(), DecodeError> {
    if buf.remaining() < n {
        Err(DecodeError::UnexpectedEof { need: n - buf.remaining() })
    } else {
        Ok(())
    }
}

pub fn get_u8(buf: &mut impl Buf) -> Result<u8, DecodeError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn get_u32(buf: &mut impl Buf) -> Result<u32, DecodeError> {
    need(buf, 4)?;
    Ok(buf.get_u32())
}

pub fn get_i32(buf: &mut impl Buf) -> Result<i32, DecodeError> {
    need(buf, 4)?;
    Ok(buf.get_i32())
}

pub fn get_i64(buf: &mut impl Buf) -> Result<i64, DecodeError> {
    need(buf, 8)?;
    Ok(buf.get_i64())
}

pub fn get_f64(buf: &mut impl Buf) -> Result<f64, DecodeError> {
    need(buf, 8)?;
    Ok(buf.get_f64())
}

pub fn put_string(out: &mut BytesMut, s: &str) {
    out.put_u32(s.len() as u32);
    out.put_slice(s.as_bytes());
}

pub fn get_string(buf: &mut impl Buf) -> Result<String, DecodeError> {
    let len = get_u32(buf)? as usize;
    if len > MAX_STR_LEN {
        return Err(DecodeError::StringTooLong(len));
    }
    need(buf, len)?;
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::BadUtf8)
}

/// Writes the present/absent marker and, when present, the value via `put`.
pub fn put_option<T: ?Sized>(
    out: &mut BytesMut,
    value: Option<&T>,
    put: impl FnOnce(&mut BytesMut, &T),
) {
    match value {
        Some(v) => {
            out.put_u8(1);
            put(out, v);
        },
        None => out.put_u8(0),
    }
}

/// Reads the present/absent marker and, when present, the value via `get`.
pub fn get_option<B: Buf, T>(
    buf: &mut B,
    get: impl FnOnce(&mut B) -> Result<T, DecodeError>,
) -> Result<Option<T>, DecodeError> {
    match get_u8(buf)? {
        0 => Ok(None),
        1 => get(buf).map(Some),
        other => Err(DecodeError::BadMarker(other)),
    }
}

/// Writes a `u32` count followed by each element via `put`.
pub fn put_seq<T>(
    out: &mut BytesMut,
    items: &[T],
    mut put: impl FnMut(&mut BytesMut, &T),
) {
    out.put_u32(items.len() as u32);
    for item in items {
        put(out, item);
    }
}

/// Reads a `u32` count followed by that many elements via `get`.
pub fn get_seq<B: Buf, T>(
    buf: &mut B,
    mut get: impl FnMut(&mut B) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let count = get_u32(buf)? as usize;
    // Guard allocation against a hostile count; real elements are at least
    // one byte each.
    let mut items = Vec::with_capacity(count.min(buf.remaining()));
    for _ in 0..count {
        items.push(get(buf)?);
    }
    Ok(items)
}
