// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Field-by-field payload schema for `Request` and `Response`.
//!
//! Both sides encode and decode the same fixed field order; no type tag is
//! carried because the direction of travel fixes the payload type. The
//! round-trip invariant `decode(encode(x)) = x` holds for every well-typed
//! value, and garbage input yields a `DecodeError` instead of tearing the
//! connection down.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, NaiveDateTime};

use crate::{
    codec::wire::{
        self, DecodeError, get_f64, get_i32, get_i64, get_option, get_seq,
        get_string,
    },
    models::{
        message::{Request, Response},
        person::{Coordinates, Location, Person},
        user::Credentials,
    },
};

fn put_timestamp(out: &mut BytesMut, ts: &NaiveDateTime) {
    out.put_i64(ts.and_utc().timestamp_millis());
}

fn get_timestamp(buf: &mut impl Buf) -> Result<NaiveDateTime, DecodeError> {
    let millis = get_i64(buf)?;
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or(DecodeError::BadTimestamp(millis))
}

pub fn put_person(out: &mut BytesMut, p: &Person) {
    out.put_i32(p.id);
    out.put_i64(p.owner_id);
    wire::put_string(out, &p.name);
    out.put_i32(p.coordinates.x);
    out.put_i32(p.coordinates.y);
    wire::put_option(out, p.creation_date.as_ref(), put_timestamp);
    out.put_i32(p.height);
    out.put_i32(p.weight);
    wire::put_string(out, p.hair_color.as_str());
    wire::put_string(out, p.nationality.as_str());
    out.put_f64(p.location.x);
    wire::put_option(out, p.location.y.as_ref(), |o, v| o.put_f64(*v));
    wire::put_option(out, p.location.name.as_deref(), |o, v| {
        wire::put_string(o, v)
    });
}

pub fn get_person(buf: &mut impl Buf) -> Result<Person, DecodeError> {
    let person = Person {
        id: get_i32(buf)?,
        owner_id: get_i64(buf)?,
        name: get_string(buf)?,
        coordinates: Coordinates { x: get_i32(buf)?, y: get_i32(buf)? },
        creation_date: get_option(buf, get_timestamp)?,
        height: get_i32(buf)?,
        weight: get_i32(buf)?,
        hair_color: get_string(buf)?.parse()?,
        nationality: get_string(buf)?.parse()?,
        location: Location {
            x: get_f64(buf)?,
            y: get_option(buf, get_f64)?,
            name: get_option(buf, get_string)?,
        },
    };
    person.validate()?;
    Ok(person)
}

fn put_credentials(out: &mut BytesMut, c: &Credentials) {
    wire::put_string(out, &c.username);
    wire::put_string(out, &c.password);
}

fn get_credentials(buf: &mut impl Buf) -> Result<Credentials, DecodeError> {
    Ok(Credentials {
        username: get_string(buf)?,
        password: get_string(buf)?,
    })
}

fn ensure_drained(buf: &impl Buf) -> Result<(), DecodeError> {
    if buf.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(buf.remaining()));
    }
    Ok(())
}

pub fn encode_request(req: &Request) -> Bytes {
    let mut out = BytesMut::with_capacity(64);
    wire::put_string(&mut out, &req.command);
    wire::put_seq(&mut out, &req.args, |o, a| wire::put_string(o, a));
    wire::put_seq(&mut out, &req.persons, put_person);
    wire::put_option(&mut out, req.credentials.as_ref(), put_credentials);
    out.freeze()
}

pub fn decode_request(payload: &[u8]) -> Result<Request, DecodeError> {
    let mut buf = payload;
    let req = Request {
        command: get_string(&mut buf)?,
        args: get_seq(&mut buf, |b| get_string(b))?,
        persons: get_seq(&mut buf, |b| get_person(b))?,
        credentials: get_option(&mut buf, get_credentials)?,
    };
    ensure_drained(&buf)?;
    Ok(req)
}

pub fn encode_response(resp: &Response) -> Bytes {
    let mut out = BytesMut::with_capacity(64);
    wire::put_string(&mut out, &resp.message);
    wire::put_seq(&mut out, &resp.persons, put_person);
    wire::put_string(&mut out, &resp.script);
    out.freeze()
}

pub fn decode_response(payload: &[u8]) -> Result<Response, DecodeError> {
    let mut buf = payload;
    let resp = Response {
        message: get_string(&mut buf)?,
        persons: get_seq(&mut buf, |b| get_person(b))?,
        script: get_string(&mut buf)?,
    };
    ensure_drained(&buf)?;
    Ok(resp)
}
