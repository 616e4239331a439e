// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Full-pipeline scenarios over a loopback TCP connection: framed wire
//! protocol, payload codec, router, commands and write-through
//! collection, with only the SQL gateway replaced by an in-memory
//! double.

use anyhow::Result;
use bytes::BytesMut;
use roster_rs::{
    codec::{
        frame::{FrameDecoder, encode_frame},
        payload::{decode_response, encode_request},
    },
    models::message::{Request, Response},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    integration_tests::common::{connect, creds, spawn_server},
    support::draft_person,
};

#[tokio::test]
async fn happy_add_then_show() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;

    let resp = client
        .call(&Request::new("register", creds("alice", "pw")))
        .await?;
    assert_eq!(resp.message, "Registered user 'alice'.");

    let add = Request::new("add", creds("alice", "pw"))
        .with_persons(vec![draft_person("A", 170, 70)]);
    let resp = client.call(&add).await?;
    assert_eq!(resp.message, "Person added.");

    let resp = client.call(&Request::new("show", creds("alice", "pw"))).await?;
    assert_eq!(resp.persons.len(), 1);
    let person = &resp.persons[0];
    assert_eq!(person.id, 1);
    assert_eq!(person.owner_id, 1);
    assert_eq!(person.name, "A");
    assert!(person.creation_date.is_some());

    server.cancel.cancel();
    server.handle.await??;
    Ok(())
}

#[tokio::test]
async fn wrong_password_changes_nothing() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;

    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    let add = Request::new("add", creds("alice", "wrong"))
        .with_persons(vec![draft_person("A", 170, 70)]);
    let resp = client.call(&add).await?;
    assert_eq!(resp.message, "Authorization failed.");

    let resp = client.call(&Request::new("show", creds("alice", "pw"))).await?;
    assert!(resp.persons.is_empty());
    Ok(())
}

async fn read_one_response(
    stream: &mut TcpStream,
    decoder: &mut FrameDecoder,
) -> Result<Response> {
    loop {
        if let Some(payload) = decoder.next_payload()? {
            return Ok(decode_response(&payload)?);
        }
        let mut chunk = BytesMut::with_capacity(4096);
        let n = stream.read_buf(&mut chunk).await?;
        anyhow::ensure!(n > 0, "server closed the connection");
        decoder.extend(&chunk[..n]);
    }
}

#[tokio::test]
async fn pipelined_requests_answer_in_order() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    // Three requests in one write, no waiting in between.
    let requests = [
        Request::new("add", creds("alice", "pw"))
            .with_persons(vec![draft_person("P1", 200, 80)]),
        Request::new("add", creds("alice", "pw"))
            .with_persons(vec![draft_person("P2", 150, 80)]),
        Request::new("show", creds("alice", "pw")),
    ];
    let mut wire = Vec::new();
    for request in &requests {
        wire.extend_from_slice(&encode_frame(&encode_request(request))?);
    }

    let mut stream = TcpStream::connect(&server.addr).await?;
    stream.write_all(&wire).await?;

    let mut decoder = FrameDecoder::new();
    let first = read_one_response(&mut stream, &mut decoder).await?;
    let second = read_one_response(&mut stream, &mut decoder).await?;
    let third = read_one_response(&mut stream, &mut decoder).await?;

    assert_eq!(first.message, "Person added.");
    assert_eq!(second.message, "Person added.");
    let names: Vec<_> = third.persons.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["P1", "P2"]);
    Ok(())
}

#[tokio::test]
async fn remove_greater_by_bmi() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    // BMIs: P1 = 0.0020, P2 = 0.0036, P3 = 0.0024.
    for (name, h, w) in [("P1", 200, 80), ("P2", 150, 80), ("P3", 170, 70)] {
        client
            .call(
                &Request::new("add", creds("alice", "pw"))
                    .with_persons(vec![draft_person(name, h, w)]),
            )
            .await?;
    }

    let reference = draft_person("P3", 170, 70);
    let resp = client
        .call(
            &Request::new("remove_greater", creds("alice", "pw"))
                .with_persons(vec![reference]),
        )
        .await?;
    assert_eq!(resp.message, "Removed 1 person(s).");

    let resp = client.call(&Request::new("show", creds("alice", "pw"))).await?;
    let names: Vec<_> = resp.persons.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["P1", "P3"]);
    Ok(())
}

#[tokio::test]
async fn unknown_command_gets_the_help_hint() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    let resp = client.call(&Request::new("floop", creds("alice", "pw"))).await?;
    assert_eq!(resp.message, "command 'floop' not found, type 'help' for help");
    Ok(())
}

#[tokio::test]
async fn malformed_payload_leaves_the_connection_usable() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    let mut stream = TcpStream::connect(&server.addr).await?;
    let mut decoder = FrameDecoder::new();

    // Valid frame, garbage payload.
    stream.write_all(&encode_frame(&[0xde, 0xad, 0xbe, 0xef])?).await?;
    let resp = read_one_response(&mut stream, &mut decoder).await?;
    assert_eq!(resp.message, "malformed request");

    // Same connection keeps working.
    let show = Request::new("show", creds("alice", "pw"));
    stream
        .write_all(&encode_frame(&encode_request(&show))?)
        .await?;
    let resp = read_one_response(&mut stream, &mut decoder).await?;
    assert!(resp.message.is_empty());
    assert!(resp.persons.is_empty());
    Ok(())
}

#[tokio::test]
async fn script_contents_come_back_in_the_script_field() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    let dir = std::env::temp_dir().join("roster-rs-e2e-script");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join("batch.txt");
    tokio::fs::write(&path, "show\nsum_of_height\n").await?;

    let req = Request::new("execute_script", creds("alice", "pw"))
        .with_args(vec![path.to_string_lossy().into_owned()]);
    let resp = client.call(&req).await?;
    assert_eq!(resp.script, "show\nsum_of_height\n");
    Ok(())
}

#[tokio::test]
async fn shutdown_drains_cleanly() -> Result<()> {
    let server = spawn_server().await?;
    let client = connect(&server).await?;
    client.call(&Request::new("register", creds("alice", "pw"))).await?;

    server.cancel.cancel();
    server.handle.await??;

    // The cancelled server must have hung up on us.
    let resp = client.call(&Request::new("show", creds("alice", "pw"))).await;
    assert!(resp.is_err());
    Ok(())
}
