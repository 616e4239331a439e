// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-connection plumbing.
//!
//! Each accepted socket gets exactly one framed read loop and one writer
//! task. The read loop decodes requests in wire order and routes them
//! one at a time, so responses are emitted in request order without any
//! extra bookkeeping. The writer drains a bounded FIFO of encoded
//! frames; when the loop ends, the sender drops and the writer flushes
//! whatever is left before closing.

use std::{net::SocketAddr, sync::Arc};

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cfg::config::NetConfig,
    codec::{
        frame::{FrameDecoder, encode_frame},
        payload::{decode_request, encode_response},
    },
    models::message::Response,
    router::Router,
    server::pools::IoPools,
};

/// Dependencies shared by every connection, built once at boot.
pub struct ConnCtx {
    pub router: Arc<Router>,
    pub pools: Arc<IoPools>,
    pub net: NetConfig,
}

/// Runs one client connection to completion. Returns when the peer
/// closes, a framing error poisons the stream, the pools shed us, or
/// shutdown is requested.
pub async fn serve_connection(
    ctx: Arc<ConnCtx>,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, "set_nodelay failed: {e}");
    }
    let (read_half, write_half) = stream.into_split();

    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(ctx.net.outbound_queue);

    let writer = tokio::spawn(write_loop(
        Arc::clone(&ctx),
        write_half,
        outbound_rx,
        cancel.clone(),
        peer,
    ));

    read_loop(&ctx, read_half, outbound_tx, &cancel, peer).await;

    // The sender is gone; the writer flushes the remaining queue and exits.
    if let Err(e) = writer.await {
        warn!(%peer, "writer task failed: {e}");
    }
    debug!(%peer, "connection closed");
}

async fn read_loop(
    ctx: &ConnCtx,
    mut read_half: OwnedReadHalf,
    outbound: mpsc::Sender<Bytes>,
    cancel: &CancellationToken,
    peer: SocketAddr,
) {
    let mut decoder = FrameDecoder::new();
    let mut scratch = BytesMut::with_capacity(ctx.net.read_buffer);

    loop {
        scratch.clear();
        let n = select! {
            _ = cancel.cancelled() => return,
            read = read_half.read_buf(&mut scratch) => match read {
                Ok(n) => n,
                Err(e) => {
                    warn!(%peer, "socket read failed: {e}");
                    return;
                },
            },
        };

        if n == 0 {
            if let Err(e) = decoder.finish() {
                warn!(%peer, "peer closed mid-frame: {e}");
            }
            return;
        }
        decoder.extend(&scratch[..n]);

        loop {
            let payload = match decoder.next_payload() {
                Ok(Some(payload)) => payload,
                Ok(None) => break,
                // Framing is unrecoverable; close.
                Err(e) => {
                    warn!(%peer, "framing error: {e}");
                    return;
                },
            };

            // One permit spans decode, routing and response enqueue.
            let Ok(_permit) = ctx.pools.read.admit() else {
                return;
            };

            let response = match decode_request(&payload) {
                Ok(request) => {
                    debug!(%peer, command = %request.command, "request");
                    ctx.router.route(&request).await
                },
                Err(e) => {
                    debug!(%peer, "undecodable payload: {e}");
                    Response::text("malformed request")
                },
            };

            let frame = match encode_frame(&encode_response(&response)) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%peer, "response exceeds frame limit: {e}");
                    return;
                },
            };
            if outbound.send(frame).await.is_err() {
                // Writer died; nothing left to respond to.
                return;
            }
        }
    }
}

async fn write_loop(
    ctx: Arc<ConnCtx>,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
    peer: SocketAddr,
) {
    loop {
        let frame = select! {
            _ = cancel.cancelled() => {
                // Shutdown: flush what is already queued, then stop.
                outbound.close();
                match outbound.recv().await {
                    Some(frame) => frame,
                    None => break,
                }
            },
            next = outbound.recv() => match next {
                Some(frame) => frame,
                None => break,
            },
        };

        let Ok(_permit) = ctx.pools.write.admit() else {
            return;
        };
        // write_all resumes partial writes until the frame is on the wire.
        if let Err(e) = write_half.write_all(&frame).await {
            debug!(%peer, "socket write failed: {e}");
            return;
        }
    }

    let _ = write_half.shutdown().await;
}
