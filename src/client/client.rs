// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cfg::config::Config,
    codec::{
        frame::{FrameDecoder, encode_frame},
        payload::{decode_response, encode_request},
    },
    models::message::{Request, Response},
};

/// Bounds one socket operation by the configured timeout and the kill
/// switch, whichever fires first.
async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(anyhow!("{label} cancelled")),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(anyhow!("{label} timeout")),
            }
        }
    }
}

struct ClientInner {
    stream: TcpStream,
    decoder: FrameDecoder,
    scratch: BytesMut,
}

/// One TCP session against the server.
///
/// The whole stream state sits behind one mutex, so calls are strictly
/// one in flight at a time; responses can therefore be matched to
/// requests by arrival order alone.
pub struct ClientConnection {
    inner: Mutex<ClientInner>,
    cfg: Config,
    cancel: CancellationToken,
}

impl ClientConnection {
    /// Connects to `addr`, retrying with a fixed backoff before giving
    /// up (5 attempts, 2 s pause by default).
    pub async fn connect(
        addr: &str,
        cfg: Config,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let attempts = cfg.runtime.connect_attempts.max(1);
        let mut attempt = 0;
        let stream = loop {
            attempt += 1;
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) if attempt < attempts => {
                    warn!(attempt, "connect to {addr} failed: {e}; retrying");
                    sleep(cfg.runtime.connect_backoff).await;
                },
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("giving up on {addr} after {attempt} attempts"));
                },
            }
        };
        stream.set_nodelay(true)?;
        debug!(%addr, "connected");

        let read_buffer = cfg.net.read_buffer;
        Ok(Self {
            inner: Mutex::new(ClientInner {
                stream,
                decoder: FrameDecoder::new(),
                scratch: BytesMut::with_capacity(read_buffer),
            }),
            cfg,
            cancel,
        })
    }

    /// Sends one request and waits for its response.
    pub async fn call(&self, request: &Request) -> Result<Response> {
        let mut guard = self.inner.lock().await;
        let ClientInner { stream, decoder, scratch } = &mut *guard;

        let frame = encode_frame(&encode_request(request))?;
        io_with_timeout(
            "write request",
            stream.write_all(&frame),
            self.cfg.runtime.io_timeout,
            &self.cancel,
        )
        .await?;

        loop {
            if let Some(payload) = decoder.next_payload()? {
                let response = decode_response(&payload)
                    .context("server sent an undecodable response")?;
                return Ok(response);
            }

            scratch.clear();
            let n = io_with_timeout(
                "read response",
                stream.read_buf(scratch),
                self.cfg.runtime.io_timeout,
                &self.cancel,
            )
            .await?;
            if n == 0 {
                bail!("server closed the connection");
            }
            decoder.extend(&scratch[..n]);
        }
    }

    /// Stops any in-flight I/O immediately.
    pub fn kill_now(&self) {
        self.cancel.cancel();
    }
}
