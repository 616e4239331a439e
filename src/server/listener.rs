// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The single acceptor.
//!
//! One task owns the listening socket; accepted connections run as
//! independent tasks and register their cancellation handle in a shared
//! map so shutdown can reach every live session.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::{net::TcpListener, select, time::{Instant, sleep}};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cfg::config::Config,
    router::Router,
    server::{
        connection::{ConnCtx, serve_connection},
        pools::IoPools,
    },
};

pub struct Listener {
    socket: TcpListener,
    ctx: Arc<ConnCtx>,
    connections: Arc<DashMap<u64, CancellationToken>>,
    shutdown_grace: Duration,
}

impl Listener {
    /// Binds the configured port and wires up the shared connection
    /// context. Serving starts with `run`.
    pub async fn bind(
        cfg: &Config,
        router: Arc<Router>,
        pools: Arc<IoPools>,
    ) -> Result<Self> {
        let addr = cfg.bind_addr();
        let socket = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        Ok(Self {
            socket,
            ctx: Arc::new(ConnCtx {
                router,
                pools,
                net: cfg.net.clone(),
            }),
            connections: Arc::new(DashMap::new()),
            shutdown_grace: cfg.runtime.shutdown_grace,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("listener has no local address")
    }

    /// Accept loop. Returns after `cancel` fires and the live connections
    /// drained (or the grace period ran out).
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let next_id = AtomicU64::new(0);

        loop {
            let accepted = select! {
                _ = cancel.cancelled() => break,
                accepted = self.socket.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    // Transient accept failures (fd exhaustion and the
                    // like) must not kill the acceptor.
                    warn!("accept failed: {e}");
                    sleep(Duration::from_millis(50)).await;
                    continue;
                },
            };

            let id = next_id.fetch_add(1, Ordering::Relaxed);
            let conn_cancel = cancel.child_token();
            self.connections.insert(id, conn_cancel.clone());
            info!(%peer, id, "client connected");

            let ctx = Arc::clone(&self.ctx);
            let connections = Arc::clone(&self.connections);
            tokio::spawn(async move {
                serve_connection(ctx, stream, peer, conn_cancel).await;
                connections.remove(&id);
            });
        }

        // Listener closes first so no new sessions arrive mid-drain.
        drop(self.socket);
        for entry in self.connections.iter() {
            entry.value().cancel();
        }

        let deadline = Instant::now() + self.shutdown_grace;
        while !self.connections.is_empty() && Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }
        if self.connections.is_empty() {
            info!("all connections drained");
        } else {
            warn!(
                remaining = self.connections.len(),
                "shutdown grace expired with connections still open"
            );
        }
        Ok(())
    }
}
