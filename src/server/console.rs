// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Administrative console on standard input.
//!
//! `exit` requests a graceful shutdown; `save` is kept for symmetry with
//! the client command set and does nothing under write-through
//! persistence.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Reads console commands until shutdown. When standard input closes
/// (daemonized runs), the task parks on the cancellation token instead
/// of shutting the server down.
pub async fn run(cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => match line.trim() {
                "exit" => {
                    info!("console requested shutdown");
                    cancel.cancel();
                    return;
                },
                "save" => {
                    println!("Nothing to do: persistence is write-through.");
                },
                "" => {},
                _ => println!("Unknown command"),
            },
            Ok(None) => {
                // stdin is closed; stay alive until cancelled.
                cancel.cancelled().await;
                return;
            },
            Err(e) => {
                warn!("console read failed: {e}");
                cancel.cancelled().await;
                return;
            },
        }
    }
}
