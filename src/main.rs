// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use roster_rs::{
    auth::CredentialService,
    cfg::{config::Config, logger::init_logger},
    collection::Roster,
    commands::Registry,
    router::Router,
    server::{console, listener::Listener, pools::IoPools},
    store::{Storage, gateway::PgStorage},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("fatal: {e:#}");
            eprintln!("fatal: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run() -> Result<ExitCode> {
    let log_config = std::env::var("ROSTER_LOG_CONFIG")
        .unwrap_or_else(|_| "config/logger.yaml".to_string());
    let _log_guard = init_logger(&log_config)?;

    let cfg = Config::from_env().context("failed to read configuration")?;

    // The pool itself opens lazily; one ping decides whether we can start
    // at all. An unreachable database at boot is exit code 1.
    let store = Arc::new(PgStorage::connect_lazy(&cfg.db));
    if let Err(e) = store.ping().await {
        error!(
            host = %cfg.db.host,
            port = cfg.db.port,
            "database unreachable at startup: {e}"
        );
        return Ok(ExitCode::FAILURE);
    }
    store.ensure_schema().await?;

    let storage: Arc<dyn Storage> = store.clone();
    let roster = Arc::new(
        Roster::load(Arc::clone(&storage))
            .await
            .context("failed to load the collection")?,
    );
    let registry = Registry::with_commands(roster);
    let auth = CredentialService::new(storage);
    let router = Arc::new(Router::new(registry, auth));
    let pools = Arc::new(IoPools::new(&cfg.runtime));

    let listener = Listener::bind(&cfg, router, pools).await?;
    info!(addr = %listener.local_addr()?, "server listening");

    let cancel = CancellationToken::new();
    let server = tokio::spawn(listener.run(cancel.clone()));

    tokio::select! {
        _ = console::run(cancel.clone()) => {},
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
    }
    cancel.cancel();

    server
        .await
        .context("server task panicked")?
        .context("server loop failed")?;
    store.close().await;
    info!("shutdown complete");

    Ok(ExitCode::SUCCESS)
}
