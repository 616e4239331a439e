// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt, str::FromStr, thread, time::Duration};

use anyhow::{Context, Result, ensure};

/// Complete runtime configuration, read from the environment once at boot
/// and injected into every component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub net: NetConfig,
    pub db: DbConfig,
    pub runtime: RuntimeConfig,
}

/// Listener and per-connection buffer settings.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// TCP port, from `port6`.
    pub port: u16,
    /// Socket read chunk size hint; the framer imposes no lower bound.
    pub read_buffer: usize,
    /// Bound on the per-connection outbound response queue.
    pub outbound_queue: usize,
}

/// PostgreSQL connection settings, from `DB_HOST` / `DB_PORT` / `DB_NAME`
/// / `DB_USER` / `DB_PASSWORD`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
}

/// Worker-pool sizes, timeouts and the client reconnect policy.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Read-pool capacity; defaults to CPU parallelism.
    pub read_workers: usize,
    /// Write-pool capacity; defaults to CPU parallelism.
    pub write_workers: usize,
    /// Per-syscall I/O timeout on the client side.
    pub io_timeout: Duration,
    /// How long shutdown waits for in-flight connections to drain.
    pub shutdown_grace: Duration,
    /// Client connect retries before giving up.
    pub connect_attempts: u32,
    /// Pause between client connect retries.
    pub connect_backoff: Duration,
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("cannot parse environment variable {key}")),
        Err(_) => Ok(default),
    }
}

fn env_or_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn cpu_parallelism() -> usize {
    thread::available_parallelism().map(usize::from).unwrap_or(4)
}

impl Config {
    /// Reads the configuration from the environment and validates it.
    pub fn from_env() -> Result<Self> {
        let parallelism = cpu_parallelism();
        let mut cfg = Self {
            net: NetConfig {
                port: env_or("port6", 8080)?,
                read_buffer: env_or("ROSTER_READ_BUFFER", 8192)?,
                outbound_queue: env_or("ROSTER_OUTBOUND_QUEUE", 64)?,
            },
            db: DbConfig {
                host: env_or_string("DB_HOST", "localhost"),
                port: env_or("DB_PORT", 5432)?,
                name: env_or_string("DB_NAME", "roster"),
                user: env_or_string("DB_USER", "postgres"),
                password: env_or_string("DB_PASSWORD", ""),
                pool_size: env_or("ROSTER_DB_POOL", 8)?,
                acquire_timeout: Duration::from_secs(env_or(
                    "ROSTER_DB_ACQUIRE_TIMEOUT",
                    5,
                )?),
            },
            runtime: RuntimeConfig {
                read_workers: env_or("ROSTER_READ_WORKERS", parallelism)?,
                write_workers: env_or("ROSTER_WRITE_WORKERS", parallelism)?,
                io_timeout: Duration::from_secs(env_or("ROSTER_IO_TIMEOUT", 30)?),
                shutdown_grace: Duration::from_secs(env_or(
                    "ROSTER_SHUTDOWN_GRACE",
                    5,
                )?),
                connect_attempts: env_or("ROSTER_CONNECT_ATTEMPTS", 5)?,
                connect_backoff: Duration::from_secs(env_or(
                    "ROSTER_CONNECT_BACKOFF",
                    2,
                )?),
            },
        };
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes degenerate values.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.net.read_buffer > 0, "read buffer must be positive");
        ensure!(self.net.outbound_queue > 0, "outbound queue must be positive");
        ensure!(!self.db.host.is_empty(), "DB_HOST must not be empty");
        ensure!(!self.db.name.is_empty(), "DB_NAME must not be empty");
        ensure!(self.db.pool_size >= 1, "database pool must hold a connection");
        ensure!(self.runtime.connect_attempts >= 1, "need at least one attempt");

        // A zero-capacity pool would reject every request.
        if self.runtime.read_workers == 0 {
            self.runtime.read_workers = 1;
        }
        if self.runtime.write_workers == 0 {
            self.runtime.write_workers = 1;
        }
        Ok(())
    }

    /// Address the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.net.port)
    }
}

impl Default for Config {
    /// Defaults with the environment left out of the picture; used by
    /// tests and by the client, which only needs the runtime knobs.
    fn default() -> Self {
        let parallelism = cpu_parallelism();
        Self {
            net: NetConfig { port: 8080, read_buffer: 8192, outbound_queue: 64 },
            db: DbConfig {
                host: "localhost".to_string(),
                port: 5432,
                name: "roster".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                pool_size: 8,
                acquire_timeout: Duration::from_secs(5),
            },
            runtime: RuntimeConfig {
                read_workers: parallelism,
                write_workers: parallelism,
                io_timeout: Duration::from_secs(30),
                shutdown_grace: Duration::from_secs(5),
                connect_attempts: 5,
                connect_backoff: Duration::from_secs(2),
            },
        }
    }
}
