// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

#[derive(Debug, Deserialize, Clone)]
struct LoggerConfig {
    logger: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum Output {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum RotationFreq {
    Minutely,
    Hourly,
    Daily,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
struct LogFileConfig {
    path: String,
    #[serde(default)]
    rotation_frequency: Option<RotationFreq>,
}

#[derive(Debug, Deserialize, Clone)]
struct LogConfig {
    level: String,
    output: Output,
    #[serde(default)]
    json: bool,
    file: Option<LogFileConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: Output::Stderr,
            json: false,
            file: None,
        }
    }
}

fn file_writer(cfg: &LogFileConfig) -> Result<(BoxMakeWriter, WorkerGuard)> {
    let path = Path::new(&cfg.path);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "roster.log".to_string());

    let rotation = match cfg.rotation_frequency {
        Some(RotationFreq::Minutely) => Rotation::MINUTELY,
        Some(RotationFreq::Hourly) => Rotation::HOURLY,
        Some(RotationFreq::Daily) => Rotation::DAILY,
        Some(RotationFreq::Never) | None => Rotation::NEVER,
    };

    let appender = RollingFileAppender::new(rotation, dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}

/// Initialises the global `tracing` subscriber from a YAML config file.
///
/// A missing file falls back to plain `info` on stderr so the binary runs
/// unconfigured. `RUST_LOG` always wins over the configured level.
/// Repeated calls are harmless; only the first wins, which keeps test
/// binaries happy.
pub fn init_logger(path: &str) -> Result<Option<WorkerGuard>> {
    let cfg = match fs::read_to_string(path) {
        Ok(raw) => {
            serde_yaml::from_str::<LoggerConfig>(&raw)
                .with_context(|| format!("failed to parse logger config {path}"))?
                .logger
        },
        Err(_) => LogConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));

    let (writer, guard) = match cfg.output {
        Output::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
        Output::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
        Output::File => {
            let file_cfg = cfg.file.as_ref().with_context(|| {
                format!("logger config {path} selects file output without a file section")
            })?;
            let (writer, guard) = file_writer(file_cfg)?;
            (writer, Some(guard))
        },
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    let init_result = if cfg.json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };
    // Err means a subscriber is already set; keep it.
    let _ = init_result;

    Ok(guard)
}
