// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always, plus a JSON log file per run when the `file-logging` feature is on.

use anyhow::Result;
#[cfg(feature = "file-logging")]
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

/// Keeps file logging alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the log file, if one was opened
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Name of the log file for a run started now: `webnn_wire_20250101_120000.log`
pub fn run_log_file_name() -> String {
    format!(
        "webnn_wire_{}.log",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    )
}

/// Install the global `tracing` subscriber
///
/// Crates named in `debug_flags` log at debug, everything else at `config.level`. Installing
/// twice is an error.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string_with_default(&config.level);
    let env_filter = EnvFilter::try_new(&filter)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", filter, e))?;

    let mut layers = Vec::new();
    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guard = None;
    #[cfg_attr(not(feature = "file-logging"), allow(unused_mut))]
    let mut log_file = None;
    if let Some(log_dir) = &config.log_dir {
        #[cfg(feature = "file-logging")]
        {
            std::fs::create_dir_all(log_dir).with_context(|| {
                format!("Failed to create log directory: {}", log_dir.display())
            })?;
            let file_name = run_log_file_name();
            let appender = tracing_appender::rolling::never(log_dir, &file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .with_filter(env_filter)
                    .boxed(),
            );
            file_guard = Some(guard);
            log_file = Some(log_dir.join(file_name));
        }
        #[cfg(not(feature = "file-logging"))]
        {
            anyhow::bail!(
                "Logging to {} needs the file-logging feature",
                log_dir.display()
            );
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_file,
    })
}

/// Initialize console logging at `info`
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::default())
}
