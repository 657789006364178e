// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are applied in three tiers, later tiers winning:
//! 1. TOML file
//! 2. Environment variables
//! 3. CLI arguments

use crate::{ConfigError, ConfigResult, WireConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "webnn_wire.toml";

/// Find the wire configuration file
///
/// Search order:
/// 1. `WEBNN_WIRE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./webnn_wire.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("WEBNN_WIRE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by WEBNN_WIRE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|path| path.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet WEBNN_WIRE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<WireConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: WireConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `WEBNN_WIRE_MAX_ALLOCATION_SIZE` -> `transport.max_allocation_size`
/// - `WEBNN_WIRE_DISCONNECT_ON_FATAL_ERROR` -> `client.disconnect_on_fatal_error`
/// - `WEBNN_WIRE_FLUSH_AFTER_HANDLE` -> `server.flush_after_handle`
/// - `WEBNN_WIRE_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut WireConfig) {
    if let Ok(value) = env::var("WEBNN_WIRE_MAX_ALLOCATION_SIZE") {
        if let Ok(size) = value.parse::<usize>() {
            config.transport.max_allocation_size = size;
        }
    }
    if let Ok(value) = env::var("WEBNN_WIRE_DISCONNECT_ON_FATAL_ERROR") {
        config.client.disconnect_on_fatal_error = parse_bool(&value);
    }
    if let Ok(value) = env::var("WEBNN_WIRE_FLUSH_AFTER_HANDLE") {
        config.server.flush_after_handle = parse_bool(&value);
    }
    if let Ok(value) = env::var("WEBNN_WIRE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Recognised keys: `max_allocation_size`, `disconnect_on_fatal_error`, `flush_after_handle`,
/// `log_level`. Values that fail to parse are ignored.
pub fn apply_cli_overrides(config: &mut WireConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("max_allocation_size") {
        if let Ok(size) = value.parse::<usize>() {
            config.transport.max_allocation_size = size;
        }
    }
    if let Some(value) = cli_args.get("disconnect_on_fatal_error") {
        config.client.disconnect_on_fatal_error = parse_bool(value);
    }
    if let Some(value) = cli_args.get("flush_after_handle") {
        config.server.flush_after_handle = parse_bool(value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
