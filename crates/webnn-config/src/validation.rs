// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation

use crate::{ConfigError, ConfigResult, WireConfig};

/// Smallest transport allocation that can still carry a chunk frame: a 12 byte command header,
/// the 8 byte total size and at least one payload byte.
pub const MINIMUM_ALLOCATION_SIZE: usize = 21;

const KNOWN_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    AllocationTooSmall { size: usize },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllocationTooSmall { size } => write!(
                f,
                "transport.max_allocation_size = {} is below the minimum of {}",
                size, MINIMUM_ALLOCATION_SIZE
            ),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &WireConfig) -> ConfigResult<()> {
    let errors = collect_validation_errors(config);
    if errors.is_empty() {
        return Ok(());
    }
    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every problem with `config`, in section order.
pub fn collect_validation_errors(config: &WireConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.transport.max_allocation_size < MINIMUM_ALLOCATION_SIZE {
        errors.push(ConfigValidationError::AllocationTooSmall {
            size: config.transport.max_allocation_size,
        });
    }

    let level = config.logging.level.to_lowercase();
    if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.level,
                KNOWN_LOG_LEVELS.join(", ")
            ),
        });
    }

    errors
}
