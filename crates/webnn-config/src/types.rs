// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to one section of `webnn_wire.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WireConfig {
    pub transport: TransportConfig,
    pub client: ClientConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Command transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest contiguous region the transport hands out, in bytes. Bigger commands are chunked.
    pub max_allocation_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_allocation_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub disconnect_on_fatal_error: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            disconnect_on_fatal_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Flush return commands at the end of every `handle_commands` call.
    pub flush_after_handle: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            flush_after_handle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WireConfig::default();
        assert_eq!(config.transport.max_allocation_size, 65536);
        assert!(config.client.disconnect_on_fatal_error);
        assert!(config.server.flush_after_handle);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: WireConfig = toml::from_str("[client]\ndisconnect_on_fatal_error = false\n").unwrap();
        assert!(!config.client.disconnect_on_fatal_error);
        assert_eq!(config.transport, TransportConfig::default());
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(WireConfig::default()).unwrap();
        assert_eq!(json["transport"]["max_allocation_size"], 65536);
    }
}
