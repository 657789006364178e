// Copyright 2026 WebNN Native Contributors
// SPDX-License-Identifier: Apache-2.0

//! # webnn-observability
//!
//! Logging setup shared by the WebNN wire tools and embedders, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: JSON log file next to the console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Workspace crate names accepted by the debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "webnn-structures",
    "webnn-serialization",
    "webnn-wire",
    "webnn-config",
    "webnn-observability",
];
