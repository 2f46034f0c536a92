// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # asana-observability
//!
//! Logging setup shared by the Asana crates and tools, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: daily-rolling log files in a per-run folder (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Workspace crate names accepted by `--debug-{crate}`
pub const KNOWN_CRATES: &[&str] = &[
    "asana",
    "asana-config",
    "asana-observability",
    "asana-transports",
    "asana-session",
];
