// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every struct maps to a section of `asana_configuration.toml`. All sections
//! are `#[serde(default)]`, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AsanaConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub capture: CaptureConfig,
    pub audio: AudioConfig,
    pub logging: LoggingConfig,
}

/// Detection backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket URL of the pose-detection service
    pub url: String,
    pub connect_timeout_ms: u64,
    /// Inbound messages larger than this are dropped
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            connect_timeout_ms: 5000,
            max_message_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Session pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frame pump period
    pub frame_interval_ms: u64,
    /// Delay between `sequence_complete` and the exit notification
    pub exit_delay_ms: u64,
    /// How often the driver re-checks camera readiness while the pump is idle
    pub readiness_poll_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 2000,
            exit_delay_ms: 2000,
            readiness_poll_ms: 250,
        }
    }
}

/// Frame capture settings used by the bundled frame sources
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory of still images replayed as camera frames
    pub frames_dir: Option<PathBuf>,
    pub jpeg_quality: u8,
    /// Frames wider than this are downscaled before encoding
    pub max_width: Option<u32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_dir: None,
            jpeg_quality: 80,
            max_width: None,
        }
    }
}

/// Feedback audio settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Where decoded clips are written. `None` only logs them.
    pub output_dir: Option<PathBuf>,
    pub mime_type: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            mime_type: "audio/mp3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    pub json: bool,
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_dir: None,
        }
    }
}
