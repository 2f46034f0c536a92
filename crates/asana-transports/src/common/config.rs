// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Client channel configuration

use crate::common::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// WebSocket client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, with or without the `ws://` scheme
    pub address: String,

    /// Handshake timeout (None = wait indefinitely)
    pub connect_timeout: Option<Duration>,

    /// Maximum inbound message size (None = unlimited)
    pub max_message_size: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "ws://localhost:8765".to_string(),
            connect_timeout: Some(Duration::from_secs(5)),
            max_message_size: Some(16 * 1024 * 1024), // 16 MB, base64 audio clips are large
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_no_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.address.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "Address cannot be empty".to_string(),
            ));
        }
        if self.max_message_size == Some(0) {
            return Err(TransportError::InvalidConfig(
                "Maximum message size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Address normalized to a `ws://` or `wss://` URL
    pub fn url(&self) -> TransportResult<String> {
        self.validate()?;
        let address = self.address.trim();
        if address.starts_with("ws://") || address.starts_with("wss://") {
            Ok(address.to_string())
        } else if address.contains("://") {
            Err(TransportError::InvalidConfig(format!(
                "Unsupported scheme in address: {}",
                address
            )))
        } else {
            Ok(format!("ws://{}", address))
        }
    }
}
