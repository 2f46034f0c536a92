// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common error types for the transport layer

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the connection
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Connection attempt exceeded the configured timeout
    #[error("Connect timed out after {0} ms")]
    Timeout(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Channel is connecting or already closed
    #[error("Connection is not open")]
    NotConnected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::SendFailed(err.to_string())
    }
}
