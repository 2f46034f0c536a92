// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connection lifecycle state and the events a channel emits

use serde::{Deserialize, Serialize};

/// Lifecycle of a single channel: `Connecting -> Open -> Closed`
///
/// `Closed` is final. A channel never reconnects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Everything a channel reports to its owner, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    StateChanged(ConnectionState),
    /// Degraded signal. Does not by itself mean the channel closed.
    Error(String),
    /// One inbound text message
    Message(String),
}
