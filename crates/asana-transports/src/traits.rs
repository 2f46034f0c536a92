// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Channel trait definitions
//!
//! The session layer only talks to a [`MessageChannel`], so it can run over
//! the WebSocket client or over an in-memory channel in tests.

use crate::common::{ConnectionState, TransportResult};

/// Bidirectional text message channel owned by exactly one session
///
/// Inbound traffic and lifecycle changes are delivered separately as
/// [`ConnectionEvent`](crate::common::ConnectionEvent)s.
pub trait MessageChannel: Send {
    /// Current lifecycle state
    fn state(&self) -> ConnectionState;

    fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Queue one text message for sending. Never waits for the network.
    ///
    /// Returns `TransportError::NotConnected` unless the channel is open.
    fn send_text(&self, text: String) -> TransportResult<()>;

    /// Close the channel. Idempotent.
    fn close(&mut self);

    /// Channel name/type for logs
    fn channel_type(&self) -> &str;
}
