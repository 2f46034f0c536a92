// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # asana-transports
//!
//! Message channel layer for the Asana pose-detection client.
//!
//! A channel carries UTF-8 text messages in both directions and reports its
//! lifecycle as a stream of [`ConnectionEvent`]s. The session layer depends
//! only on the [`MessageChannel`] trait.
//!
//! ## Example
//!
//! ```no_run
//! use asana_transports::prelude::*;
//!
//! # async fn run() {
//! let (client, mut events) = WsClient::connect(ClientConfig::new("ws://localhost:8765"));
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ConnectionEvent::StateChanged(ConnectionState::Open) => {
//!             client.send_text(r#"{"type":"init"}"#.to_string()).ok();
//!         }
//!         ConnectionEvent::Message(text) => println!("Received: {}", text),
//!         ConnectionEvent::StateChanged(ConnectionState::Closed) => break,
//!         _ => {}
//!     }
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Common**: Shared types (errors, config, lifecycle events)
//! 2. **Traits**: Transport-agnostic channel interface
//! 3. **WebSocket**: `tokio-tungstenite` client

pub mod common;
pub mod traits;
pub mod websocket;

// Re-export commonly used types
pub use common::{
    ClientConfig, ConnectionEvent, ConnectionState, TransportError, TransportResult,
};
pub use traits::MessageChannel;
pub use websocket::WsClient;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::traits::*;
    pub use crate::websocket::*;
}
