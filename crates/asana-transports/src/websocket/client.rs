// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! WebSocket client channel
//!
//! Connects asynchronously and reports everything through a
//! [`ConnectionEvent`] stream: lifecycle transitions, degraded errors and
//! inbound text messages. Sends are queued to the connection task and never
//! wait for the network.

use crate::common::{
    ClientConfig, ConnectionEvent, ConnectionState, TransportError, TransportResult,
};
use crate::traits::MessageChannel;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Outbound {
    Text(String),
    Close,
}

/// State shared between the handle and its connection task
struct Shared {
    state: RwLock<ConnectionState>,
    closed_reported: AtomicBool,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Shared {
    fn new(events_tx: mpsc::UnboundedSender<ConnectionEvent>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Connecting),
            closed_reported: AtomicBool::new(false),
            events_tx,
        }
    }

    fn current(&self) -> ConnectionState {
        *self.state.read()
    }

    // Receiver may already be gone when the owner is tearing down.
    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Emit an event only while the channel has not been closed
    fn emit_if_live(&self, event: ConnectionEvent) {
        let state = self.state.read();
        if *state != ConnectionState::Closed {
            self.emit(event);
        }
    }

    /// Move to `to` unless already closed. Returns false if the channel closed first.
    fn transition(&self, to: ConnectionState) -> bool {
        let mut state = self.state.write();
        if *state == ConnectionState::Closed {
            return false;
        }
        *state = to;
        // emitted under the lock so a concurrent close cannot overtake it
        self.emit(ConnectionEvent::StateChanged(to));
        true
    }

    /// Enter `Closed` and report it exactly once
    fn mark_closed(&self) {
        let mut state = self.state.write();
        *state = ConnectionState::Closed;
        if !self.closed_reported.swap(true, Ordering::SeqCst) {
            self.emit(ConnectionEvent::StateChanged(ConnectionState::Closed));
        }
    }
}

/// WebSocket client channel to the detection backend
pub struct WsClient {
    address: String,
    shared: Arc<Shared>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    task: Option<JoinHandle<()>>,
}

impl WsClient {
    /// Start connecting and return the handle plus its event stream
    ///
    /// Never fails synchronously: a malformed address or a failed handshake
    /// arrives as `Error` followed by `StateChanged(Closed)`.
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared::new(events_tx));
        shared.emit(ConnectionEvent::StateChanged(ConnectionState::Connecting));

        let address = config.address.clone();
        let task = tokio::spawn(run_connection(config, Arc::clone(&shared), outbound_rx));

        let client = Self {
            address,
            shared,
            outbound_tx,
            task: Some(task),
        };
        (client, events_rx)
    }

    /// Connect with default settings
    pub fn connect_to(
        address: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        Self::connect(ClientConfig::new(address))
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl MessageChannel for WsClient {
    fn state(&self) -> ConnectionState {
        self.shared.current()
    }

    fn send_text(&self, text: String) -> TransportResult<()> {
        if !self.shared.current().is_open() {
            return Err(TransportError::NotConnected);
        }
        self.outbound_tx
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::NotConnected)
    }

    fn close(&mut self) {
        let previous = self.shared.current();
        if previous == ConnectionState::Closed {
            return;
        }
        self.shared.mark_closed();

        match previous {
            ConnectionState::Connecting => {
                // Nothing to close gracefully yet
                if let Some(task) = self.task.take() {
                    task.abort();
                }
            }
            _ => {
                let _ = self.outbound_tx.send(Outbound::Close);
            }
        }
        debug!("[WS-CLIENT] Closed connection to {}", self.address);
    }

    fn channel_type(&self) -> &str {
        "websocket-client"
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.close();
    }
}

async fn open_stream(config: &ClientConfig) -> TransportResult<WsStream> {
    let url = config.url()?;
    let connect = connect_async(url.as_str());

    let result = match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| TransportError::Timeout(limit.as_millis() as u64))?,
        None => connect.await,
    };

    let (stream, _response) = result.map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
    info!("[WS-CLIENT] Connected to {}", url);
    Ok(stream)
}

async fn run_connection(
    config: ClientConfig,
    shared: Arc<Shared>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let mut stream = match open_stream(&config).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("[WS-CLIENT] {}", e);
            shared.emit_if_live(ConnectionEvent::Error(e.to_string()));
            shared.mark_closed();
            return;
        }
    };

    if !shared.transition(ConnectionState::Open) {
        debug!("[WS-CLIENT] Closed during handshake, dropping connection");
        let _ = stream.close(None).await;
        return;
    }

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        let err = TransportError::from(e);
                        warn!("[WS-CLIENT] {}", err);
                        shared.emit_if_live(ConnectionEvent::Error(err.to_string()));
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => deliver(&shared, text, config.max_message_size),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => deliver(&shared, text, config.max_message_size),
                    Err(_) => warn!("[WS-CLIENT] Dropping non UTF-8 binary message"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("[WS-CLIENT] Remote closed: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let err = TransportError::ReceiveFailed(e.to_string());
                    warn!("[WS-CLIENT] {}", err);
                    shared.emit_if_live(ConnectionEvent::Error(err.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    shared.mark_closed();
}

fn deliver(shared: &Shared, text: String, max_message_size: Option<usize>) {
    if let Some(max_size) = max_message_size {
        if text.len() > max_size {
            let err = TransportError::MessageTooLarge {
                size: text.len(),
                max_size,
            };
            warn!("[WS-CLIENT] {}", err);
            return;
        }
    }
    shared.emit_if_live(ConnectionEvent::Message(text));
}
