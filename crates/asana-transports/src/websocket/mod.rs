// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! WebSocket channel implementation

pub mod client;

pub use client::WsClient;
