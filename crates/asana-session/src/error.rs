// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the session layer

use thiserror::Error;

/// Session-level errors
///
/// None of these end the process. Transport failures surface as a status
/// message, everything else is logged.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid practice target: {0}")]
    InvalidTarget(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session already ended")]
    Ended,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Inbound payload could not be read as a backend message
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,
}
