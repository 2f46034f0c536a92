// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Result decoder
//!
//! Turns one inbound text message into at most one [`DetectionResult`] plus an
//! optional audio payload. Rules, in order:
//!
//! 1. a non-empty `audio_data` string is always handed back for playback
//! 2. `type == "init_response"` acknowledges the handshake
//! 3. a present `data` key maps through the result code table
//! 4. anything else leaves the current result alone

use crate::detection::DetectionResult;
use crate::error::DecodeError;
use crate::protocol::InboundMessage;
use serde_json::Value;

/// Outcome of decoding one inbound message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Base64 audio to play, independent of `result`
    pub audio: Option<String>,
    /// New result, or None when the message changes nothing
    pub result: Option<DetectionResult>,
    /// Error text reported by the backend
    pub backend_error: Option<String>,
}

#[cfg(test)]
impl Decoded {
    fn is_empty(&self) -> bool {
        self.audio.is_none() && self.result.is_none() && self.backend_error.is_none()
    }
}

/// Decode one inbound text message
pub fn decode(text: &str) -> Result<Decoded, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let message: InboundMessage = serde_json::from_value(value)?;
    Ok(decode_message(message))
}

/// Decode an already parsed message
pub fn decode_message(message: InboundMessage) -> Decoded {
    let audio = message.audio().map(str::to_string);

    let result = if message.is_init_response() {
        Some(DetectionResult::ready_to_begin(message.pose_name.clone()))
    } else if message.data.is_some() {
        Some(
            DetectionResult::from_code(message.result_code())
                .with_confidence(message.confidence)
                .with_pose_name(message.pose_name.clone()),
        )
    } else {
        None
    };

    Decoded {
        audio,
        result,
        backend_error: message.error,
    }
}
