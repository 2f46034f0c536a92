// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire messages exchanged with the detection backend
//!
//! Outbound: one `init` message per connection, then `{ "imageData": ... }`
//! frames. Inbound: `init_response` acknowledgements and coded results, either
//! of which may carry base64 audio.

use crate::catalog::{Asana, Routine};
use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Inbound `type` of the handshake acknowledgement
pub const INIT_RESPONSE_TYPE: &str = "init_response";

/// Prefix of every outbound frame
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Single,
    Routine,
}

/// What the session practices: one pose, or a routine in order
///
/// Invariants: `asana_ids` is never empty, `Single` has exactly one id,
/// `routine_name` is present iff the mode is `Routine`.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeTarget {
    mode: PracticeMode,
    asana_ids: Vec<u32>,
    routine_name: Option<String>,
    fallback_pose_name: Option<String>,
}

impl PracticeTarget {
    pub fn new(
        mode: PracticeMode,
        asana_ids: Vec<u32>,
        routine_name: Option<String>,
    ) -> SessionResult<Self> {
        if asana_ids.is_empty() {
            return Err(SessionError::InvalidTarget(
                "at least one asana id is required".to_string(),
            ));
        }
        match mode {
            PracticeMode::Single => {
                if asana_ids.len() != 1 {
                    return Err(SessionError::InvalidTarget(format!(
                        "single mode takes exactly one asana id, got {}",
                        asana_ids.len()
                    )));
                }
                if routine_name.is_some() {
                    return Err(SessionError::InvalidTarget(
                        "routine name is only valid in routine mode".to_string(),
                    ));
                }
            }
            PracticeMode::Routine => {
                if routine_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                    return Err(SessionError::InvalidTarget(
                        "routine mode requires a routine name".to_string(),
                    ));
                }
            }
        }
        Ok(Self {
            mode,
            asana_ids,
            routine_name,
            fallback_pose_name: None,
        })
    }

    pub fn single(asana: &Asana) -> Self {
        Self {
            mode: PracticeMode::Single,
            asana_ids: vec![asana.id],
            routine_name: None,
            fallback_pose_name: Some(asana.name.clone()),
        }
    }

    pub fn routine(routine: &Routine) -> SessionResult<Self> {
        let ids = routine.asana_ids();
        let mut target = Self::new(PracticeMode::Routine, ids, Some(routine.name.clone()))?;
        target.fallback_pose_name = routine.asanas.first().map(|a| a.name.clone());
        Ok(target)
    }

    /// Resolve a catalog selection
    ///
    /// In full-routine mode the whole routine is practiced. Otherwise the
    /// selected asana is used, or the routine's first asana when none is selected.
    pub fn from_selection(
        routine: &Routine,
        selected: Option<&Asana>,
        full_routine: bool,
    ) -> SessionResult<Self> {
        if full_routine {
            return Self::routine(routine);
        }
        selected
            .or_else(|| routine.asanas.first())
            .map(Self::single)
            .ok_or_else(|| {
                SessionError::InvalidTarget(format!("routine '{}' has no asanas", routine.id))
            })
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn asana_ids(&self) -> &[u32] {
        &self.asana_ids
    }

    pub fn routine_name(&self) -> Option<&str> {
        self.routine_name.as_deref()
    }

    /// Pose name to show until the backend names one
    pub fn fallback_pose_name(&self) -> Option<&str> {
        self.fallback_pose_name.as_deref()
    }

    pub fn init_message(&self) -> InitMessage {
        InitMessage {
            mode: self.mode,
            asana_ids: self.asana_ids.clone(),
            routine_name: self.routine_name.clone(),
        }
    }
}

/// Session handshake, sent once per connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "init", rename_all = "camelCase")]
pub struct InitMessage {
    pub mode: PracticeMode,
    pub asana_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine_name: Option<String>,
}

/// One camera frame as a base64 image data URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMessage {
    pub image_data: String,
}

impl FrameMessage {
    pub fn new(image_data: impl Into<String>) -> Self {
        Self {
            image_data: image_data.into(),
        }
    }
}

/// Serialize an outbound message to its wire text
pub fn encode<T: Serialize>(message: &T) -> SessionResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Inbound backend payload
///
/// Fields of an unexpected JSON type read as absent. `data` keeps the raw
/// value so an explicit `null` can be told apart from a missing key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub message_type: Option<String>,

    #[serde(default, deserialize_with = "deserialize_present")]
    pub data: Option<Value>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub pose_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub audio_data: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
}

impl InboundMessage {
    pub fn is_init_response(&self) -> bool {
        self.message_type.as_deref() == Some(INIT_RESPONSE_TYPE)
    }

    /// Integer result code. Floats with no fractional part count.
    pub fn result_code(&self) -> Option<i64> {
        match self.data.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }

    /// Audio payload, when non-empty
    pub fn audio(&self) -> Option<&str> {
        self.audio_data.as_deref().filter(|a| !a.is_empty())
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_init_wire_format() {
        let target = PracticeTarget::new(PracticeMode::Single, vec![3], None).unwrap();
        let wire: Value = serde_json::from_str(&encode(&target.init_message()).unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "init", "mode": "single", "asanaIds": [3]}));
    }

    #[test]
    fn test_routine_init_wire_format() {
        let target = PracticeTarget::new(
            PracticeMode::Routine,
            vec![1, 2, 3],
            Some("Surya Namaskar".to_string()),
        )
        .unwrap();
        let wire: Value = serde_json::from_str(&encode(&target.init_message()).unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "init",
                "mode": "routine",
                "asanaIds": [1, 2, 3],
                "routineName": "Surya Namaskar"
            })
        );
    }

    #[test]
    fn test_target_invariants() {
        assert!(PracticeTarget::new(PracticeMode::Single, vec![], None).is_err());
        assert!(PracticeTarget::new(PracticeMode::Single, vec![1, 2], None).is_err());
        assert!(PracticeTarget::new(PracticeMode::Single, vec![1], Some("x".into())).is_err());
        assert!(PracticeTarget::new(PracticeMode::Routine, vec![1, 2], None).is_err());
        assert!(PracticeTarget::new(PracticeMode::Routine, vec![1], Some(" ".into())).is_err());
    }

    #[test]
    fn test_frame_wire_format() {
        let frame = FrameMessage::new(format!("{}AAAA", JPEG_DATA_URI_PREFIX));
        let wire: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
        assert_eq!(wire, json!({"imageData": "data:image/jpeg;base64,AAAA"}));
    }

    #[test]
    fn test_inbound_distinguishes_null_and_missing_data() {
        let missing: InboundMessage = serde_json::from_str(r#"{"pose_name":"Tadasana"}"#).unwrap();
        assert_eq!(missing.data, None);

        let null: InboundMessage = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert_eq!(null.data, Some(Value::Null));
        assert_eq!(null.result_code(), None);
    }

    #[test]
    fn test_inbound_result_code() {
        let int: InboundMessage = serde_json::from_str(r#"{"data":4}"#).unwrap();
        assert_eq!(int.result_code(), Some(4));

        let float: InboundMessage = serde_json::from_str(r#"{"data":2.0}"#).unwrap();
        assert_eq!(float.result_code(), Some(2));

        let fractional: InboundMessage = serde_json::from_str(r#"{"data":2.5}"#).unwrap();
        assert_eq!(fractional.result_code(), None);

        let text: InboundMessage = serde_json::from_str(r#"{"data":"2"}"#).unwrap();
        assert_eq!(text.result_code(), None);
    }

    #[test]
    fn test_inbound_ignores_mistyped_fields() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":7,"confidence":"high","pose_name":null,"audio_data":""}"#)
                .unwrap();
        assert_eq!(msg.message_type, None);
        assert_eq!(msg.confidence, None);
        assert_eq!(msg.pose_name, None);
        assert_eq!(msg.audio(), None);
    }
}
