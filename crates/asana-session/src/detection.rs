// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Canonical detection status model

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MSG_CONNECTING: &str = "Connecting to detection server...";
pub const MSG_READY_TO_DETECT: &str = "Ready to detect poses";
pub const MSG_READY_TO_BEGIN: &str = "Ready to begin";
pub const MSG_CONNECTION_ERROR: &str = "Connection error - retrying...";
pub const MSG_NO_POSE: &str = "No pose detected";

/// Classification state reported by the backend. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Initializing,
    NoPose,
    Incorrect,
    Correct,
    Partial,
    NextPose,
    SequenceComplete,
}

impl DetectionStatus {
    /// Map a backend result code (0..=5)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NoPose),
            1 => Some(Self::Incorrect),
            2 => Some(Self::Correct),
            3 => Some(Self::Partial),
            4 => Some(Self::NextPose),
            5 => Some(Self::SequenceComplete),
            _ => None,
        }
    }

    /// Feedback text shown for a backend result code
    pub fn code_message(&self) -> &'static str {
        match self {
            Self::Initializing => MSG_READY_TO_BEGIN,
            Self::NoPose => "No pose detected - step into frame",
            Self::Incorrect => "Incorrect pose - adjust your position",
            Self::Correct => "Perfect! Hold it",
            Self::Partial => "Almost there - adjust as instructed",
            Self::NextPose => "Moving to next pose",
            Self::SequenceComplete => "Completed!",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SequenceComplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::NoPose => "no_pose",
            Self::Incorrect => "incorrect",
            Self::Correct => "correct",
            Self::Partial => "partial",
            Self::NextPose => "next_pose",
            Self::SequenceComplete => "sequence_complete",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded classification. Built fresh per message and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub status: DetectionStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_name: Option<String>,
}

impl DetectionResult {
    pub fn new(status: DetectionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            confidence: None,
            pose_name: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_pose_name(mut self, pose_name: Option<String>) -> Self {
        self.pose_name = pose_name;
        self
    }

    /// Status before the channel opens
    pub fn connecting() -> Self {
        Self::new(DetectionStatus::Initializing, MSG_CONNECTING)
    }

    /// Status right after the channel opens
    pub fn ready_to_detect() -> Self {
        Self::new(DetectionStatus::Initializing, MSG_READY_TO_DETECT)
    }

    pub fn connection_error() -> Self {
        Self::new(DetectionStatus::Initializing, MSG_CONNECTION_ERROR)
    }

    /// Acknowledgement of the init handshake
    pub fn ready_to_begin(pose_name: Option<String>) -> Self {
        Self::new(DetectionStatus::Initializing, MSG_READY_TO_BEGIN).with_pose_name(pose_name)
    }

    /// Result for a backend code. Unknown or missing codes mean no pose.
    pub fn from_code(code: Option<i64>) -> Self {
        match code.and_then(DetectionStatus::from_code) {
            Some(status) => Self::new(status, status.code_message()),
            None => Self::new(DetectionStatus::NoPose, MSG_NO_POSE),
        }
    }

    /// Rounded confidence percentage, only when confidence is positive
    pub fn accuracy_percent(&self) -> Option<u8> {
        self.confidence
            .filter(|c| c.is_finite() && *c > 0.0)
            .map(|c| (c.min(1.0) * 100.0).round() as u8)
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::connecting()
    }
}
