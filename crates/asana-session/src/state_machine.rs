// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime-agnostic practice session state machine.
//!
//! Pure and deterministic: the driver feeds observed events together with a
//! monotonic `now_ms`, and executes the returned actions. No sleeps, no I/O.
//!
//! The machine owns the latest [`DetectionResult`], the sticky pose name,
//! the handshake flag, the frame pump and the delayed exit after completion.
//! Once an exit has been emitted every later event is ignored.

use crate::audio::AudioClip;
use crate::decoder;
use crate::detection::{DetectionResult, DetectionStatus};
use crate::protocol::{InitMessage, PracticeTarget};
use crate::pump::FramePump;
use asana_transports::ConnectionState;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Milliseconds in a monotonic clock domain provided by the driver.
pub type NowMs = u64;

/// Shown when neither the backend nor the selection names a pose
pub const LOADING_POSE_NAME: &str = "Loading...";

#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Frame pump period, in milliseconds.
    pub frame_interval_ms: u64,
    /// Delay between completion and the exit notification, in milliseconds.
    pub exit_delay_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            frame_interval_ms: 2000,
            exit_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    UserRequested,
    SequenceComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConnectionObserved { state: ConnectionState },
    /// Degraded transport signal; the channel may still be usable
    ConnectionError { reason: String },
    MessageReceived { text: String },
    CameraReadiness { ready: bool },
    UserExit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    SendInit { message: InitMessage },
    /// Pump tick: capture one frame and send it if available
    CaptureFrame,
    PlayAudio { clip: AudioClip },
    NotifyExit { reason: ExitReason },
    CloseConnection,
}

/// Render-ready view of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: DetectionStatus,
    pub message: String,
    pub confidence: Option<f64>,
    /// Sticky backend pose name
    pub pose_name: Option<String>,
    /// Pose name to display, with selection and loading fallbacks
    pub display_pose_name: String,
    pub connected: bool,
    pub initialized: bool,
    pub camera_ready: bool,
    pub frames_sent: u64,
    pub results_applied: u64,
    pub exit_reason: Option<ExitReason>,
}

impl SessionSnapshot {
    pub fn accuracy_percent(&self) -> Option<u8> {
        DetectionResult::new(self.status, "")
            .with_confidence(self.confidence)
            .accuracy_percent()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    target: PracticeTarget,
    timing: SessionTiming,
    result: DetectionResult,
    pose_name: Option<String>,
    connection: ConnectionState,
    initialized: bool,
    camera_ready: bool,
    pump: FramePump,
    exit_due_ms: Option<NowMs>,
    exit_reason: Option<ExitReason>,
    frames_sent: u64,
    results_applied: u64,
}

impl SessionStateMachine {
    pub fn new(target: PracticeTarget, timing: SessionTiming) -> Self {
        let pump = FramePump::new(timing.frame_interval_ms);
        Self {
            target,
            timing,
            result: DetectionResult::connecting(),
            pose_name: None,
            connection: ConnectionState::Connecting,
            initialized: false,
            camera_ready: false,
            pump,
            exit_due_ms: None,
            exit_reason: None,
            frames_sent: 0,
            results_applied: 0,
        }
    }

    pub fn target(&self) -> &PracticeTarget {
        &self.target
    }

    pub fn result(&self) -> &DetectionResult {
        &self.result
    }

    pub fn status(&self) -> DetectionStatus {
        self.result.status
    }

    /// Last non-empty pose name reported by the backend
    pub fn pose_name(&self) -> Option<&str> {
        self.pose_name.as_deref()
    }

    pub fn display_pose_name(&self) -> &str {
        self.pose_name
            .as_deref()
            .or_else(|| self.target.fallback_pose_name())
            .unwrap_or(LOADING_POSE_NAME)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_complete(&self) -> bool {
        self.result.status.is_terminal()
    }

    pub fn is_pump_armed(&self) -> bool {
        self.pump.is_armed()
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    pub fn has_exited(&self) -> bool {
        self.exit_reason.is_some()
    }

    /// Count a frame the driver actually handed to the channel
    pub fn record_frame_sent(&mut self) {
        self.frames_sent += 1;
    }

    /// Earliest time at which `step` has timer work to do
    pub fn next_wakeup(&self) -> Option<NowMs> {
        match (self.pump.next_due_ms(), self.exit_due_ms) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Advance the state machine by providing observed events.
    pub fn step(&mut self, now_ms: NowMs, events: &[SessionEvent]) -> Vec<SessionAction> {
        let mut actions: Vec<SessionAction> = Vec::new();

        for event in events {
            if self.has_exited() {
                debug!("[SESSION] Ignoring {:?} after exit", event);
                break;
            }
            match event {
                SessionEvent::ConnectionObserved { state } => {
                    self.on_connection_observed(*state, &mut actions);
                }
                SessionEvent::ConnectionError { reason } => {
                    warn!("[SESSION] Connection error: {}", reason);
                    if !self.is_complete() {
                        self.result = DetectionResult::connection_error();
                    }
                }
                SessionEvent::MessageReceived { text } => {
                    self.on_message(now_ms, text, &mut actions);
                }
                SessionEvent::CameraReadiness { ready } => {
                    if self.camera_ready != *ready {
                        debug!("[SESSION] Camera ready: {}", ready);
                    }
                    self.camera_ready = *ready;
                }
                SessionEvent::UserExit => {
                    self.exit(ExitReason::UserRequested, &mut actions);
                }
            }
        }

        if self.has_exited() {
            return actions;
        }

        // Delayed exit after completion; survives a closed connection.
        if let Some(due) = self.exit_due_ms {
            if now_ms >= due {
                self.exit(ExitReason::SequenceComplete, &mut actions);
                return actions;
            }
        }

        self.update_pump(now_ms);
        if self.pump.poll(now_ms) {
            actions.push(SessionAction::CaptureFrame);
        }

        actions
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.result.status,
            message: self.result.message.clone(),
            confidence: self.result.confidence,
            pose_name: self.pose_name.clone(),
            display_pose_name: self.display_pose_name().to_string(),
            connected: self.is_connected(),
            initialized: self.initialized,
            camera_ready: self.camera_ready,
            frames_sent: self.frames_sent,
            results_applied: self.results_applied,
            exit_reason: self.exit_reason,
        }
    }

    fn on_connection_observed(&mut self, state: ConnectionState, actions: &mut Vec<SessionAction>) {
        if state == self.connection {
            return;
        }
        self.connection = state;
        match state {
            ConnectionState::Open => {
                info!("[SESSION] Connected to detection server");
                if !self.is_complete() {
                    self.result = DetectionResult::ready_to_detect();
                }
                // At most one handshake per connection
                if !self.initialized {
                    self.initialized = true;
                    info!(
                        "[SESSION] Initializing {:?} session for asanas {:?}",
                        self.target.mode(),
                        self.target.asana_ids()
                    );
                    actions.push(SessionAction::SendInit {
                        message: self.target.init_message(),
                    });
                }
            }
            ConnectionState::Closed => {
                info!("[SESSION] Connection closed");
                self.pump.disarm();
            }
            ConnectionState::Connecting => {}
        }
    }

    fn on_message(&mut self, now_ms: NowMs, text: &str, actions: &mut Vec<SessionAction>) {
        let decoded = match decoder::decode(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("[DECODER] Dropping inbound message: {}", e);
                return;
            }
        };

        if let Some(audio) = decoded.audio {
            actions.push(SessionAction::PlayAudio {
                clip: AudioClip::new(audio),
            });
        }
        if let Some(error) = decoded.backend_error {
            warn!("[DECODER] Backend reported: {}", error);
        }
        if let Some(result) = decoded.result {
            self.apply_result(now_ms, result);
        }
    }

    fn apply_result(&mut self, now_ms: NowMs, result: DetectionResult) {
        if self.is_complete() {
            debug!("[SESSION] Sequence complete, ignoring {}", result.status);
            return;
        }

        if let Some(name) = result.pose_name.as_deref().filter(|n| !n.is_empty()) {
            if self.pose_name.as_deref() != Some(name) {
                info!("[SESSION] Current pose: {}", name);
                self.pose_name = Some(name.to_string());
            }
        }

        let status = result.status;
        self.result = result;
        self.results_applied += 1;

        if status.is_terminal() {
            info!(
                "[SESSION] Sequence complete, exiting in {} ms",
                self.timing.exit_delay_ms
            );
            self.pump.disarm();
            self.exit_due_ms = Some(now_ms.saturating_add(self.timing.exit_delay_ms));
        }
    }

    fn update_pump(&mut self, now_ms: NowMs) {
        let armed = self.camera_ready
            && self.initialized
            && self.connection.is_open()
            && !self.is_complete();
        match (armed, self.pump.is_armed()) {
            (true, false) => {
                debug!("[FRAME-PUMP] Armed, every {} ms", self.pump.interval_ms());
                self.pump.arm(now_ms);
            }
            (false, true) => {
                debug!("[FRAME-PUMP] Disarmed");
                self.pump.disarm();
            }
            _ => {}
        }
    }

    fn exit(&mut self, reason: ExitReason, actions: &mut Vec<SessionAction>) {
        if self.exit_reason.is_some() {
            return;
        }
        info!("[SESSION] Exiting: {:?}", reason);
        self.exit_reason = Some(reason);
        self.exit_due_ms = None;
        self.pump.disarm();
        actions.push(SessionAction::NotifyExit { reason });
        actions.push(SessionAction::CloseConnection);
    }
}
