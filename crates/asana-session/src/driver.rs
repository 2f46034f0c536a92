// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tokio driver for the session state machine.
//!
//! Owns the channel and the collaborators, turns channel events, commands and
//! timers into [`SessionEvent`]s, and executes the resulting actions. One
//! client drives exactly one channel; after exit it closes the channel and
//! drops it, so late events have nowhere to land.

use crate::audio::{AudioClip, AudioSink, DEFAULT_AUDIO_MIME};
use crate::error::{SessionError, SessionResult};
use crate::frames::FrameSource;
use crate::protocol::{encode, FrameMessage, InitMessage, PracticeTarget};
use crate::state_machine::{
    ExitReason, NowMs, SessionAction, SessionEvent, SessionSnapshot, SessionStateMachine,
    SessionTiming,
};
use asana_transports::{
    ClientConfig, ConnectionEvent, ConnectionState, MessageChannel, TransportError, WsClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Driver policy (provided by caller/config).
#[derive(Debug, Clone)]
pub struct SessionClientConfig {
    pub timing: SessionTiming,
    /// How often the frame source's readiness is sampled.
    pub readiness_poll: Duration,
    /// MIME type attached to inbound audio clips.
    pub audio_mime_type: String,
}

impl Default for SessionClientConfig {
    fn default() -> Self {
        Self {
            timing: SessionTiming::default(),
            readiness_poll: Duration::from_millis(250),
            audio_mime_type: DEFAULT_AUDIO_MIME.to_string(),
        }
    }
}

/// Receives the single exit notification of a session
pub trait ExitHandler: Send {
    fn on_exit(&mut self, reason: ExitReason);
}

impl<F> ExitHandler for F
where
    F: FnMut(ExitReason) + Send,
{
    fn on_exit(&mut self, reason: ExitReason) {
        self(reason)
    }
}

/// External collaborators consumed by a session
pub struct Collaborators {
    pub frame_source: Box<dyn FrameSource>,
    pub audio_sink: Arc<dyn AudioSink>,
    pub exit_handler: Box<dyn ExitHandler>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Exit,
    ToggleCamera,
}

/// Cloneable control surface for a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Request a user exit
    pub fn exit(&self) -> SessionResult<()> {
        self.send(SessionCommand::Exit)
    }

    pub fn toggle_camera(&self) -> SessionResult<()> {
        self.send(SessionCommand::ToggleCamera)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, command: SessionCommand) -> SessionResult<()> {
        self.commands.send(command).map_err(|_| SessionError::Ended)
    }
}

enum Wake {
    Connection(Option<ConnectionEvent>),
    Command(Option<SessionCommand>),
    Readiness,
    Timer,
}

/// Tokio adapter over the runtime-agnostic session state machine.
pub struct SessionClient<C: MessageChannel> {
    sm: SessionStateMachine,
    config: SessionClientConfig,
    base: Instant,

    channel: C,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    events_open: bool,

    commands: mpsc::UnboundedReceiver<SessionCommand>,
    commands_open: bool,
    snapshot_tx: watch::Sender<SessionSnapshot>,

    frame_source: Box<dyn FrameSource>,
    audio_sink: Arc<dyn AudioSink>,
    exit_handler: Box<dyn ExitHandler>,
}

impl SessionClient<WsClient> {
    /// Start connecting to the backend and build the session around the new channel
    pub fn connect(
        client_config: ClientConfig,
        target: PracticeTarget,
        config: SessionClientConfig,
        collaborators: Collaborators,
    ) -> (Self, SessionHandle) {
        info!("[SESSION] Connecting to {}", client_config.address);
        let (channel, events) = WsClient::connect(client_config);
        Self::new(channel, events, target, config, collaborators)
    }
}

impl<C: MessageChannel> SessionClient<C> {
    /// Build a session over an existing channel and its event stream
    pub fn new(
        channel: C,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
        target: PracticeTarget,
        config: SessionClientConfig,
        collaborators: Collaborators,
    ) -> (Self, SessionHandle) {
        let sm = SessionStateMachine::new(target, config.timing.clone());
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(sm.snapshot());

        let client = Self {
            sm,
            config,
            base: Instant::now(),
            channel,
            events,
            events_open: true,
            commands,
            commands_open: true,
            snapshot_tx,
            frame_source: collaborators.frame_source,
            audio_sink: collaborators.audio_sink,
            exit_handler: collaborators.exit_handler,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
        };
        (client, handle)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.sm.snapshot()
    }

    /// Drive the session until it exits. Returns why it ended.
    pub async fn run(mut self) -> SessionResult<ExitReason> {
        let mut readiness = tokio::time::interval(self.config.readiness_poll);
        readiness.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self
                .sm
                .next_wakeup()
                .map(|ms| self.base + Duration::from_millis(ms));

            let wake = tokio::select! {
                event = self.events.recv(), if self.events_open => Wake::Connection(event),
                command = self.commands.recv(), if self.commands_open => Wake::Command(command),
                _ = readiness.tick() => Wake::Readiness,
                _ = sleep_until(deadline) => Wake::Timer,
            };

            let event = match wake {
                Wake::Connection(Some(event)) => Some(Self::translate(event)),
                Wake::Connection(None) => {
                    // Channel task is gone; treat as closed.
                    self.events_open = false;
                    Some(SessionEvent::ConnectionObserved {
                        state: ConnectionState::Closed,
                    })
                }
                Wake::Command(Some(SessionCommand::Exit)) => Some(SessionEvent::UserExit),
                Wake::Command(Some(SessionCommand::ToggleCamera)) => {
                    self.frame_source.toggle_camera();
                    None
                }
                Wake::Command(None) => {
                    self.commands_open = false;
                    None
                }
                Wake::Readiness => Some(SessionEvent::CameraReadiness {
                    ready: self.frame_source.is_ready(),
                }),
                Wake::Timer => None,
            };

            let events: Vec<SessionEvent> = event.into_iter().collect();
            let now = self.now_ms();
            let actions = self.sm.step(now, &events);
            let exited = self.execute(actions);
            self.publish();

            if let Some(reason) = exited {
                return Ok(reason);
            }
        }
    }

    fn translate(event: ConnectionEvent) -> SessionEvent {
        match event {
            ConnectionEvent::StateChanged(state) => SessionEvent::ConnectionObserved { state },
            ConnectionEvent::Error(reason) => SessionEvent::ConnectionError { reason },
            ConnectionEvent::Message(text) => SessionEvent::MessageReceived { text },
        }
    }

    fn now_ms(&self) -> NowMs {
        self.base.elapsed().as_millis() as NowMs
    }

    fn execute(&mut self, actions: Vec<SessionAction>) -> Option<ExitReason> {
        let mut exited = None;
        for action in actions {
            match action {
                SessionAction::SendInit { message } => self.send_init(&message),
                SessionAction::CaptureFrame => self.send_frame(),
                SessionAction::PlayAudio { clip } => self.play_audio(clip),
                SessionAction::NotifyExit { reason } => {
                    self.exit_handler.on_exit(reason);
                    exited = Some(reason);
                }
                SessionAction::CloseConnection => {
                    self.channel.close();
                    self.events_open = false;
                }
            }
        }
        exited
    }

    fn send_init(&mut self, message: &InitMessage) {
        let text = match encode(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("[SESSION] Failed to encode init: {}", e);
                return;
            }
        };
        match self.channel.send_text(text) {
            Ok(()) => debug!("[SESSION] Init sent over {}", self.channel.channel_type()),
            // A half-open channel drops the handshake
            Err(TransportError::NotConnected) => debug!("[SESSION] Init dropped, channel not open"),
            Err(e) => warn!("[SESSION] Failed to send init: {}", e),
        }
    }

    fn send_frame(&mut self) {
        if !self.frame_source.is_ready() {
            debug!("[FRAME-PUMP] Camera not ready, skipping tick");
            return;
        }
        let Some(image_data) = self.frame_source.capture_frame() else {
            debug!("[FRAME-PUMP] No frame available, skipping tick");
            return;
        };
        let text = match encode(&FrameMessage::new(image_data)) {
            Ok(text) => text,
            Err(e) => {
                warn!("[FRAME-PUMP] Failed to encode frame: {}", e);
                return;
            }
        };
        match self.channel.send_text(text) {
            Ok(()) => self.sm.record_frame_sent(),
            Err(e) => debug!("[FRAME-PUMP] Frame dropped: {}", e),
        }
    }

    fn play_audio(&self, clip: AudioClip) {
        let clip = clip.with_mime_type(self.config.audio_mime_type.clone());
        let sink = Arc::clone(&self.audio_sink);
        // Not awaited; playback never blocks decoding.
        tokio::task::spawn_blocking(move || {
            if let Err(e) = sink.play(&clip) {
                warn!("[AUDIO] Playback error: {}", e);
            }
        });
    }

    fn publish(&self) {
        let snapshot = self.sm.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
