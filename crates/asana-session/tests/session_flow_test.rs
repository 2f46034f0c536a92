// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end session tests over an in-memory channel with a paused clock

use asana_session::prelude::*;
use asana_transports::{ConnectionEvent, ConnectionState, MessageChannel, TransportError, TransportResult};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Default)]
struct ChannelState {
    state: Option<ConnectionState>,
    sent: Vec<String>,
    close_calls: usize,
}

/// In-memory channel recording everything the session sends
#[derive(Clone, Default)]
struct MockChannel {
    inner: Arc<Mutex<ChannelState>>,
}

impl MockChannel {
    fn set_state(&self, state: ConnectionState) {
        self.inner.lock().unwrap().state = Some(state);
    }

    fn sent(&self) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|t| serde_json::from_str(t).unwrap())
            .collect()
    }

    fn frames_sent(&self) -> usize {
        self.sent().iter().filter(|m| m.get("imageData").is_some()).count()
    }

    fn close_calls(&self) -> usize {
        self.inner.lock().unwrap().close_calls
    }
}

impl MessageChannel for MockChannel {
    fn state(&self) -> ConnectionState {
        self.inner
            .lock()
            .unwrap()
            .state
            .unwrap_or(ConnectionState::Connecting)
    }

    fn send_text(&self, text: String) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != Some(ConnectionState::Open) {
            return Err(TransportError::NotConnected);
        }
        inner.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = Some(ConnectionState::Closed);
        inner.close_calls += 1;
    }

    fn channel_type(&self) -> &str {
        "mock"
    }
}

struct StubCamera {
    ready: Arc<AtomicBool>,
    toggles: Arc<AtomicUsize>,
}

impl FrameSource for StubCamera {
    fn capture_frame(&mut self) -> Option<String> {
        Some("data:image/jpeg;base64,/9j/4AAQ".to_string())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn toggle_camera(&mut self) {
        self.toggles.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordingSink {
    clips: mpsc::UnboundedSender<AudioClip>,
}

impl AudioSink for RecordingSink {
    fn play(&self, clip: &AudioClip) -> SessionResult<()> {
        let _ = self.clips.send(clip.clone());
        Ok(())
    }
}

struct Harness {
    channel: MockChannel,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    handle: SessionHandle,
    updates: watch::Receiver<SessionSnapshot>,
    session: JoinHandle<SessionResult<ExitReason>>,
    camera_ready: Arc<AtomicBool>,
    toggles: Arc<AtomicUsize>,
    clips: mpsc::UnboundedReceiver<AudioClip>,
    exits: Arc<Mutex<Vec<ExitReason>>>,
}

impl Harness {
    fn start(target: PracticeTarget, camera_ready: bool) -> Self {
        let channel = MockChannel::default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (clips_tx, clips_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(camera_ready));
        let toggles = Arc::new(AtomicUsize::new(0));
        let exits = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&exits);
        let collaborators = Collaborators {
            frame_source: Box::new(StubCamera {
                ready: Arc::clone(&ready),
                toggles: Arc::clone(&toggles),
            }),
            audio_sink: Arc::new(RecordingSink { clips: clips_tx }),
            exit_handler: Box::new(move |reason: ExitReason| {
                recorded.lock().unwrap().push(reason);
            }),
        };

        let (client, handle) = SessionClient::new(
            channel.clone(),
            events_rx,
            target,
            SessionClientConfig::default(),
            collaborators,
        );
        let updates = handle.subscribe();
        let session = tokio::spawn(client.run());

        Self {
            channel,
            events: events_tx,
            handle,
            updates,
            session,
            camera_ready: ready,
            toggles,
            clips: clips_rx,
            exits,
        }
    }

    fn single(asana_id: u32) -> Self {
        let target = PracticeTarget::new(PracticeMode::Single, vec![asana_id], None).unwrap();
        Self::start(target, true)
    }

    fn open(&self) {
        self.channel.set_state(ConnectionState::Open);
        self.events
            .send(ConnectionEvent::StateChanged(ConnectionState::Open))
            .unwrap();
    }

    fn receive(&self, message: Value) {
        self.events
            .send(ConnectionEvent::Message(message.to_string()))
            .unwrap();
    }

    async fn wait_for(&mut self, pred: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let snapshot = tokio::time::timeout(Duration::from_secs(60), self.updates.wait_for(|s| pred(s)))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session dropped")
            .clone();
        snapshot
    }

    fn exits(&self) -> Vec<ExitReason> {
        self.exits.lock().unwrap().clone()
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_pose_session_to_completion() {
    let mut h = Harness::single(3);
    assert_eq!(h.handle.snapshot().message, "Connecting to detection server...");

    h.open();
    let snapshot = h.wait_for(|s| s.initialized).await;
    assert!(snapshot.connected);
    assert_eq!(snapshot.status, DetectionStatus::Initializing);
    assert_eq!(
        h.channel.sent(),
        vec![json!({"type": "init", "mode": "single", "asanaIds": [3]})]
    );

    h.receive(json!({"type": "init_response", "pose_name": "Dandasana"}));
    let snapshot = h.wait_for(|s| s.pose_name.is_some()).await;
    assert_eq!(snapshot.status, DetectionStatus::Initializing);
    assert_eq!(snapshot.message, "Ready to begin");
    assert_eq!(snapshot.pose_name.as_deref(), Some("Dandasana"));

    h.receive(json!({"data": 2, "confidence": 0.95}));
    let snapshot = h.wait_for(|s| s.status == DetectionStatus::Correct).await;
    assert_eq!(snapshot.message, "Perfect! Hold it");
    assert_eq!(snapshot.confidence, Some(0.95));
    assert_eq!(snapshot.pose_name.as_deref(), Some("Dandasana"));
    assert_eq!(snapshot.accuracy_percent(), Some(95));

    h.receive(json!({"data": 5}));
    h.wait_for(|s| s.status == DetectionStatus::SequenceComplete).await;
    let frames_at_completion = h.channel.frames_sent();

    // Late results do not move the terminal state
    h.receive(json!({"data": 1}));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(h.exits().is_empty());
    assert!(!h.session.is_finished());
    assert_eq!(h.handle.snapshot().status, DetectionStatus::SequenceComplete);

    let reason = (&mut h.session).await.unwrap().unwrap();
    assert_eq!(reason, ExitReason::SequenceComplete);
    assert_eq!(h.exits(), vec![ExitReason::SequenceComplete]);
    assert_eq!(h.channel.frames_sent(), frames_at_completion);
    assert_eq!(h.channel.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_routine_init_declares_every_pose_in_order() {
    let routine = surya_namaskar();
    let target = PracticeTarget::from_selection(&routine, None, true).unwrap();
    let mut h = Harness::start(target, true);

    assert_eq!(h.handle.snapshot().display_pose_name, "Pranamasana");
    h.open();
    h.wait_for(|s| s.initialized).await;

    assert_eq!(
        h.channel.sent(),
        vec![json!({
            "type": "init",
            "mode": "routine",
            "asanaIds": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            "routineName": "Surya Namaskar"
        })]
    );
    h.handle.exit().unwrap();
    assert_eq!((&mut h.session).await.unwrap().unwrap(), ExitReason::UserRequested);
}

#[tokio::test(start_paused = true)]
async fn test_frames_are_paced_on_the_wall_clock() {
    let mut h = Harness::single(5);
    h.open();
    h.wait_for(|s| s.initialized).await;
    assert_eq!(h.channel.frames_sent(), 0);

    tokio::time::sleep(Duration::from_millis(6100)).await;
    assert_eq!(h.channel.frames_sent(), 3);
    assert_eq!(h.handle.snapshot().frames_sent, 3);

    let frame = h.channel.sent().last().cloned().unwrap();
    assert_eq!(frame, json!({"imageData": "data:image/jpeg;base64,/9j/4AAQ"}));

    h.handle.exit().unwrap();
    (&mut h.session).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_no_frames_before_init_or_while_camera_not_ready() {
    let target = PracticeTarget::new(PracticeMode::Single, vec![5], None).unwrap();
    let mut h = Harness::start(target, false);

    // Camera not ready and not connected
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.channel.sent().is_empty());

    h.open();
    h.wait_for(|s| s.initialized).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.channel.frames_sent(), 0);

    h.camera_ready.store(true, Ordering::SeqCst);
    h.wait_for(|s| s.camera_ready).await;
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(h.channel.frames_sent(), 1);

    // Readiness lost stops the pump again
    h.camera_ready.store(false, Ordering::SeqCst);
    h.wait_for(|s| !s.camera_ready).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.channel.frames_sent(), 1);

    h.handle.exit().unwrap();
    (&mut h.session).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_audio_is_dispatched_without_blocking_decoding() {
    let mut h = Harness::single(7);
    h.open();
    h.wait_for(|s| s.initialized).await;

    h.receive(json!({"data": 3, "pose_name": "Bhujangasana", "audio_data": "SUQz"}));
    let snapshot = h.wait_for(|s| s.status == DetectionStatus::Partial).await;
    assert_eq!(snapshot.message, "Almost there - adjust as instructed");

    let clip = h.clips.recv().await.unwrap();
    assert_eq!(clip.data_uri(), "data:audio/mp3;base64,SUQz");

    // Audio alone still plays and leaves the result untouched
    h.receive(json!({"audio_data": "SUQz"}));
    h.clips.recv().await.unwrap();
    assert_eq!(h.handle.snapshot().status, DetectionStatus::Partial);

    h.handle.exit().unwrap();
    (&mut h.session).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transport_problems_degrade_without_ending_the_session() {
    let mut h = Harness::single(2);
    h.open();
    h.wait_for(|s| s.initialized).await;

    h.events
        .send(ConnectionEvent::Error("connection reset".to_string()))
        .unwrap();
    let snapshot = h.wait_for(|s| s.message == "Connection error - retrying...").await;
    assert_eq!(snapshot.status, DetectionStatus::Initializing);

    h.receive(json!({"data": 1}));
    h.events.send(ConnectionEvent::Message("{not json".to_string())).unwrap();
    h.channel.set_state(ConnectionState::Closed);
    h.events
        .send(ConnectionEvent::StateChanged(ConnectionState::Closed))
        .unwrap();
    let snapshot = h.wait_for(|s| !s.connected).await;
    assert_eq!(snapshot.status, DetectionStatus::Incorrect);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.channel.frames_sent(), 0);
    assert!(!h.session.is_finished());
    assert!(h.exits().is_empty());

    h.handle.exit().unwrap();
    assert_eq!((&mut h.session).await.unwrap().unwrap(), ExitReason::UserRequested);
    assert_eq!(h.exits(), vec![ExitReason::UserRequested]);
}

#[tokio::test(start_paused = true)]
async fn test_user_exit_and_camera_toggle() {
    let mut h = Harness::single(12);
    h.open();
    h.wait_for(|s| s.initialized).await;

    h.handle.toggle_camera().unwrap();
    h.handle.toggle_camera().unwrap();
    h.handle.exit().unwrap();

    assert_eq!((&mut h.session).await.unwrap().unwrap(), ExitReason::UserRequested);
    assert_eq!(h.toggles.load(Ordering::SeqCst), 2);
    assert_eq!(h.exits(), vec![ExitReason::UserRequested]);
    assert_eq!(h.channel.close_calls(), 1);
    assert_eq!(
        h.handle.snapshot().exit_reason,
        Some(ExitReason::UserRequested)
    );

    // The session is gone; later commands are rejected
    assert!(matches!(h.handle.exit(), Err(SessionError::Ended)));
}

#[tokio::test(start_paused = true)]
async fn test_init_on_a_channel_that_is_not_open_is_dropped_once() {
    let mut h = Harness::single(4);
    h.channel.set_state(ConnectionState::Closed);
    h.events
        .send(ConnectionEvent::StateChanged(ConnectionState::Open))
        .unwrap();

    let snapshot = h.wait_for(|s| s.initialized).await;
    assert_eq!(snapshot.status, DetectionStatus::Initializing);
    assert!(h.channel.sent().is_empty());

    // Readiness keeps ticking; neither frames nor a second init get through
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.channel.sent().is_empty());
    assert_eq!(h.handle.snapshot().frames_sent, 0);
    assert!(!h.session.is_finished());

    // Once the channel can carry traffic only frames follow
    h.channel.set_state(ConnectionState::Open);
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let sent = h.channel.sent();
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|m| m.get("type").is_none()));

    h.handle.exit().unwrap();
    assert_eq!((&mut h.session).await.unwrap().unwrap(), ExitReason::UserRequested);
}

#[tokio::test(start_paused = true)]
async fn test_user_exit_during_completion_delay_notifies_once() {
    let mut h = Harness::single(6);
    h.open();
    h.wait_for(|s| s.initialized).await;

    h.receive(json!({"data": 5}));
    h.wait_for(|s| s.status == DetectionStatus::SequenceComplete).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(h.exits().is_empty());

    h.handle.exit().unwrap();
    assert_eq!((&mut h.session).await.unwrap().unwrap(), ExitReason::UserRequested);

    // The pending completion exit never fires
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.exits(), vec![ExitReason::UserRequested]);
    assert_eq!(h.channel.close_calls(), 1);
}
