// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # asana-session
//!
//! Session protocol client for real-time yoga pose feedback.
//!
//! A session connects to the detection backend, declares what is being
//! practiced (one pose or an ordered routine), streams camera frames on a
//! fixed cadence and turns the backend's classification messages into a
//! [`DetectionResult`].
//!
//! ## Layers
//!
//! - [`protocol`] and [`decoder`]: wire messages and result decoding
//! - [`state_machine`]: pure, deterministic session logic driven by `now_ms`
//! - [`driver`]: Tokio adapter that owns the channel and collaborators
//! - [`frames`], [`audio`], [`catalog`]: collaborator implementations and static data
//!
//! ## Example
//!
//! ```no_run
//! use asana_session::prelude::*;
//! use asana_transports::ClientConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> SessionResult<()> {
//! let routine = surya_namaskar();
//! let target = PracticeTarget::from_selection(&routine, routine.asana(5), false)?;
//!
//! let collaborators = Collaborators {
//!     frame_source: Box::new(DirectoryFrameSource::open("./frames")?),
//!     audio_sink: Arc::new(LoggingAudioSink),
//!     exit_handler: Box::new(|reason: ExitReason| println!("Session ended: {:?}", reason)),
//! };
//!
//! let (client, handle) = SessionClient::connect(
//!     ClientConfig::new("ws://localhost:8765"),
//!     target,
//!     SessionClientConfig::default(),
//!     collaborators,
//! );
//! let session = tokio::spawn(client.run());
//!
//! let mut updates = handle.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("{}: {}", snapshot.display_pose_name, snapshot.message);
//! }
//! let _ = session.await;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod catalog;
pub mod decoder;
pub mod detection;
pub mod driver;
pub mod error;
pub mod frames;
pub mod protocol;
pub mod pump;
pub mod state_machine;

pub use audio::{AudioClip, AudioSink, FileAudioSink, LoggingAudioSink};
pub use catalog::{surya_namaskar, Asana, Catalog, Difficulty, Routine};
pub use decoder::{decode, Decoded};
pub use detection::{DetectionResult, DetectionStatus};
pub use driver::{
    Collaborators, ExitHandler, SessionClient, SessionClientConfig, SessionCommand, SessionHandle,
};
pub use error::{DecodeError, SessionError, SessionResult};
pub use frames::{DirectoryFrameSource, FrameSource};
pub use protocol::{FrameMessage, InboundMessage, InitMessage, PracticeMode, PracticeTarget};
pub use pump::FramePump;
pub use state_machine::{
    ExitReason, NowMs, SessionAction, SessionEvent, SessionSnapshot, SessionStateMachine,
    SessionTiming,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audio::*;
    pub use crate::catalog::*;
    pub use crate::detection::{DetectionResult, DetectionStatus};
    pub use crate::driver::*;
    pub use crate::error::*;
    pub use crate::frames::*;
    pub use crate::protocol::{PracticeMode, PracticeTarget};
    pub use crate::state_machine::*;
}
