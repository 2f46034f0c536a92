// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Audio feedback clips and sinks
//!
//! Playback is fire-and-forget: the driver hands each clip to the sink on a
//! blocking worker and only logs failures.

use crate::error::{SessionError, SessionResult};
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

pub const DEFAULT_AUDIO_MIME: &str = "audio/mp3";

/// A base64 audio payload from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    base64: String,
    mime_type: String,
}

impl AudioClip {
    /// Wrap a payload. An existing `data:<mime>;base64,` prefix is stripped.
    pub fn new(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        if let Some(rest) = payload.strip_prefix("data:") {
            if let Some((mime, data)) = rest.split_once(";base64,") {
                return Self {
                    base64: data.to_string(),
                    mime_type: mime.to_string(),
                };
            }
        }
        Self {
            base64: payload,
            mime_type: DEFAULT_AUDIO_MIME.to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// `data:audio/mp3;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    pub fn decode(&self) -> SessionResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.base64.trim())
            .map_err(|e| SessionError::Audio(format!("invalid base64 audio: {}", e)))
    }

    /// File extension derived from the MIME subtype
    pub fn file_extension(&self) -> &str {
        match self.mime_type.split_once('/').map(|(_, sub)| sub) {
            Some("mpeg") | Some("mp3") | None => "mp3",
            Some(sub) if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) => sub,
            Some(_) => "bin",
        }
    }
}

/// Plays decoded audio clips
pub trait AudioSink: Send + Sync {
    /// Play one clip to completion. Called off the session task.
    fn play(&self, clip: &AudioClip) -> SessionResult<()>;
}

/// Logs each clip without playing it
#[derive(Debug, Default)]
pub struct LoggingAudioSink;

impl AudioSink for LoggingAudioSink {
    fn play(&self, clip: &AudioClip) -> SessionResult<()> {
        let bytes = clip.decode()?;
        info!("[AUDIO] Received {} clip ({} bytes)", clip.mime_type(), bytes.len());
        Ok(())
    }
}

/// Writes each clip to a numbered file for an external player
#[derive(Debug)]
pub struct FileAudioSink {
    output_dir: PathBuf,
    written: AtomicU64,
}

impl FileAudioSink {
    pub fn new(output_dir: impl AsRef<Path>) -> SessionResult<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            written: AtomicU64::new(0),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn clips_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl AudioSink for FileAudioSink {
    fn play(&self, clip: &AudioClip) -> SessionResult<()> {
        let bytes = clip.decode()?;
        let index = self.written.fetch_add(1, Ordering::Relaxed);
        let path = self
            .output_dir
            .join(format!("clip_{:04}.{}", index, clip.file_extension()));
        std::fs::write(&path, &bytes)?;
        debug!("[AUDIO] Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
