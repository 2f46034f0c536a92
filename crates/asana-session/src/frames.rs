// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Frame sources
//!
//! A frame source hands the pump one encoded image per tick, as a
//! `data:image/jpeg;base64,...` URI, or nothing when no frame is available.

use crate::error::{SessionError, SessionResult};
use crate::protocol::JPEG_DATA_URI_PREFIX;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Camera-like supplier of encoded frames
pub trait FrameSource: Send {
    /// One encoded frame, or None when the camera has nothing yet
    fn capture_frame(&mut self) -> Option<String>;

    /// Whether the camera is producing frames
    fn is_ready(&self) -> bool;

    /// Switch between front and back camera
    fn toggle_camera(&mut self);
}

/// Encode an image as a JPEG data URI
pub fn encode_jpeg_data_uri(
    image: &DynamicImage,
    quality: u8,
    max_width: Option<u32>,
) -> SessionResult<String> {
    let image = match max_width {
        Some(width) if width > 0 && image.width() > width => {
            image.resize(width, image.height(), FilterType::Triangle)
        }
        _ => image.clone(),
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| SessionError::FrameSource(format!("JPEG encoding failed: {}", e)))?;

    Ok(format!(
        "{}{}",
        JPEG_DATA_URI_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&jpeg)
    ))
}

/// Cycles through the still images of a directory as if they were a camera
///
/// `toggle_camera` reverses the playback direction.
#[derive(Debug)]
pub struct DirectoryFrameSource {
    frames: Vec<PathBuf>,
    position: usize,
    reversed: bool,
    jpeg_quality: u8,
    max_width: Option<u32>,
}

impl DirectoryFrameSource {
    /// Collect image files from `dir`, sorted by name
    pub fn open(dir: impl AsRef<Path>) -> SessionResult<Self> {
        let dir = dir.as_ref();
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            warn!("[FRAMES] No images found in {}", dir.display());
        } else {
            info!("[FRAMES] Loaded {} frames from {}", frames.len(), dir.display());
        }

        Ok(Self {
            frames,
            position: 0,
            reversed: false,
            jpeg_quality: 80,
            max_width: None,
        })
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_max_width(mut self, max_width: Option<u32>) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    fn advance(&mut self) {
        let count = self.frames.len();
        if count == 0 {
            return;
        }
        self.position = if self.reversed {
            (self.position + count - 1) % count
        } else {
            (self.position + 1) % count
        };
    }

    fn encode(&self, path: &Path) -> SessionResult<String> {
        let image = image::open(path).map_err(|e| {
            SessionError::FrameSource(format!("failed to read {}: {}", path.display(), e))
        })?;
        encode_jpeg_data_uri(&image, self.jpeg_quality, self.max_width)
    }
}

impl FrameSource for DirectoryFrameSource {
    fn capture_frame(&mut self) -> Option<String> {
        let path = self.frames.get(self.position)?.clone();
        self.advance();
        match self.encode(&path) {
            Ok(frame) => {
                debug!("[FRAMES] Captured {}", path.display());
                Some(frame)
            }
            Err(e) => {
                warn!("[FRAMES] Skipping frame: {}", e);
                None
            }
        }
    }

    fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    fn toggle_camera(&mut self) {
        self.reversed = !self.reversed;
        info!(
            "[FRAMES] Playback direction: {}",
            if self.reversed { "reverse" } else { "forward" }
        );
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
