// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Asana - real-time yoga pose feedback
//!
//! Streams camera frames to a remote pose-detection service and turns its
//! classification results into live feedback during a practice session.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! asana = "0.1"  # Default: full feature set
//! ```
//!
//! ## Feature Flags
//!
//! - **`full`** (default): config + observability + session
//! - **`config`**: TOML configuration loader (`asana-config`)
//! - **`observability`**: logging setup and debug flags (`asana-observability`)
//! - **`session`**: session protocol client (`asana-session`)
//! - **`file-logging`**: per-run rolling log files
//! - **`tls`**: `wss://` support in the WebSocket channel
//!
//! ## Usage
//!
//! ```rust,no_run
//! use asana::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = asana::config::load_config(None, None)?;
//! let routine = surya_namaskar();
//! let target = PracticeTarget::routine(&routine)?;
//!
//! let collaborators = Collaborators {
//!     frame_source: Box::new(DirectoryFrameSource::open("./frames")?),
//!     audio_sink: Arc::new(LoggingAudioSink),
//!     exit_handler: Box::new(|_reason: ExitReason| {}),
//! };
//! let (client, _handle) = SessionClient::connect(
//!     asana::settings::client_config(&config),
//!     target,
//!     asana::settings::session_client_config(&config),
//!     collaborators,
//! );
//! let reason = client.run().await?;
//! println!("Session ended: {:?}", reason);
//! # Ok(())
//! # }
//! ```

pub use asana_transports as transports;

#[cfg(feature = "config")]
pub use asana_config as config;

#[cfg(feature = "observability")]
pub use asana_observability as observability;

#[cfg(feature = "session")]
pub use asana_session as session;

/// Bridges from the file configuration to the component configurations
#[cfg(all(feature = "config", feature = "session"))]
pub mod settings {
    use asana_config::AsanaConfig;
    use asana_session::{SessionClientConfig, SessionTiming};
    use asana_transports::ClientConfig;
    use std::time::Duration;

    pub fn client_config(config: &AsanaConfig) -> ClientConfig {
        let server = &config.server;
        ClientConfig::new(server.url.clone())
            .with_connect_timeout(Duration::from_millis(server.connect_timeout_ms))
            .with_max_message_size(server.max_message_bytes)
    }

    pub fn session_client_config(config: &AsanaConfig) -> SessionClientConfig {
        SessionClientConfig {
            timing: SessionTiming {
                frame_interval_ms: config.session.frame_interval_ms,
                exit_delay_ms: config.session.exit_delay_ms,
            },
            readiness_poll: Duration::from_millis(config.session.readiness_poll_ms),
            audio_mime_type: config.audio.mime_type.clone(),
        }
    }

    #[cfg(feature = "observability")]
    pub fn logging_config(config: &AsanaConfig) -> asana_observability::LoggingConfig {
        asana_observability::LoggingConfig {
            level: config.logging.level.clone(),
            format: if config.logging.json {
                asana_observability::LogFormat::Json
            } else {
                asana_observability::LogFormat::Text
            },
            file_dir: config.logging.file_dir.clone(),
            ..Default::default()
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::transports::{ClientConfig, ConnectionEvent, ConnectionState, MessageChannel};

    #[cfg(feature = "session")]
    pub use crate::session::prelude::*;

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, validate_config, AsanaConfig};
}
