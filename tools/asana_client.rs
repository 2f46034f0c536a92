// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Asana Practice Client

Connects to the pose-detection service, replays a directory of still images
as the camera feed and prints live feedback until the practice completes or
Ctrl-C is pressed.

Usage:
  cargo run --bin asana_client -- --frames-dir ./frames [--asana 5] [--full-routine]

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use anyhow::{Context, Result};
use asana::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, AsanaConfig,
    ConfigError,
};
use asana::observability::{debug_flags_help, init_logging, parse_debug_flags};
use asana::session::prelude::*;
use asana::settings;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "asana_client",
    version,
    about = "Real-time yoga pose feedback client",
    after_help = debug_flags_help()
)]
struct Args {
    /// Routine to practice
    #[arg(long, default_value = "surya-namaskar")]
    routine: String,

    /// Single asana id within the routine (defaults to the routine's first pose)
    #[arg(long)]
    asana: Option<u32>,

    /// Practice the whole routine in order
    #[arg(long)]
    full_routine: bool,

    /// Directory of still images replayed as camera frames
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Detection server URL
    #[arg(long)]
    server_url: Option<String>,

    /// Directory where feedback audio clips are written
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// JSON routine catalog (defaults to the built-in one)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to asana_configuration.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(url) = &self.server_url {
            overrides.insert("server_url".to_string(), url.clone());
        }
        if let Some(dir) = &self.frames_dir {
            overrides.insert("frames_dir".to_string(), dir.display().to_string());
        }
        if let Some(dir) = &self.audio_dir {
            overrides.insert("audio_dir".to_string(), dir.display().to_string());
        }
        overrides
    }
}

/// Arguments left for clap once the `--debug-*` flags are removed
fn without_debug_flags(args: impl Iterator<Item = String>) -> Vec<String> {
    args.filter(|arg| !arg.starts_with("--debug-")).collect()
}

fn load_configuration(args: &Args) -> Result<AsanaConfig> {
    let overrides = args.config_overrides();
    let config = match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            eprintln!("No configuration file found, using defaults");
            let mut config = AsanaConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &overrides);
            config
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn resolve_target(args: &Args) -> Result<PracticeTarget> {
    let catalog = match &args.catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            Catalog::from_json(&json)?
        }
        None => Catalog::builtin(),
    };

    let routine = catalog
        .routine(&args.routine)
        .with_context(|| format!("Unknown routine '{}'", args.routine))?;

    let selected = match args.asana {
        Some(id) => Some(routine.asana(id).with_context(|| {
            format!("Asana {} is not part of routine '{}'", id, routine.id)
        })?),
        None => None,
    };

    Ok(PracticeTarget::from_selection(routine, selected, args.full_routine)?)
}

fn build_collaborators(config: &AsanaConfig) -> Result<Collaborators> {
    let frames_dir = config
        .capture
        .frames_dir
        .clone()
        .context("No frames directory; pass --frames-dir or set capture.frames_dir")?;
    let frame_source = DirectoryFrameSource::open(&frames_dir)
        .with_context(|| format!("Failed to open frames directory {}", frames_dir.display()))?
        .with_jpeg_quality(config.capture.jpeg_quality)
        .with_max_width(config.capture.max_width);

    let audio_sink: Arc<dyn AudioSink> = match &config.audio.output_dir {
        Some(dir) => Arc::new(FileAudioSink::new(dir)?),
        None => Arc::new(LoggingAudioSink),
    };

    Ok(Collaborators {
        frame_source: Box::new(frame_source),
        audio_sink,
        exit_handler: Box::new(|reason: ExitReason| info!("Session exit: {:?}", reason)),
    })
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let accuracy = snapshot
        .accuracy_percent()
        .map(|p| format!(" ({}% accuracy)", p))
        .unwrap_or_default();
    println!(
        "[{}] {}: {}{}",
        snapshot.status, snapshot.display_pose_name, snapshot.message, accuracy
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(without_debug_flags(std::env::args()));

    let config = load_configuration(&args)?;
    let logging = init_logging(&debug_flags, &settings::logging_config(&config))?;
    if let Some(dir) = logging.log_dir() {
        info!("Writing logs to {}", dir.display());
    }

    let target = resolve_target(&args)?;
    info!(
        "Practicing {:?} {:?} against {}",
        target.mode(),
        target.asana_ids(),
        config.server.url
    );

    let (client, handle) = SessionClient::connect(
        settings::client_config(&config),
        target,
        settings::session_client_config(&config),
        build_collaborators(&config)?,
    );
    let session = tokio::spawn(client.run());

    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(e) = ctrl_c.exit() {
                warn!("Exit request not delivered: {}", e);
            }
        }
    });

    let mut updates = handle.subscribe();
    let mut last_shown: Option<(DetectionStatus, String, String)> = None;
    loop {
        let snapshot = updates.borrow_and_update().clone();
        let shown = (
            snapshot.status,
            snapshot.message.clone(),
            snapshot.display_pose_name.clone(),
        );
        if last_shown.as_ref() != Some(&shown) {
            print_snapshot(&snapshot);
            last_shown = Some(shown);
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    let reason = session.await.context("Session task failed")??;
    if reason == ExitReason::SequenceComplete {
        println!("Congratulations! Practice completed!");
    }
    Ok(())
}
