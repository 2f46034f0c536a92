// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are layered in three tiers, later tiers winning:
//! 1. TOML file
//! 2. Environment variables
//! 3. CLI arguments

use crate::{AsanaConfig, ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the configuration file
///
/// Search order:
/// 1. `ASANA_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("ASANA_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by ASANA_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet ASANA_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// When `config_path` is `None` the file is located with [`find_config_file`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<AsanaConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: AsanaConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ASANA_SERVER_URL` -> `server.url`
/// - `ASANA_CONNECT_TIMEOUT_MS` -> `server.connect_timeout_ms`
/// - `ASANA_FRAME_INTERVAL_MS` -> `session.frame_interval_ms`
/// - `ASANA_EXIT_DELAY_MS` -> `session.exit_delay_ms`
/// - `ASANA_READINESS_POLL_MS` -> `session.readiness_poll_ms`
/// - `ASANA_FRAMES_DIR` -> `capture.frames_dir`
/// - `ASANA_AUDIO_DIR` -> `audio.output_dir`
/// - `ASANA_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut AsanaConfig) {
    let vars: HashMap<String, String> = [
        ("ASANA_SERVER_URL", "server_url"),
        ("ASANA_CONNECT_TIMEOUT_MS", "connect_timeout_ms"),
        ("ASANA_FRAME_INTERVAL_MS", "frame_interval_ms"),
        ("ASANA_EXIT_DELAY_MS", "exit_delay_ms"),
        ("ASANA_READINESS_POLL_MS", "readiness_poll_ms"),
        ("ASANA_FRAMES_DIR", "frames_dir"),
        ("ASANA_AUDIO_DIR", "audio_dir"),
        ("ASANA_LOG_LEVEL", "log_level"),
    ]
    .into_iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `server_url`, `connect_timeout_ms`, `frame_interval_ms`,
/// `exit_delay_ms`, `readiness_poll_ms`, `frames_dir`, `audio_dir`, `log_level`.
/// Unparseable numeric values are ignored.
pub fn apply_cli_overrides(config: &mut AsanaConfig, cli_args: &HashMap<String, String>) {
    apply_overrides(config, cli_args);
}

fn apply_overrides(config: &mut AsanaConfig, values: &HashMap<String, String>) {
    if let Some(value) = values.get("server_url") {
        config.server.url = value.clone();
    }
    if let Some(ms) = parse_u64(values, "connect_timeout_ms") {
        config.server.connect_timeout_ms = ms;
    }
    if let Some(ms) = parse_u64(values, "frame_interval_ms") {
        config.session.frame_interval_ms = ms;
    }
    if let Some(ms) = parse_u64(values, "exit_delay_ms") {
        config.session.exit_delay_ms = ms;
    }
    if let Some(ms) = parse_u64(values, "readiness_poll_ms") {
        config.session.readiness_poll_ms = ms;
    }
    if let Some(value) = values.get("frames_dir") {
        config.capture.frames_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = values.get("audio_dir") {
        config.audio.output_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = values.get("log_level") {
        config.logging.level = value.clone();
    }
}

fn parse_u64(values: &HashMap<String, String>, key: &str) -> Option<u64> {
    values.get(key).and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("ASANA_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("ASANA_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("ASANA_CONFIG_PATH", "/definitely/not/here.toml");
        let result = find_config_file();
        env::remove_var("ASANA_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_partial_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("ASANA_SERVER_URL");
        env::remove_var("ASANA_FRAME_INTERVAL_MS");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "url = \"ws://studio.local:9000\"").unwrap();
        writeln!(file, "[session]").unwrap();
        writeln!(file, "exit_delay_ms = 1500").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.server.url, "ws://studio.local:9000");
        assert_eq!(config.session.exit_delay_ms, 1500);
        // untouched sections keep defaults
        assert_eq!(config.session.frame_interval_ms, 2000);
        assert_eq!(config.capture.jpeg_quality, 80);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[server\nurl = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = AsanaConfig::default();

        env::set_var("ASANA_SERVER_URL", "ws://10.0.0.5:8765");
        env::set_var("ASANA_FRAME_INTERVAL_MS", "1000");
        env::set_var("ASANA_EXIT_DELAY_MS", "not-a-number");
        env::set_var("ASANA_READINESS_POLL_MS", "100");

        apply_environment_overrides(&mut config);

        env::remove_var("ASANA_SERVER_URL");
        env::remove_var("ASANA_FRAME_INTERVAL_MS");
        env::remove_var("ASANA_EXIT_DELAY_MS");
        env::remove_var("ASANA_READINESS_POLL_MS");

        assert_eq!(config.server.url, "ws://10.0.0.5:8765");
        assert_eq!(config.session.frame_interval_ms, 1000);
        assert_eq!(config.session.exit_delay_ms, 2000);
        assert_eq!(config.session.readiness_poll_ms, 100);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AsanaConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("frames_dir".to_string(), "/tmp/frames".to_string());
        cli_args.insert("log_level".to_string(), "debug".to_string());
        cli_args.insert("readiness_poll_ms".to_string(), "500".to_string());

        apply_cli_overrides(&mut config, &cli_args);
        assert_eq!(config.session.readiness_poll_ms, 500);

        assert_eq!(config.capture.frames_dir, Some(PathBuf::from("/tmp/frames")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "url = \"ws://file-host:8765\"").unwrap();
        writeln!(file, "[session]").unwrap();
        writeln!(file, "frame_interval_ms = 3000").unwrap();

        env::set_var("ASANA_SERVER_URL", "ws://env-host:8765");
        env::set_var("ASANA_FRAME_INTERVAL_MS", "2500");

        let mut cli_args = HashMap::new();
        cli_args.insert("server_url".to_string(), "ws://cli-host:8765".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("ASANA_SERVER_URL");
        env::remove_var("ASANA_FRAME_INTERVAL_MS");

        // CLI wins for url, env wins for interval (no CLI override)
        assert_eq!(config.server.url, "ws://cli-host:8765");
        assert_eq!(config.session.frame_interval_ms, 2500);
    }
}
