// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! All checks run before failing so a single error lists every problem.

use crate::{AsanaConfig, ConfigError, ConfigResult};

/// Accepted range for the completion-to-exit delay, in milliseconds
pub const EXIT_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 1000..=2000;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &AsanaConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Run every check and return the failures
pub fn collect_errors(config: &AsanaConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_server(config, &mut errors);
    validate_session(config, &mut errors);
    validate_capture(config, &mut errors);
    errors
}

fn validate_server(config: &AsanaConfig, errors: &mut Vec<ConfigValidationError>) {
    let url = config.server.url.trim();
    if url.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "server.url".to_string(),
        });
    } else if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(invalid("server.url", "must start with ws:// or wss://"));
    }

    if config.server.max_message_bytes == 0 {
        errors.push(invalid("server.max_message_bytes", "must be greater than 0"));
    }
}

fn validate_session(config: &AsanaConfig, errors: &mut Vec<ConfigValidationError>) {
    let session = &config.session;
    if session.frame_interval_ms == 0 {
        errors.push(invalid("session.frame_interval_ms", "must be greater than 0"));
    }
    if !EXIT_DELAY_RANGE_MS.contains(&session.exit_delay_ms) {
        errors.push(invalid(
            "session.exit_delay_ms",
            &format!(
                "{} is outside {}..={}",
                session.exit_delay_ms,
                EXIT_DELAY_RANGE_MS.start(),
                EXIT_DELAY_RANGE_MS.end()
            ),
        ));
    }
    if session.readiness_poll_ms == 0 {
        errors.push(invalid("session.readiness_poll_ms", "must be greater than 0"));
    }
}

fn validate_capture(config: &AsanaConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(1..=100).contains(&config.capture.jpeg_quality) {
        errors.push(invalid("capture.jpeg_quality", "must be within 1..=100"));
    }
    if config.capture.max_width == Some(0) {
        errors.push(invalid("capture.max_width", "must be greater than 0"));
    }
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AsanaConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut config = AsanaConfig::default();
        config.server.url = "http://localhost:8765".to_string();
        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigValidationError::InvalidValue { field, .. } if field == "server.url"
        ));
    }

    #[test]
    fn test_exit_delay_bounds() {
        let mut config = AsanaConfig::default();
        config.session.exit_delay_ms = 1000;
        assert!(validate_config(&config).is_ok());
        config.session.exit_delay_ms = 999;
        assert!(validate_config(&config).is_err());
        config.session.exit_delay_ms = 2001;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = AsanaConfig::default();
        config.server.url = String::new();
        config.session.frame_interval_ms = 0;
        config.capture.jpeg_quality = 0;

        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 3);

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("server.url"));
        assert!(message.contains("session.frame_interval_ms"));
        assert!(message.contains("capture.jpeg_quality"));
    }
}
