//! Custom error types for auto-clicker.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for auto-clicker operations.
#[derive(Error, Debug)]
pub enum ClickerError {
    /// Configuration validation error (non-positive interval, zero burst, ...).
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Error parsing a duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// The specified key token is invalid or unsupported.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Error parsing a hotkey specification.
    #[error("invalid hotkey '{combo}': {reason}")]
    InvalidHotkey { combo: String, reason: String },

    /// The platform denied creating or registering a global hotkey hook.
    #[error("global hotkeys unavailable: {0}")]
    HotkeyUnavailable(String),

    /// The input-simulation primitive rejected a dispatch.
    #[error("failed to dispatch {action}: {reason}")]
    SimulationFailure { action: String, reason: String },

    /// Error reading or parsing a profile file.
    #[error("failed to load profile from '{path}': {reason}")]
    ProfileLoad { path: String, reason: String },

    /// Error writing a profile file.
    #[error("failed to save profile to '{path}': {reason}")]
    ProfileSave { path: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for auto-clicker operations.
pub type Result<T> = std::result::Result<T, ClickerError>;

impl ClickerError {
    /// Create a new InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidHotkey error.
    pub fn invalid_hotkey(combo: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHotkey {
            combo: combo.into(),
            reason: reason.into(),
        }
    }

    /// Create a new HotkeyUnavailable error.
    pub fn hotkey_unavailable(message: impl Into<String>) -> Self {
        Self::HotkeyUnavailable(message.into())
    }

    /// Create a new SimulationFailure error.
    pub fn simulation_failure(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SimulationFailure {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ProfileLoad error.
    pub fn profile_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProfileLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ProfileSave error.
    pub fn profile_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProfileSave {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClickerError::invalid_config("interval must be greater than zero");
        assert_eq!(
            err.to_string(),
            "configuration error: interval must be greater than zero"
        );

        let err = ClickerError::invalid_key("xyz", "unknown key");
        assert_eq!(err.to_string(), "invalid key 'xyz': unknown key");

        let err = ClickerError::simulation_failure("left click", "no display session");
        assert_eq!(
            err.to_string(),
            "failed to dispatch left click: no display session"
        );

        let err = ClickerError::hotkey_unavailable("permission denied");
        assert_eq!(
            err.to_string(),
            "global hotkeys unavailable: permission denied"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ClickerError = io_err.into();
        assert!(matches!(err, ClickerError::Io(_)));
    }
}
