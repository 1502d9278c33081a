//! Configuration types for the click loop and the hotkey controller.
//!
//! Durations are written as strings (`"100ms"`, `"2s"`, `"5m"`); a bare
//! number means milliseconds. A [`Profile`] bundles everything a front-end
//! may want to remember between runs and round-trips through JSON; the core
//! components never touch the filesystem themselves.

use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClickerError, Result};
use crate::input::KeyChord;

/// Mouse button targeted by a click action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl FromStr for MouseButton {
    type Err = ClickerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            other => Err(ClickerError::invalid_config(format!(
                "unknown mouse button '{other}' (expected left, right or middle)"
            ))),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Middle => write!(f, "middle"),
        }
    }
}

/// The single simulated input gesture performed each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClickAction {
    /// Click a mouse button at the current cursor position.
    MouseClick {
        button: MouseButton,
        /// Dispatch two clicks back to back (a double click).
        #[serde(default)]
        double: bool,
    },
    /// Tap a key chord such as `"space"` or `"ctrl+shift+p"`.
    KeyPress { keys: String },
}

impl ClickAction {
    /// Short human-readable description, used in logs and failure reports.
    pub fn describe(&self) -> String {
        match self {
            Self::MouseClick {
                button,
                double: false,
            } => format!("{button} click"),
            Self::MouseClick {
                button,
                double: true,
            } => format!("double {button} click"),
            Self::KeyPress { keys } => format!("key press '{keys}'"),
        }
    }
}

/// Immutable snapshot of click parameters for a run.
///
/// Replaced wholesale by [`ClickLoop::configure`](crate::ClickLoop::configure);
/// the loop reads one snapshot per iteration boundary, so an update never
/// interrupts an in-flight wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    pub action: ClickAction,
    /// Base delay between cycles. Must be greater than zero.
    #[serde(with = "duration_str")]
    pub interval: Duration,
    /// Random cadence spread of up to +/- this much per cycle.
    #[serde(with = "duration_str")]
    pub jitter: Duration,
    /// Actions dispatched per cycle.
    pub burst: u32,
    /// One-shot countdown before the first cycle.
    #[serde(with = "duration_str")]
    pub start_delay: Duration,
    /// Stop automatically after this many simulated actions.
    pub limit: Option<u64>,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            action: ClickAction::MouseClick {
                button: MouseButton::Left,
                double: false,
            },
            interval: Duration::from_millis(100),
            jitter: Duration::ZERO,
            burst: 1,
            start_delay: Duration::ZERO,
            limit: None,
        }
    }
}

impl ClickConfig {
    /// Validate all invariants, leaving the config untouched.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ClickerError::invalid_config(
                "interval must be greater than zero",
            ));
        }
        if self.jitter > self.interval {
            return Err(ClickerError::invalid_config(
                "jitter must not exceed the interval",
            ));
        }
        if self.burst == 0 {
            return Err(ClickerError::invalid_config("burst must be at least 1"));
        }
        if self.limit == Some(0) {
            return Err(ClickerError::invalid_config(
                "click limit must be at least 1",
            ));
        }
        if let ClickAction::KeyPress { keys } = &self.action {
            KeyChord::parse(keys)?;
        }
        Ok(())
    }

    /// Number of simulated actions dispatched in one cycle.
    pub fn actions_per_cycle(&self) -> u64 {
        let per_action = match self.action {
            ClickAction::MouseClick { double: true, .. } => 2,
            _ => 1,
        };
        u64::from(self.burst) * per_action
    }
}

/// Global start/stop trigger keys, read-only once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyBinding {
    pub start: String,
    pub stop: String,
}

impl Default for HotkeyBinding {
    fn default() -> Self {
        Self {
            start: "f6".to_string(),
            stop: "f7".to_string(),
        }
    }
}

impl HotkeyBinding {
    pub fn validate(&self) -> Result<()> {
        let start = crate::hotkey::parse_hotkey(&self.start)?;
        let stop = crate::hotkey::parse_hotkey(&self.stop)?;
        if start.id() == stop.id() {
            return Err(ClickerError::invalid_hotkey(
                &self.stop,
                "start and stop hotkeys must differ",
            ));
        }
        Ok(())
    }
}

/// Everything a front-end may want to remember between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub click: ClickConfig,
    pub hotkeys: HotkeyBinding,
}

impl Profile {
    /// Load and validate a profile from a JSON file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ClickerError::profile_load(path, e.to_string()))?;
        let profile: Profile = serde_json::from_str(&contents)
            .map_err(|e| ClickerError::profile_load(path, e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Save the profile as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ClickerError::profile_save(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.click.validate()?;
        self.hotkeys.validate()
    }
}

/// Parse a duration string: an unsigned number with an optional `ms`, `s` or
/// `m` suffix. A bare number means milliseconds. Case-insensitive,
/// surrounding whitespace ignored.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let raw = value.trim().to_lowercase();
    if raw.is_empty() {
        return Err(ClickerError::invalid_duration(value, "empty duration"));
    }

    let (digits, per_unit_ms) = if let Some(digits) = raw.strip_suffix("ms") {
        (digits, 1u64)
    } else if let Some(digits) = raw.strip_suffix('s') {
        (digits, 1_000)
    } else if let Some(digits) = raw.strip_suffix('m') {
        (digits, 60_000)
    } else {
        (raw.as_str(), 1)
    };

    let amount: u64 = digits.trim().parse().map_err(|_| {
        ClickerError::invalid_duration(
            value,
            "expected a non-negative number with an optional ms/s/m suffix",
        )
    })?;

    amount
        .checked_mul(per_unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| ClickerError::invalid_duration(value, "duration too large"))
}

/// Format a duration in the shortest unit that divides it evenly.
pub fn format_duration(value: &Duration) -> String {
    let ms = value.as_millis();
    if ms != 0 && ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else if ms != 0 && ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{ms}ms")
    }
}

pub(crate) mod duration_str {
    //! Serde adapter storing durations as strings like `"150ms"`.

    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(D::Error::custom)
    }
}
