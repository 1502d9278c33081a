//! Input simulation.
//!
//! The click loop reaches the platform through the [`InputBackend`] trait so
//! tests can substitute a recording backend. The production implementation,
//! [`EnigoBackend`], wraps the `enigo` crate and dispatches synthetic mouse
//! clicks at the current cursor position and synthetic key chords.

use std::fmt;

use enigo::{Button, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::config::MouseButton;
use crate::error::{ClickerError, Result};

/// A platform service capable of dispatching synthetic input events.
pub trait InputBackend: Send {
    /// Click a mouse button at the current cursor position.
    fn mouse_click(&mut self, button: MouseButton) -> Result<()>;

    /// Tap a key chord: press every key in order, release in reverse order.
    fn key_tap(&mut self, chord: &KeyChord) -> Result<()>;
}

/// A parsed `+`-separated key combination such as `ctrl+shift+p`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChord {
    keys: Vec<Key>,
    spec: String,
}

impl KeyChord {
    /// Parse a chord spec. Tokens are single characters, digits, modifiers
    /// (ctrl, shift, alt, meta/cmd/super/win), f1-f12 or named keys such as
    /// `space` and `enter`.
    pub fn parse(spec: &str) -> Result<Self> {
        let tokens: Vec<&str> = spec
            .split('+')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(ClickerError::invalid_key(spec, "empty key chord"));
        }

        let mut keys = Vec::with_capacity(tokens.len());
        for token in &tokens {
            keys.push(parse_key_token(token)?);
        }

        Ok(Self {
            keys,
            spec: tokens.join("+").to_lowercase(),
        })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}

fn parse_key_token(token: &str) -> Result<Key> {
    let lower = token.to_lowercase();

    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Key::Unicode(c));
    }

    if let Some(number) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return function_key(number)
            .ok_or_else(|| ClickerError::invalid_key(token, "function keys f1-f12 are supported"));
    }

    let key = match lower.as_str() {
        "ctrl" | "control" => Key::Control,
        "shift" => Key::Shift,
        "alt" => Key::Alt,
        "meta" | "cmd" | "super" | "win" => Key::Meta,
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "up" | "arrowup" => Key::UpArrow,
        "down" | "arrowdown" => Key::DownArrow,
        "left" | "arrowleft" => Key::LeftArrow,
        "right" | "arrowright" => Key::RightArrow,
        _ => return Err(ClickerError::invalid_key(token, "unknown key")),
    };
    Ok(key)
}

fn function_key(number: u8) -> Option<Key> {
    let key = match number {
        1 => Key::F1,
        2 => Key::F2,
        3 => Key::F3,
        4 => Key::F4,
        5 => Key::F5,
        6 => Key::F6,
        7 => Key::F7,
        8 => Key::F8,
        9 => Key::F9,
        10 => Key::F10,
        11 => Key::F11,
        12 => Key::F12,
        _ => return None,
    };
    Some(key)
}

/// Dispatches input through `enigo`.
pub struct EnigoBackend {
    enigo: Enigo,
}

impl EnigoBackend {
    /// Connect to the platform input subsystem. Fails when no display or
    /// input session is available.
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClickerError::simulation_failure("input driver setup", e.to_string()))?;
        Ok(Self { enigo })
    }
}

impl InputBackend for EnigoBackend {
    fn mouse_click(&mut self, button: MouseButton) -> Result<()> {
        let target = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.enigo
            .button(target, Direction::Click)
            .map_err(|e| ClickerError::simulation_failure(format!("{button} click"), e.to_string()))
    }

    fn key_tap(&mut self, chord: &KeyChord) -> Result<()> {
        let keys = chord.keys();
        for (index, key) in keys.iter().enumerate() {
            if let Err(e) = self.enigo.key(*key, Direction::Press) {
                // Release anything already held before reporting the failure.
                for held in keys[..index].iter().rev() {
                    let _ = self.enigo.key(*held, Direction::Release);
                }
                return Err(ClickerError::simulation_failure(
                    format!("key press '{chord}'"),
                    e.to_string(),
                ));
            }
        }
        for key in keys.iter().rev() {
            self.enigo.key(*key, Direction::Release).map_err(|e| {
                ClickerError::simulation_failure(format!("key press '{chord}'"), e.to_string())
            })?;
        }
        Ok(())
    }
}
