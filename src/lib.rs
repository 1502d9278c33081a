//! # Auto Clicker
//!
//! A cross-platform auto clicker: simulates mouse clicks or key presses at a
//! configurable interval, started and stopped through global hotkeys.
//!
//! ## Features
//!
//! - Left, right or middle mouse clicks at the current cursor position
//! - Key chords with modifiers (`space`, `ctrl+shift+p`, ...)
//! - Adjustable cadence with optional random jitter
//! - Burst and double-click modes, start countdown, optional click limit
//! - Global start/stop hotkeys, debounced against key-repeat
//! - Status channel and click counter for front-ends
//! - JSON profile support
//!
//! ## Example
//!
//! ```no_run
//! use auto_clicker::{ClickConfig, ClickLoop, EnigoBackend, HotkeyBinding, HotkeyController};
//!
//! # #[tokio::main]
//! # async fn main() -> auto_clicker::Result<()> {
//! let backend = EnigoBackend::new()?;
//! let clicker = ClickLoop::new(backend, ClickConfig::default())?;
//!
//! let mut hotkeys = HotkeyController::new()?;
//! let (start, stop) = (clicker.clone(), clicker.clone());
//! hotkeys.register(&HotkeyBinding::default(), move || start.start(), move || stop.stop())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Profiles
//!
//! Front-ends may remember settings as JSON:
//!
//! ```json
//! {
//!   "click": {
//!     "action": {"type": "mouse_click", "button": "left"},
//!     "interval": "100ms",
//!     "jitter": "20ms"
//!   },
//!   "hotkeys": {"start": "f6", "stop": "f7"}
//! }
//! ```

pub mod clicker;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod input;

pub use clicker::{ClickLoop, LoopStatus, StopReason};
pub use config::{ClickAction, ClickConfig, HotkeyBinding, MouseButton, Profile};
pub use error::{ClickerError, Result};
pub use hotkey::HotkeyController;
pub use input::{EnigoBackend, InputBackend, KeyChord};
