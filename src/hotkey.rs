//! Global start/stop hotkeys.
//!
//! Wraps the `global-hotkey` crate: two system-wide trigger keys are
//! registered independently of window focus, and a blocking listener drains
//! the crate's event receiver. Key-repeat is debounced with a per-key latch
//! so each physical press invokes its callback at most once.

use std::thread;
use std::time::Duration;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::HotkeyBinding;
use crate::error::{ClickerError, Result};

type HotkeyCallback = Box<dyn Fn() + Send + 'static>;

struct Registration {
    start: HotKey,
    stop: HotKey,
    shutdown_tx: watch::Sender<bool>,
}

/// Listens system-wide for the start and stop trigger keys.
pub struct HotkeyController {
    manager: GlobalHotKeyManager,
    registration: Option<Registration>,
}

impl HotkeyController {
    /// Create the platform hook manager. Fails when the platform denies
    /// global input monitoring.
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| ClickerError::hotkey_unavailable(e.to_string()))?;
        Ok(Self {
            manager,
            registration: None,
        })
    }

    /// Register both trigger keys and begin listening.
    ///
    /// `on_start` and `on_stop` are invoked from the listener task, at most
    /// once per physical press. Listening continues until [`unregister`] or
    /// process exit.
    ///
    /// [`unregister`]: Self::unregister
    pub fn register(
        &mut self,
        binding: &HotkeyBinding,
        on_start: impl Fn() + Send + 'static,
        on_stop: impl Fn() + Send + 'static,
    ) -> Result<()> {
        if self.registration.is_some() {
            return Err(ClickerError::hotkey_unavailable(
                "hotkeys already registered",
            ));
        }

        let start = parse_hotkey(&binding.start)?;
        let stop = parse_hotkey(&binding.stop)?;
        if start.id() == stop.id() {
            return Err(ClickerError::invalid_hotkey(
                &binding.stop,
                "start and stop hotkeys must differ",
            ));
        }

        self.manager.register(start).map_err(|e| {
            ClickerError::hotkey_unavailable(format!(
                "failed to register '{}': {e}",
                binding.start
            ))
        })?;
        if let Err(e) = self.manager.register(stop) {
            let _ = self.manager.unregister(start);
            return Err(ClickerError::hotkey_unavailable(format!(
                "failed to register '{}': {e}",
                binding.stop
            )));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = HotkeyDispatcher::new(start.id(), stop.id());
        tokio::task::spawn_blocking(move || {
            listen(dispatcher, Box::new(on_start), Box::new(on_stop), shutdown_rx);
        });

        info!(start = %binding.start, stop = %binding.stop, "global hotkeys registered");
        self.registration = Some(Registration {
            start,
            stop,
            shutdown_tx,
        });
        Ok(())
    }

    /// Release the platform hooks and end the listener.
    ///
    /// The shutdown signal is raised before the hooks are released and the
    /// listener re-checks it before every callback. No-op when nothing is
    /// registered; registering again afterwards is permitted.
    pub fn unregister(&mut self) -> Result<()> {
        if let Some(Registration {
            start,
            stop,
            shutdown_tx,
        }) = self.registration.take()
        {
            let _ = shutdown_tx.send(true);
            self.manager
                .unregister(start)
                .map_err(|e| ClickerError::hotkey_unavailable(e.to_string()))?;
            self.manager
                .unregister(stop)
                .map_err(|e| ClickerError::hotkey_unavailable(e.to_string()))?;
            debug!("global hotkeys released");
        }
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }
}

impl Drop for HotkeyController {
    fn drop(&mut self) {
        let _ = self.unregister();
    }
}

fn listen(
    mut dispatcher: HotkeyDispatcher,
    on_start: HotkeyCallback,
    on_stop: HotkeyCallback,
    shutdown_rx: watch::Receiver<bool>,
) {
    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        if *shutdown_rx.borrow() {
            debug!("hotkey listener shut down");
            return;
        }
        while let Ok(event) = receiver.try_recv() {
            if *shutdown_rx.borrow() {
                return;
            }
            match dispatcher.handle(event.id, event.state == HotKeyState::Pressed) {
                Some(HotkeyAction::Start) => on_start(),
                Some(HotkeyAction::Stop) => on_stop(),
                None => {}
            }
        }
        // Small sleep to prevent busy waiting
        thread::sleep(Duration::from_millis(10));
    }
}

/// Which callback a hotkey event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HotkeyAction {
    Start,
    Stop,
}

/// Maps raw hotkey events to at most one action per physical press.
///
/// OS key-repeat emits a stream of pressed events while a key is held; the
/// latch arms on the first and re-arms only once the release arrives.
struct HotkeyDispatcher {
    start_id: u32,
    stop_id: u32,
    start_held: bool,
    stop_held: bool,
}

impl HotkeyDispatcher {
    fn new(start_id: u32, stop_id: u32) -> Self {
        Self {
            start_id,
            stop_id,
            start_held: false,
            stop_held: false,
        }
    }

    fn handle(&mut self, id: u32, pressed: bool) -> Option<HotkeyAction> {
        let (held, action) = if id == self.start_id {
            (&mut self.start_held, HotkeyAction::Start)
        } else if id == self.stop_id {
            (&mut self.stop_held, HotkeyAction::Stop)
        } else {
            return None;
        };

        if !pressed {
            *held = false;
            return None;
        }
        if *held {
            return None;
        }
        *held = true;
        Some(action)
    }
}

/// Parse a hotkey spec such as `f6` or `ctrl+alt+r` into a [`HotKey`].
pub fn parse_hotkey(spec: &str) -> Result<HotKey> {
    let lowered = spec.trim().to_lowercase();
    let mut modifiers = Modifiers::empty();
    let mut code = None;

    for token in lowered.split('+').map(str::trim) {
        match token {
            "" => return Err(ClickerError::invalid_hotkey(spec, "empty key token")),
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "meta" | "cmd" | "super" | "win" => modifiers |= Modifiers::SUPER,
            key => {
                if code.replace(key_code(spec, key)?).is_some() {
                    return Err(ClickerError::invalid_hotkey(
                        spec,
                        "more than one non-modifier key",
                    ));
                }
            }
        }
    }

    let code = code.ok_or_else(|| ClickerError::invalid_hotkey(spec, "no trigger key"))?;
    Ok(HotKey::new(
        (!modifiers.is_empty()).then_some(modifiers),
        code,
    ))
}

const LETTER_CODES: [Code; 26] = [
    Code::KeyA,
    Code::KeyB,
    Code::KeyC,
    Code::KeyD,
    Code::KeyE,
    Code::KeyF,
    Code::KeyG,
    Code::KeyH,
    Code::KeyI,
    Code::KeyJ,
    Code::KeyK,
    Code::KeyL,
    Code::KeyM,
    Code::KeyN,
    Code::KeyO,
    Code::KeyP,
    Code::KeyQ,
    Code::KeyR,
    Code::KeyS,
    Code::KeyT,
    Code::KeyU,
    Code::KeyV,
    Code::KeyW,
    Code::KeyX,
    Code::KeyY,
    Code::KeyZ,
];

const DIGIT_CODES: [Code; 10] = [
    Code::Digit0,
    Code::Digit1,
    Code::Digit2,
    Code::Digit3,
    Code::Digit4,
    Code::Digit5,
    Code::Digit6,
    Code::Digit7,
    Code::Digit8,
    Code::Digit9,
];

const FUNCTION_CODES: [Code; 12] = [
    Code::F1,
    Code::F2,
    Code::F3,
    Code::F4,
    Code::F5,
    Code::F6,
    Code::F7,
    Code::F8,
    Code::F9,
    Code::F10,
    Code::F11,
    Code::F12,
];

fn key_code(spec: &str, token: &str) -> Result<Code> {
    if let [b] = token.as_bytes() {
        if b.is_ascii_lowercase() {
            return Ok(LETTER_CODES[usize::from(b - b'a')]);
        }
        if b.is_ascii_digit() {
            return Ok(DIGIT_CODES[usize::from(b - b'0')]);
        }
    }

    if let Some(number) = token.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        if (1..=FUNCTION_CODES.len()).contains(&number) {
            return Ok(FUNCTION_CODES[number - 1]);
        }
    }

    let code = match token {
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" | "arrowup" => Code::ArrowUp,
        "down" | "arrowdown" => Code::ArrowDown,
        "left" | "arrowleft" => Code::ArrowLeft,
        "right" | "arrowright" => Code::ArrowRight,
        _ => {
            return Err(ClickerError::invalid_hotkey(
                spec,
                format!("unsupported key '{token}'"),
            ))
        }
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_modified_hotkeys() {
        assert!(parse_hotkey("f6").is_ok());
        assert!(parse_hotkey(" F7 ").is_ok());
        assert!(parse_hotkey("ctrl+alt+r").is_ok());
        assert!(parse_hotkey("cmd+shift+space").is_ok());

        assert_eq!(
            parse_hotkey("ctrl+alt+r").unwrap().id(),
            parse_hotkey("CTRL + ALT + R").unwrap().id()
        );
        assert_ne!(
            parse_hotkey("ctrl+alt+r").unwrap().id(),
            parse_hotkey("ctrl+alt+s").unwrap().id()
        );
    }

    #[test]
    fn rejects_malformed_hotkeys() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey("ctrl+").is_err());
        assert!(parse_hotkey("ctrl+shift").is_err());
        assert!(parse_hotkey("a+b").is_err());
        assert!(parse_hotkey("ctrl+notakey").is_err());
        assert!(parse_hotkey("f13").is_err());
    }

    #[test]
    fn dispatcher_fires_once_per_physical_press() {
        let mut dispatcher = HotkeyDispatcher::new(1, 2);

        assert_eq!(dispatcher.handle(1, true), Some(HotkeyAction::Start));
        // Key-repeat while held.
        assert_eq!(dispatcher.handle(1, true), None);
        assert_eq!(dispatcher.handle(1, true), None);
        assert_eq!(dispatcher.handle(1, false), None);
        // A fresh physical press fires again.
        assert_eq!(dispatcher.handle(1, true), Some(HotkeyAction::Start));
    }

    #[test]
    fn dispatcher_tracks_keys_independently() {
        let mut dispatcher = HotkeyDispatcher::new(1, 2);

        assert_eq!(dispatcher.handle(1, true), Some(HotkeyAction::Start));
        assert_eq!(dispatcher.handle(2, true), Some(HotkeyAction::Stop));
        assert_eq!(dispatcher.handle(2, false), None);
        assert_eq!(dispatcher.handle(2, true), Some(HotkeyAction::Stop));
        // Unrelated hotkey ids are ignored.
        assert_eq!(dispatcher.handle(9, true), None);
    }
}
