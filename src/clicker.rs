//! The click loop: a background task dispatching simulated input at a
//! configured cadence.
//!
//! Run state lives on a `watch` channel owned by the loop and is mutated only
//! by [`ClickLoop::start`] and [`ClickLoop::stop`]. The timed wait between
//! cycles is the sole suspension point; cancellation is observed there and at
//! every iteration boundary. Each run carries a generation number so a task
//! left over from a previous run can never dispatch alongside a new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::{ClickAction, ClickConfig, MouseButton};
use crate::error::Result;
use crate::input::{InputBackend, KeyChord};

/// Gap between consecutive actions of a burst or double click.
const BURST_GAP: Duration = Duration::from_millis(10);

/// Lower bound on the wait between cycles after jitter is applied.
const MIN_DELAY: Duration = Duration::from_millis(5);

/// Current phase of the click loop, published on a `watch` channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopStatus {
    Idle,
    Countdown,
    Running,
    Stopped(StopReason),
}

/// Why the last run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Requested,
    LimitReached,
    Failure(String),
}

#[derive(Debug, Clone, Copy, Default)]
struct RunState {
    running: bool,
    generation: u64,
}

fn is_stale(state: &RunState, generation: u64) -> bool {
    !state.running || state.generation != generation
}

struct LoopInner {
    backend: Mutex<Box<dyn InputBackend>>,
    config: Mutex<ClickConfig>,
    clicks: AtomicU64,
    run_tx: watch::Sender<RunState>,
    status_tx: watch::Sender<LoopStatus>,
}

/// Produces a timed sequence of simulated input events on a background task.
///
/// Cheap to clone; all clones drive the same loop.
#[derive(Clone)]
pub struct ClickLoop {
    inner: Arc<LoopInner>,
}

impl std::fmt::Debug for ClickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickLoop").finish_non_exhaustive()
    }
}

impl ClickLoop {
    /// Create a stopped loop over the given backend and configuration.
    pub fn new(backend: impl InputBackend + 'static, config: ClickConfig) -> Result<Self> {
        config.validate()?;
        let (run_tx, _) = watch::channel(RunState::default());
        let (status_tx, _) = watch::channel(LoopStatus::Idle);
        Ok(Self {
            inner: Arc::new(LoopInner {
                backend: Mutex::new(Box::new(backend)),
                config: Mutex::new(config),
                clicks: AtomicU64::new(0),
                run_tx,
                status_tx,
            }),
        })
    }

    /// Replace the active configuration.
    ///
    /// Fails without side effects when the new configuration is invalid; the
    /// previous configuration stays in effect. A valid replacement is picked
    /// up at the next iteration boundary and never interrupts an in-flight
    /// wait.
    pub fn configure(&self, config: ClickConfig) -> Result<()> {
        config.validate()?;
        *lock(&self.inner.config) = config;
        Ok(())
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> ClickConfig {
        lock(&self.inner.config).clone()
    }

    /// Begin dispatching. No-op if already running.
    ///
    /// The loop runs on a spawned tokio task and does not block the caller;
    /// callers must be within a tokio runtime.
    pub fn start(&self) {
        let mut spawned = None;
        self.inner.run_tx.send_if_modified(|state| {
            if state.running {
                return false;
            }
            state.running = true;
            state.generation += 1;
            spawned = Some(state.generation);
            true
        });

        if let Some(generation) = spawned {
            debug!(generation, "starting click loop");
            tokio::spawn(run_loop(Arc::clone(&self.inner), generation));
        }
    }

    /// Stop dispatching. No-op if already stopped.
    ///
    /// The running task observes the flip at its wait point or at the next
    /// iteration boundary; at most one action already in flight may still
    /// land.
    pub fn stop(&self) {
        self.inner.run_tx.send_if_modified(|state| {
            if !state.running {
                return false;
            }
            state.running = false;
            true
        });
    }

    pub fn is_running(&self) -> bool {
        self.inner.run_tx.borrow().running
    }

    /// Total simulated actions dispatched since creation or the last reset.
    pub fn clicks(&self) -> u64 {
        self.inner.clicks.load(Ordering::Relaxed)
    }

    pub fn reset_clicks(&self) {
        self.inner.clicks.store(0, Ordering::Relaxed);
    }

    /// Subscribe to status transitions (idle, countdown, running, stopped).
    pub fn subscribe_status(&self) -> watch::Receiver<LoopStatus> {
        self.inner.status_tx.subscribe()
    }
}

/// One fully resolved gesture, parsed once per cycle.
enum CycleAction {
    Mouse(MouseButton),
    Keys(KeyChord),
}

impl CycleAction {
    fn resolve(action: &ClickAction) -> Result<Self> {
        Ok(match action {
            ClickAction::MouseClick { button, .. } => Self::Mouse(*button),
            ClickAction::KeyPress { keys } => Self::Keys(KeyChord::parse(keys)?),
        })
    }

    fn dispatch(&self, backend: &mut dyn InputBackend) -> Result<()> {
        match self {
            Self::Mouse(button) => backend.mouse_click(*button),
            Self::Keys(chord) => backend.key_tap(chord),
        }
    }
}

async fn run_loop(inner: Arc<LoopInner>, generation: u64) {
    let mut run_rx = inner.run_tx.subscribe();

    let start_delay = lock(&inner.config).start_delay;
    if !start_delay.is_zero() {
        let _ = inner.status_tx.send(LoopStatus::Countdown);
        tokio::select! {
            _ = time::sleep(start_delay) => {}
            _ = run_rx.wait_for(|state| is_stale(state, generation)) => {
                finish(&inner, generation, StopReason::Requested);
                return;
            }
        }
    }

    let _ = inner.status_tx.send(LoopStatus::Running);
    info!("click loop running");
    let mut dispatched: u64 = 0;

    loop {
        if is_stale(&run_rx.borrow(), generation) {
            finish(&inner, generation, StopReason::Requested);
            return;
        }

        // Iteration-boundary snapshot; configure() updates land here.
        let config = lock(&inner.config).clone();

        if let Some(limit) = config.limit {
            if dispatched >= limit {
                info!(dispatched, "click limit reached");
                finish(&inner, generation, StopReason::LimitReached);
                return;
            }
        }

        let action = match CycleAction::resolve(&config.action) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "unresolvable action; stopping");
                finish(&inner, generation, StopReason::Failure(e.to_string()));
                return;
            }
        };

        for index in 0..config.actions_per_cycle() {
            if index > 0 {
                time::sleep(BURST_GAP).await;
                if is_stale(&run_rx.borrow(), generation) {
                    finish(&inner, generation, StopReason::Requested);
                    return;
                }
            }
            if let Err(e) = action.dispatch(lock(&inner.backend).as_mut()) {
                warn!(error = %e, "input dispatch failed; stopping");
                finish(&inner, generation, StopReason::Failure(e.to_string()));
                return;
            }
            dispatched += 1;
            inner.clicks.fetch_add(1, Ordering::Relaxed);
        }

        let delay = jittered_delay(&config);
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = run_rx.wait_for(|state| is_stale(state, generation)) => {
                finish(&inner, generation, StopReason::Requested);
                return;
            }
        }
    }
}

fn finish(inner: &LoopInner, generation: u64, reason: StopReason) {
    let mut current = false;
    inner.run_tx.send_if_modified(|state| {
        current = state.generation == generation;
        if current && state.running {
            state.running = false;
            return true;
        }
        false
    });
    // A stale task stays silent; the newer run owns the status channel.
    if current {
        debug!(?reason, "click loop stopped");
        let _ = inner.status_tx.send(LoopStatus::Stopped(reason));
    }
}

fn jittered_delay(config: &ClickConfig) -> Duration {
    if config.jitter.is_zero() {
        return config.interval;
    }
    let spread = config.jitter.as_millis() as i64;
    let offset = rand::thread_rng().gen_range(-spread..=spread);
    let delay = config.interval.as_millis() as i64 + offset;
    Duration::from_millis(delay.max(MIN_DELAY.as_millis() as i64) as u64)
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClickerError;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Instant>>>,
        fail: Arc<AtomicBool>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    struct RecordingBackend(Recorder);

    impl InputBackend for RecordingBackend {
        fn mouse_click(&mut self, button: MouseButton) -> Result<()> {
            if self.0.fail.load(Ordering::Relaxed) {
                return Err(ClickerError::simulation_failure(
                    format!("{button} click"),
                    "display gone",
                ));
            }
            self.0.events.lock().unwrap().push(Instant::now());
            Ok(())
        }

        fn key_tap(&mut self, _chord: &KeyChord) -> Result<()> {
            self.0.events.lock().unwrap().push(Instant::now());
            Ok(())
        }
    }

    fn config_with_interval(ms: u64) -> ClickConfig {
        ClickConfig {
            interval: Duration::from_millis(ms),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn dispatches_at_configured_cadence_until_stopped() {
        let recorder = Recorder::default();
        let clicker =
            ClickLoop::new(RecordingBackend(recorder.clone()), config_with_interval(20)).unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(110)).await;
        clicker.stop();
        time::sleep(Duration::from_millis(50)).await;

        let after_stop = recorder.count();
        assert!(
            (3..=8).contains(&after_stop),
            "expected 3..=8 dispatches, got {after_stop}"
        );
        assert!(!clicker.is_running());

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.count(), after_stop, "dispatched after stop");
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let recorder = Recorder::default();
        let clicker =
            ClickLoop::new(RecordingBackend(recorder.clone()), config_with_interval(10)).unwrap();

        clicker.stop();
        assert!(!clicker.is_running());

        clicker.start();
        time::sleep(Duration::from_millis(15)).await;
        clicker.stop();
        clicker.stop();
        assert!(!clicker.is_running());

        time::sleep(Duration::from_millis(30)).await;
        let status = clicker.subscribe_status().borrow().clone();
        assert_eq!(status, LoopStatus::Stopped(StopReason::Requested));
    }

    #[tokio::test]
    async fn start_while_running_does_not_double_dispatch() {
        let recorder = Recorder::default();
        let clicker =
            ClickLoop::new(RecordingBackend(recorder.clone()), config_with_interval(50)).unwrap();

        clicker.start();
        clicker.start();
        time::sleep(Duration::from_millis(130)).await;
        clicker.stop();

        let count = recorder.count();
        assert!(
            (2..=4).contains(&count),
            "a second loop would have doubled the count, got {count}"
        );
    }

    #[tokio::test]
    async fn invalid_configure_keeps_previous_config() {
        let clicker = ClickLoop::new(
            RecordingBackend(Recorder::default()),
            config_with_interval(100),
        )
        .unwrap();

        let err = clicker.configure(config_with_interval(0)).unwrap_err();
        assert!(matches!(err, ClickerError::InvalidConfig(_)));
        assert_eq!(clicker.config().interval, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn reconfigure_waits_for_the_inflight_interval() {
        let recorder = Recorder::default();
        let clicker = ClickLoop::new(
            RecordingBackend(recorder.clone()),
            config_with_interval(200),
        )
        .unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(20)).await;
        clicker.configure(config_with_interval(10)).unwrap();

        // Still inside the first 200ms wait: only the initial dispatch.
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.count(), 1);

        // After the in-flight wait completes the new cadence applies.
        time::sleep(Duration::from_millis(150)).await;
        assert!(recorder.count() >= 4, "got {}", recorder.count());
        clicker.stop();
    }

    #[tokio::test]
    async fn stops_after_click_limit() {
        let recorder = Recorder::default();
        let config = ClickConfig {
            limit: Some(3),
            ..config_with_interval(5)
        };
        let clicker = ClickLoop::new(RecordingBackend(recorder.clone()), config).unwrap();
        let mut status_rx = clicker.subscribe_status();

        clicker.start();
        time::sleep(Duration::from_millis(150)).await;

        assert_eq!(recorder.count(), 3);
        assert_eq!(clicker.clicks(), 3);
        assert!(!clicker.is_running());
        assert_eq!(
            *status_rx.borrow_and_update(),
            LoopStatus::Stopped(StopReason::LimitReached)
        );
    }

    #[tokio::test]
    async fn dispatch_failure_stops_the_loop() {
        let recorder = Recorder::default();
        recorder.fail.store(true, Ordering::Relaxed);
        let clicker =
            ClickLoop::new(RecordingBackend(recorder.clone()), config_with_interval(10)).unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(50)).await;

        assert!(!clicker.is_running());
        assert_eq!(recorder.count(), 0);
        let status = clicker.subscribe_status().borrow().clone();
        assert!(matches!(
            status,
            LoopStatus::Stopped(StopReason::Failure(_))
        ));
    }

    #[tokio::test]
    async fn start_delay_defers_the_first_dispatch() {
        let recorder = Recorder::default();
        let config = ClickConfig {
            start_delay: Duration::from_millis(80),
            ..config_with_interval(10)
        };
        let clicker = ClickLoop::new(RecordingBackend(recorder.clone()), config).unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(40)).await;
        assert_eq!(recorder.count(), 0);
        assert_eq!(*clicker.subscribe_status().borrow(), LoopStatus::Countdown);

        time::sleep(Duration::from_millis(100)).await;
        assert!(recorder.count() >= 1);
        clicker.stop();
    }

    #[tokio::test]
    async fn double_mode_dispatches_two_clicks_per_cycle() {
        let recorder = Recorder::default();
        let config = ClickConfig {
            action: ClickAction::MouseClick {
                button: MouseButton::Left,
                double: true,
            },
            limit: Some(4),
            ..config_with_interval(30)
        };
        let clicker = ClickLoop::new(RecordingBackend(recorder.clone()), config).unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(recorder.count(), 4);
        assert!(!clicker.is_running());
    }

    #[tokio::test]
    async fn click_counter_resets_on_demand() {
        let recorder = Recorder::default();
        let config = ClickConfig {
            limit: Some(2),
            ..config_with_interval(5)
        };
        let clicker = ClickLoop::new(RecordingBackend(recorder.clone()), config).unwrap();

        clicker.start();
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(clicker.clicks(), 2);

        clicker.reset_clicks();
        assert_eq!(clicker.clicks(), 0);
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let config = ClickConfig {
            interval: Duration::from_millis(100),
            jitter: Duration::from_millis(40),
            ..Default::default()
        };
        for _ in 0..200 {
            let delay = jittered_delay(&config);
            assert!(delay >= Duration::from_millis(60));
            assert!(delay <= Duration::from_millis(140));
        }

        let plain = config_with_interval(80);
        assert_eq!(jittered_delay(&plain), Duration::from_millis(80));
    }

    #[test]
    fn jittered_delay_never_drops_below_floor() {
        let config = ClickConfig {
            interval: Duration::from_millis(6),
            jitter: Duration::from_millis(6),
            ..Default::default()
        };
        for _ in 0..200 {
            assert!(jittered_delay(&config) >= MIN_DELAY);
        }
    }
}
