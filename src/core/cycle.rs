// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Cyclic update loop - one background task per component
//!
//! Every cyclic component owns its own task instead of sharing a pool:
//! sensor bus reads and subprocess calls block for unpredictable spans and
//! must not head-of-line-block each other. The loop runs an init step until
//! it first succeeds, then an update step per tick, and survives any error
//! either step raises. Readings stay stale rather than the loop dying.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const MIN_STOP_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Work performed by a cyclic component's background loop.
#[async_trait]
pub trait Cyclic: Send + Sync + 'static {
    /// One-time setup, attempted every cycle until it first succeeds.
    /// Components that need no setup inherit the default.
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Periodic work, invoked once per cycle after init has succeeded.
    async fn update(&self) -> anyhow::Result<()>;
}

/// Timing parameters of one cyclic component.
#[derive(Debug, Clone, Copy)]
pub struct CycleTiming {
    /// Delay before the first init attempt, for slow hardware bring-up.
    pub init_wait: Duration,
    /// Time between update ticks.
    pub update_interval: Duration,
    /// How long `stop` waits for the loop to acknowledge before giving up.
    pub stop_timeout: Duration,
}

impl CycleTiming {
    /// Timing with no init wait and a stop timeout derived from the
    /// interval, clamped so slow pollers still shut down promptly.
    pub fn new(update_interval: Duration) -> Self {
        let stop_timeout = update_interval
            .saturating_mul(2)
            .clamp(MIN_STOP_TIMEOUT, MAX_STOP_TIMEOUT);
        Self {
            init_wait: Duration::ZERO,
            update_interval,
            stop_timeout,
        }
    }

    /// Wait this long before the first init attempt.
    pub fn with_init_wait(mut self, init_wait: Duration) -> Self {
        self.init_wait = init_wait;
        self
    }

    /// Override the stop timeout.
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }
}

/// Flags shared between the owning component and its running task.
struct LoopState {
    ready: AtomicBool,
    alive: AtomicBool,
    errors: AtomicU64,
}

/// Drives one component's background loop.
///
/// Embedded by cyclic components; the component passes itself as the
/// [`Cyclic`] ops when activating. Readiness transitions false to true at
/// most once per activation, and `stop` is idempotent, bounded, and safe to
/// call before the loop ever started. A stopped loop may be activated
/// again, which begins a fresh init phase.
pub struct UpdateLoop {
    name: &'static str,
    timing: CycleTiming,
    state: Arc<LoopState>,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl UpdateLoop {
    /// Create an inactive loop. Nothing runs until [`UpdateLoop::spawn`].
    pub fn new(name: &'static str, timing: CycleTiming) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            name,
            timing,
            state: Arc::new(LoopState {
                ready: AtomicBool::new(false),
                alive: AtomicBool::new(false),
                errors: AtomicU64::new(0),
            }),
            cancel,
            task: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Start the background task. A second call while the loop is running
    /// is logged and ignored.
    pub fn spawn(&self, ops: Arc<dyn Cyclic>) {
        let mut task = self.task.lock();
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                warn!("{}: update loop already running", self.name);
                return;
            }
        }
        self.cancel.send_replace(false);
        self.started.store(true, Ordering::SeqCst);

        let name = self.name;
        let timing = self.timing;
        let state = self.state.clone();
        let cancel_rx = self.cancel.subscribe();
        *task = Some(tokio::spawn(run_loop(name, timing, ops, state, cancel_rx)));
        debug!("{}: update loop started, interval {:?}", name, timing.update_interval);
    }

    /// Signal the loop to exit and wait up to the stop timeout for it. A
    /// loop that does not acknowledge in time is logged and abandoned; it
    /// still exits at its next cancellation checkpoint.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        self.cancel.send_replace(true);
        let Some(handle) = handle else {
            return;
        };
        match tokio::time::timeout(self.timing.stop_timeout, handle).await {
            Ok(Ok(())) => debug!("{}: update loop stopped", self.name),
            Ok(Err(err)) => warn!("{}: update loop task failed: {}", self.name, err),
            Err(_) => warn!(
                "{}: update loop did not stop within {:?}",
                self.name, self.timing.stop_timeout
            ),
        }
        self.state.ready.store(false, Ordering::SeqCst);
    }

    /// First init step has completed during the current activation.
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::SeqCst)
    }

    /// The loop task is scheduled and has not been told to exit.
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst) && !*self.cancel.borrow()
    }

    /// The loop has been activated at least once.
    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Total init/update failures since construction.
    pub fn error_count(&self) -> u64 {
        self.state.errors.load(Ordering::Relaxed)
    }
}

async fn run_loop(
    name: &'static str,
    timing: CycleTiming,
    ops: Arc<dyn Cyclic>,
    state: Arc<LoopState>,
    mut cancel: watch::Receiver<bool>,
) {
    state.alive.store(true, Ordering::SeqCst);

    if !timing.init_wait.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(timing.init_wait) => {}
            _ = cancelled(&mut cancel) => {
                state.alive.store(false, Ordering::SeqCst);
                return;
            }
        }
    }

    let mut ticker = tokio::time::interval(timing.update_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first interval tick completes immediately
    ticker.tick().await;

    loop {
        if *cancel.borrow() {
            break;
        }
        // Errors are confined to the loop: log, count, carry on with the
        // previous ready state and buffer contents intact.
        if !state.ready.load(Ordering::SeqCst) {
            match ops.init().await {
                Ok(()) => {
                    state.ready.store(true, Ordering::SeqCst);
                    debug!("{}: ready", name);
                }
                Err(err) => {
                    state.errors.fetch_add(1, Ordering::Relaxed);
                    error!("{}: init failed: {:#}", name, err);
                }
            }
        } else if let Err(err) = ops.update().await {
            state.errors.fetch_add(1, Ordering::Relaxed);
            warn!("{}: update failed: {:#}", name, err);
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancelled(&mut cancel) => break,
        }
    }
    state.alive.store(false, Ordering::SeqCst);
}

/// Resolves once the stop flag flips to true (or its sender is gone).
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    struct Counting {
        init_calls: AtomicU64,
        update_calls: AtomicU64,
        fail_init: bool,
        fail_update: bool,
    }

    impl Counting {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                init_calls: AtomicU64::new(0),
                update_calls: AtomicU64::new(0),
                fail_init: false,
                fail_update: false,
            })
        }

        fn failing_init() -> Arc<Self> {
            Arc::new(Self {
                init_calls: AtomicU64::new(0),
                update_calls: AtomicU64::new(0),
                fail_init: true,
                fail_update: false,
            })
        }

        fn failing_update() -> Arc<Self> {
            Arc::new(Self {
                init_calls: AtomicU64::new(0),
                update_calls: AtomicU64::new(0),
                fail_init: false,
                fail_update: true,
            })
        }
    }

    #[async_trait]
    impl Cyclic for Counting {
        async fn init(&self) -> anyhow::Result<()> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("init refused");
            }
            Ok(())
        }

        async fn update(&self) -> anyhow::Result<()> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_update {
                anyhow::bail!("update refused");
            }
            Ok(())
        }
    }

    fn fast_timing() -> CycleTiming {
        CycleTiming::new(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn stop_before_start_is_a_noop() {
        let cycle = UpdateLoop::new("test", fast_timing());
        cycle.stop().await;
        assert!(!cycle.is_alive());
        assert!(!cycle.is_ready());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let cycle = Arc::new(UpdateLoop::new("test", fast_timing()));
        let ops = Counting::new();
        cycle.spawn(ops.clone());
        cycle.stop().await;
        cycle.stop().await;
        assert!(!cycle.is_alive());
    }

    #[tokio::test]
    async fn init_runs_once_then_updates_tick() {
        let cycle = UpdateLoop::new("test", fast_timing());
        let ops = Counting::new();
        cycle.spawn(ops.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cycle.is_alive());
        assert!(cycle.is_ready());
        assert_eq!(ops.init_calls.load(Ordering::SeqCst), 1);
        assert!(ops.update_calls.load(Ordering::SeqCst) >= 3);

        cycle.stop().await;
        assert!(!cycle.is_alive());
        let frozen = ops.update_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(ops.update_calls.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test]
    async fn failing_init_keeps_loop_alive_but_never_ready() {
        let cycle = UpdateLoop::new("test", fast_timing());
        let ops = Counting::failing_init();
        cycle.spawn(ops.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cycle.is_alive());
        assert!(!cycle.is_ready());
        assert!(ops.init_calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(ops.update_calls.load(Ordering::SeqCst), 0);
        assert!(cycle.error_count() >= 2);

        cycle.stop().await;
    }

    #[tokio::test]
    async fn failing_update_does_not_terminate_the_loop() {
        let cycle = UpdateLoop::new("test", fast_timing());
        let ops = Counting::failing_update();
        cycle.spawn(ops.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cycle.is_alive());
        assert!(cycle.is_ready());
        assert!(ops.update_calls.load(Ordering::SeqCst) >= 3);

        cycle.stop().await;
    }

    #[tokio::test]
    async fn init_wait_delays_the_first_attempt() {
        let timing = fast_timing().with_init_wait(Duration::from_millis(100));
        let cycle = UpdateLoop::new("test", timing);
        let ops = Counting::new();
        cycle.spawn(ops.clone());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cycle.is_alive());
        assert!(!cycle.is_ready());
        assert_eq!(ops.init_calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cycle.is_ready());

        cycle.stop().await;
    }

    #[tokio::test]
    async fn loop_can_be_activated_again_after_stop() {
        let cycle = UpdateLoop::new("test", fast_timing());
        let ops = Counting::new();
        cycle.spawn(ops.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        cycle.stop().await;
        assert!(!cycle.is_ready());

        cycle.spawn(ops.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cycle.is_alive());
        assert!(cycle.is_ready());
        // a fresh activation re-runs init
        assert_eq!(ops.init_calls.load(Ordering::SeqCst), 2);
        cycle.stop().await;
    }

    #[tokio::test]
    async fn constant_readings_converge_to_the_constant() {
        use crate::sensors::{Measurement, MeasurementSpec};

        struct Probe {
            window: Measurement,
        }

        #[async_trait]
        impl Cyclic for Probe {
            async fn update(&self) -> anyhow::Result<()> {
                self.window.record(70.0);
                Ok(())
            }
        }

        let probe = Arc::new(Probe {
            window: Measurement::new(MeasurementSpec {
                quantity: "probe",
                unit: "u",
                min_value: 0.0,
                max_value: 100.0,
                max_delta: 0.0,
                measure_points: 2,
                rounding_base: 0.0,
                invalidation: Duration::from_secs(60),
            }),
        });
        let cycle = UpdateLoop::new("probe", CycleTiming::new(Duration::from_millis(30)));
        cycle.spawn(probe.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cycle.is_ready());
        assert_eq!(probe.window.value(), Some(70.0));
        assert_eq!(probe.window.sample_count(), 2);

        cycle.stop().await;
    }

    #[tokio::test]
    async fn double_spawn_is_ignored() {
        let cycle = UpdateLoop::new("test", fast_timing());
        let ops = Counting::new();
        cycle.spawn(ops.clone());
        cycle.spawn(ops.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ops.init_calls.load(Ordering::SeqCst), 1);
        cycle.stop().await;
    }
}
