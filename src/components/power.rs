// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Energy saver - night mode and motion-triggered standby

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Local, NaiveTime, Timelike};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::Settings;
use crate::core::{Component, ComponentRegistry, CycleTiming, Cyclic, UpdateLoop};

const UPDATE_INTERVAL: Duration = Duration::from_secs(2);
const INIT_WAIT: Duration = Duration::from_secs(5);
/// Waking at night stays dimmer than the daytime level by this much.
const NIGHT_WAKE_DELTA: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerState {
    Day,
    DayStandby,
    Night,
    NightWake,
}

/// Cyclic policy component switching the display between day, standby and
/// night brightness, with motion-triggered wake-up.
pub struct EnergySaver {
    cycle: UpdateLoop,
    settings: Arc<Settings>,
    registry: Weak<ComponentRegistry>,
    night_mode: AtomicBool,
    awake_until: Mutex<Option<Instant>>,
    last_state: Mutex<Option<PowerState>>,
}

impl EnergySaver {
    /// Policy over the components reachable through `registry`.
    pub fn new(settings: Arc<Settings>, registry: Weak<ComponentRegistry>) -> Self {
        let timing = CycleTiming::new(UPDATE_INTERVAL).with_init_wait(INIT_WAIT);
        Self {
            cycle: UpdateLoop::new("energy_saver", timing),
            settings,
            registry,
            night_mode: AtomicBool::new(false),
            awake_until: Mutex::new(None),
            last_state: Mutex::new(None),
        }
    }

    /// Whether the current time falls into the configured night window.
    pub fn night_mode_active(&self) -> bool {
        self.night_mode.load(Ordering::SeqCst)
    }

    /// Keep the display awake for the given span.
    pub fn wake_up(&self, span: Duration) {
        *self.awake_until.lock() = Some(Instant::now() + span);
    }

    fn is_awake(&self) -> bool {
        self.awake_until
            .lock()
            .map_or(false, |until| Instant::now() < until)
    }

    fn apply_policy(&self, now: NaiveTime) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let energy = self.settings.read().energy.clone();

        let night = in_night_window(now, energy.night_mode_begin, energy.night_mode_end);
        self.night_mode.store(night, Ordering::SeqCst);

        if energy.motion_wake_enabled && registry.motion_sensor().motion_detected() {
            let timeout = if night {
                energy.night_standby_timeout_s
            } else {
                energy.day_standby_timeout_s
            };
            self.wake_up(Duration::from_secs(timeout));
        }

        let (state, brightness) = match (night, self.is_awake()) {
            (true, true) => (
                PowerState::NightWake,
                energy.brightness.saturating_sub(NIGHT_WAKE_DELTA),
            ),
            (true, false) => (PowerState::Night, energy.night_brightness),
            (false, false) if energy.motion_wake_enabled => {
                (PowerState::DayStandby, energy.standby_brightness)
            }
            (false, _) => (PowerState::Day, energy.brightness),
        };
        registry.display().set_brightness(brightness);

        let mut last = self.last_state.lock();
        if *last != Some(state) {
            debug!("energy saver: {:?}", state);
            *last = Some(state);
        }
    }
}

#[async_trait]
impl Cyclic for EnergySaver {
    async fn update(&self) -> anyhow::Result<()> {
        self.apply_policy(Local::now().time());
        Ok(())
    }
}

#[async_trait]
impl Component for EnergySaver {
    fn name(&self) -> &'static str {
        "energy_saver"
    }

    fn is_ready(&self) -> bool {
        self.cycle.is_ready()
    }

    fn is_alive(&self) -> bool {
        self.cycle.is_alive()
    }

    fn start(self: Arc<Self>) {
        self.cycle.spawn(self.clone());
    }

    async fn stop(&self) {
        self.cycle.stop().await;
    }
}

/// Whether `now` falls into the night window `[begin_hour, end_hour)`,
/// which may wrap past midnight.
pub fn in_night_window(now: NaiveTime, begin_hour: u32, end_hour: u32) -> bool {
    let hour = now.hour();
    if begin_hour == end_hour {
        return false;
    }
    if begin_hour < end_hour {
        (begin_hour..end_hour).contains(&hour)
    } else {
        hour >= begin_hour || hour < end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 30, 0).unwrap()
    }

    #[test]
    fn night_window_wraps_past_midnight() {
        // 22:00 - 07:00
        assert!(in_night_window(at(23), 22, 7));
        assert!(in_night_window(at(2), 22, 7));
        assert!(in_night_window(at(22), 22, 7));
        assert!(!in_night_window(at(7), 22, 7));
        assert!(!in_night_window(at(12), 22, 7));
    }

    #[test]
    fn night_window_within_one_day() {
        // 1:00 - 5:00
        assert!(in_night_window(at(3), 1, 5));
        assert!(!in_night_window(at(0), 1, 5));
        assert!(!in_night_window(at(5), 1, 5));
    }

    #[test]
    fn empty_window_is_never_night() {
        assert!(!in_night_window(at(6), 6, 6));
    }

    #[test]
    fn wake_up_expires() {
        let saver = EnergySaver::new(Settings::in_memory(), Weak::new());
        assert!(!saver.is_awake());
        saver.wake_up(Duration::from_millis(10));
        assert!(saver.is_awake());
        std::thread::sleep(Duration::from_millis(25));
        assert!(!saver.is_awake());
    }

    #[tokio::test]
    async fn policy_without_a_registry_is_harmless() {
        let saver = Arc::new(EnergySaver::new(Settings::in_memory(), Weak::new()));
        saver.apply_policy(at(12));
        assert!(!saver.night_mode_active());
    }
}
