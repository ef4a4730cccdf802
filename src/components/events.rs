// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Scheduled events - daily greetings and alarms
//!
//! Events live in a JSON file: a name, a wall-clock trigger time and the
//! actions to run (speak a text, play a sound). Each event fires at most
//! once per day, within a grace window after its trigger time so a late
//! process start does not replay the whole morning.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::{Component, ComponentRegistry, CycleTiming, Cyclic, UpdateLoop};

const UPDATE_INTERVAL: Duration = Duration::from_secs(30);
/// Events older than this many seconds are considered missed, not due.
const GRACE_SECS: i64 = 600;

/// Actions an event may run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventActions {
    /// Text handed to the speech component.
    #[serde(default)]
    pub say: Option<String>,
    /// Audio file handed to the sound component.
    #[serde(default)]
    pub play: Option<PathBuf>,
}

/// One entry of the events file.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Display name, also used in logs.
    pub name: String,
    /// Trigger time as `HH:MM`.
    pub time: String,
    /// What to do when the event fires.
    #[serde(default)]
    pub actions: EventActions,
}

struct ScheduledEvent {
    event: Event,
    time: NaiveTime,
    last_triggered: Option<NaiveDate>,
}

/// Cyclic component firing configured daily events.
pub struct EventHandler {
    cycle: UpdateLoop,
    disabled: bool,
    events_file: Option<PathBuf>,
    registry: Weak<ComponentRegistry>,
    events: Mutex<Vec<ScheduledEvent>>,
}

impl EventHandler {
    /// Handler over the events file; `None` means no events are configured.
    pub fn new(
        enabled: bool,
        events_file: Option<PathBuf>,
        registry: Weak<ComponentRegistry>,
    ) -> Self {
        Self {
            cycle: UpdateLoop::new("event_handler", CycleTiming::new(UPDATE_INTERVAL)),
            disabled: !enabled,
            events_file,
            registry,
            events: Mutex::new(Vec::new()),
        }
    }

    fn check_due(&self, today: NaiveDate, now: NaiveTime) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut events = self.events.lock();
        for scheduled in events.iter_mut() {
            if scheduled.last_triggered == Some(today) {
                continue;
            }
            let since = now.signed_duration_since(scheduled.time);
            if since < chrono::Duration::zero() || since.num_seconds() > GRACE_SECS {
                continue;
            }
            scheduled.last_triggered = Some(today);
            info!("event: {}", scheduled.event.name);
            if let Some(text) = &scheduled.event.actions.say {
                registry.speech().say(text);
            }
            if let Some(file) = &scheduled.event.actions.play {
                registry.sound().play(file.clone());
            }
        }
    }
}

#[async_trait]
impl Cyclic for EventHandler {
    async fn init(&self) -> anyhow::Result<()> {
        let Some(path) = &self.events_file else {
            return Ok(());
        };
        let parsed = parse_events_file(path)?;
        let mut events = self.events.lock();
        *events = parsed
            .into_iter()
            .filter_map(|event| match NaiveTime::parse_from_str(&event.time, "%H:%M") {
                Ok(time) => Some(ScheduledEvent {
                    event,
                    time,
                    last_triggered: None,
                }),
                Err(err) => {
                    warn!("event {:?}: invalid time {:?}: {}", event.name, event.time, err);
                    None
                }
            })
            .collect();
        debug!("events: {} scheduled", events.len());
        Ok(())
    }

    async fn update(&self) -> anyhow::Result<()> {
        let now = Local::now();
        self.check_due(now.date_naive(), now.time());
        Ok(())
    }
}

#[async_trait]
impl Component for EventHandler {
    fn name(&self) -> &'static str {
        "event_handler"
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn is_ready(&self) -> bool {
        self.cycle.is_ready()
    }

    fn is_alive(&self) -> bool {
        self.cycle.is_alive()
    }

    fn start(self: Arc<Self>) {
        if self.disabled {
            debug!("events: disabled, not starting");
            return;
        }
        self.cycle.spawn(self.clone());
    }

    async fn stop(&self) {
        self.cycle.stop().await;
    }
}

/// Parse and validate an events file.
pub fn parse_events_file(path: &Path) -> anyhow::Result<Vec<Event>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read events file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid events file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"name": "morning greeting", "time": "07:30", "actions": {"say": "Good morning"}},
        {"name": "chime", "time": "12:00", "actions": {"play": "/srv/chime.wav"}}
    ]"#;

    fn handler_with(events: &str) -> EventHandler {
        let handler = EventHandler::new(true, None, Weak::new());
        let parsed: Vec<Event> = serde_json::from_str(events).unwrap();
        *handler.events.lock() = parsed
            .into_iter()
            .map(|event| {
                let time = NaiveTime::parse_from_str(&event.time, "%H:%M").unwrap();
                ScheduledEvent {
                    event,
                    time,
                    last_triggered: None,
                }
            })
            .collect();
        handler
    }

    #[test]
    fn events_file_parses() {
        let events: Vec<Event> = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].actions.say.as_deref(), Some("Good morning"));
        assert!(events[0].actions.play.is_none());
    }

    #[test]
    fn due_events_fire_once_per_day() {
        let handler = handler_with(SAMPLE);
        let today = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        let now = NaiveTime::from_hms_opt(7, 31, 0).unwrap();

        // without a registry nothing fires, the trigger state is untouched
        handler.check_due(today, now);
        assert!(handler.events.lock()[0].last_triggered.is_none());
    }

    #[test]
    fn trigger_window_excludes_old_and_future_events() {
        let handler = handler_with(SAMPLE);
        let events = handler.events.lock();
        let morning = events[0].time;
        drop(events);

        let too_early = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert!(too_early.signed_duration_since(morning) < chrono::Duration::zero());

        let too_late = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(too_late.signed_duration_since(morning).num_seconds() > GRACE_SECS);
    }
}
