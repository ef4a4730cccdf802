// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Output and policy components built on the lifecycle core

mod display;
mod events;
mod logger;
mod power;
mod sound;
mod speech;
mod weather;

pub use display::Display;
pub use events::{parse_events_file, Event, EventActions, EventHandler};
pub use logger::SensorLogger;
pub use power::{in_night_window, EnergySaver};
pub use sound::Sound;
pub use speech::Speech;
pub use weather::{CurrentWeather, DailyForecast, OnlineWeather};
