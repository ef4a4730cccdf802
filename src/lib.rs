// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Airbarn - Home Weather & Air Quality Station
//!
//! A sensor hub for Raspberry Pi class devices:
//! - Cyclic component model: every sensor runs its own background loop
//!   with retry-on-failure and deterministic, bounded shutdown
//! - Rolling-window averaging that smooths electrically noisy readings
//! - Settings-driven registry wiring sensors, display, audio and forecast
//!   components together
//! - Runs unchanged on a development host with simulated drivers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Component Registry                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────────────────┐  │
//! │  │ BME280  │  │ CCS811  │  │ Motion  │  │ Online Weather │  │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────────┬───────┘  │
//! │       └─── one update loop per component ────────┘          │
//! │  ┌─────────┐  ┌──────────────┐  ┌───────┐  ┌────────────┐   │
//! │  │ Display │  │ Energy Saver │  │ Sound │  │   Speech   │   │
//! │  └─────────┘  └──────────────┘  └───────┘  └────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod components;
pub mod config;
pub mod core;
pub mod runtime;
pub mod sensors;

// Re-exports for convenience
pub use crate::components::{CurrentWeather, DailyForecast};
pub use crate::config::{Config, Settings};
pub use crate::core::{Component, ComponentRegistry, CycleTiming, Cyclic, UpdateLoop};
pub use crate::runtime::RuntimeSystem;
pub use crate::sensors::{Measurement, SensorReadError};

/// Airbarn version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Airbarn name
pub const NAME: &str = "Airbarn";
