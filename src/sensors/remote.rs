// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Companion-station sensor polled over HTTP
//!
//! A second station (e.g. an exterior unit) exposes its interior readings
//! as JSON; this component polls that endpoint and feeds the values through
//! the same measurement windows a local sensor would use.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::core::{Component, CycleTiming, Cyclic, UpdateLoop};

use super::measurement::Measurement;
use super::{Co2Sensor, HumiditySensor, PressureSensor, TemperatureSensor};

const UPDATE_INTERVAL: Duration = Duration::from_secs(10);
const INIT_WAIT: Duration = Duration::from_secs(2);
/// Remote values already arrive smoothed; one point per window suffices.
const MEASURE_POINTS: usize = 1;
/// A remote that misses a few polls should read as absent, not stale.
const INVALIDATION: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct RemoteReadings {
    temp: Option<f64>,
    hum: Option<f64>,
    baro: Option<f64>,
    co2: Option<f64>,
}

/// Cyclic component mirroring the sensors of a companion station.
pub struct RemoteStationSensor {
    cycle: UpdateLoop,
    client: reqwest::Client,
    url: String,
    api_key: String,
    temperature: Measurement,
    humidity: Measurement,
    pressure: Measurement,
    co2: Measurement,
}

impl RemoteStationSensor {
    /// Poll `base_url` with the given bearer token.
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        let timing = CycleTiming::new(UPDATE_INTERVAL)
            .with_init_wait(INIT_WAIT)
            .with_stop_timeout(Duration::from_secs(5));
        Self {
            cycle: UpdateLoop::new("remote_station", timing),
            client,
            url: format!("{}/api/sensor/v1/interior", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            temperature: Measurement::temperature(MEASURE_POINTS).with_invalidation(INVALIDATION),
            humidity: Measurement::humidity(MEASURE_POINTS).with_invalidation(INVALIDATION),
            pressure: Measurement::pressure(MEASURE_POINTS).with_invalidation(INVALIDATION),
            co2: Measurement::co2(MEASURE_POINTS).with_invalidation(INVALIDATION),
        }
    }

    async fn fetch(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.url))?;
        anyhow::ensure!(
            response.status().is_success(),
            "remote station returned {}",
            response.status()
        );
        let readings: RemoteReadings = response
            .json()
            .await
            .context("remote station sent invalid JSON")?;

        if let Some(temperature) = readings.temp {
            self.temperature.record(temperature);
        }
        if let Some(humidity) = readings.hum {
            self.humidity.record(humidity);
        }
        if let Some(pressure) = readings.baro {
            self.pressure.record(pressure);
        }
        if let Some(co2) = readings.co2 {
            self.co2.record(co2);
        }
        debug!(
            "remote station: temp={:?} hum={:?} baro={:?} co2={:?}",
            readings.temp, readings.hum, readings.baro, readings.co2
        );
        Ok(())
    }
}

#[async_trait]
impl Cyclic for RemoteStationSensor {
    async fn init(&self) -> anyhow::Result<()> {
        self.fetch().await
    }

    async fn update(&self) -> anyhow::Result<()> {
        self.fetch().await
    }
}

#[async_trait]
impl Component for RemoteStationSensor {
    fn name(&self) -> &'static str {
        "remote_station"
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

impl TemperatureSensor for RemoteStationSensor {
    fn temperature(&self) -> Option<f64> {
        self.temperature.value()
    }
}

impl HumiditySensor for RemoteStationSensor {
    fn humidity(&self) -> Option<f64> {
        self.humidity.value()
    }
}

impl PressureSensor for RemoteStationSensor {
    fn pressure(&self) -> Option<f64> {
        self.pressure.value()
    }
}

impl Co2Sensor for RemoteStationSensor {
    fn co2(&self) -> Option<f64> {
        self.co2.value()
    }
}
