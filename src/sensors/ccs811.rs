// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! CCS811 air quality sensor component (eCO2 / TVOC)

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::{Component, CycleTiming, Cyclic, UpdateLoop};

use super::driver::ClimateDriver;
use super::measurement::Measurement;
use super::{Co2Sensor, TvocSensor};

const UPDATE_INTERVAL: Duration = Duration::from_secs(3);
const MEASURE_POINTS: usize = 3;
/// The metal-oxide element needs a long burn-in before its readings mean
/// anything.
const STABILIZE_TIME: Duration = Duration::from_secs(30 * 60);

/// Cyclic component wrapping a CCS811-class air quality sensor.
///
/// Marked `reload_forbidden`: the chip loses its baseline on re-init and
/// takes half an hour to stabilize again.
pub struct Ccs811Sensor {
    cycle: UpdateLoop,
    driver: Mutex<Box<dyn ClimateDriver>>,
    co2: Measurement,
    tvoc: Measurement,
    activated_at: Mutex<Option<Instant>>,
}

impl Ccs811Sensor {
    /// Wrap a driver.
    pub fn new(driver: Box<dyn ClimateDriver>) -> Self {
        Self {
            cycle: UpdateLoop::new("ccs811", CycleTiming::new(UPDATE_INTERVAL)),
            driver: Mutex::new(driver),
            co2: Measurement::co2(MEASURE_POINTS),
            tvoc: Measurement::tvoc(MEASURE_POINTS),
            activated_at: Mutex::new(None),
        }
    }

    fn read_into_window(&self) -> anyhow::Result<()> {
        let sample = self.driver.lock().sample().context("CCS811 read")?;
        if let Some(co2) = sample.co2_ppm {
            self.co2.record(co2);
        }
        if let Some(tvoc) = sample.tvoc_ppb {
            self.tvoc.record(tvoc);
        }
        debug!("CCS811: co2={:?} tvoc={:?}", sample.co2_ppm, sample.tvoc_ppb);
        Ok(())
    }
}

#[async_trait]
impl Cyclic for Ccs811Sensor {
    async fn init(&self) -> anyhow::Result<()> {
        self.read_into_window()?;
        let mut activated = self.activated_at.lock();
        if activated.is_none() {
            *activated = Some(Instant::now());
        }
        Ok(())
    }

    async fn update(&self) -> anyhow::Result<()> {
        self.read_into_window()
    }
}

#[async_trait]
impl Component for Ccs811Sensor {
    fn name(&self) -> &'static str {
        "ccs811"
    }

    fn is_ready(&self) -> bool {
        self.cycle.is_ready()
    }

    fn is_alive(&self) -> bool {
        self.cycle.is_alive()
    }

    fn reload_forbidden(&self) -> bool {
        true
    }

    fn start(self: Arc<Self>) {
        self.cycle.spawn(self.clone());
    }

    async fn stop(&self) {
        self.cycle.stop().await;
    }
}

impl Co2Sensor for Ccs811Sensor {
    fn co2(&self) -> Option<f64> {
        self.co2.value()
    }

    fn readings_stabilized(&self) -> bool {
        self.activated_at
            .lock()
            .map_or(false, |activated| activated.elapsed() >= STABILIZE_TIME)
    }
}

impl TvocSensor for Ccs811Sensor {
    fn tvoc(&self) -> Option<f64> {
        self.tvoc.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::driver::ClimateSample;
    use crate::sensors::simulated::FixedClimate;

    #[tokio::test]
    async fn readings_flow_into_both_windows() {
        let sensor = Arc::new(Ccs811Sensor::new(Box::new(FixedClimate(ClimateSample {
            co2_ppm: Some(640.0),
            tvoc_ppb: Some(32.0),
            ..ClimateSample::default()
        }))));
        sensor.clone().start();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(sensor.is_ready());
        assert_eq!(sensor.co2(), Some(640.0));
        // TVOC rounds to its 5 ppb base
        assert_eq!(sensor.tvoc(), Some(30.0));
        // burn-in is nowhere near complete
        assert!(!sensor.readings_stabilized());

        sensor.stop().await;
    }
}
