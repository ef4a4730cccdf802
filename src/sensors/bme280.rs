// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! BME280 climate sensor component (temperature / humidity / pressure)

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::Settings;
use crate::core::{Component, ComponentRegistry, CycleTiming, Cyclic, UpdateLoop};

use super::driver::ClimateDriver;
use super::measurement::Measurement;
use super::{HumiditySensor, PressureSensor, TemperatureSensor};

const UPDATE_INTERVAL: Duration = Duration::from_secs(5);
const MEASURE_POINTS: usize = 5;
const DEFAULT_OUTDOOR_TEMP_C: f64 = 15.0;

/// Cyclic component wrapping a BME280-class climate sensor.
///
/// Absolute pressure is converted to its sea-level equivalent before it
/// enters the window, preferring live forecast conditions over the
/// configured station altitude when the weather component has data.
pub struct Bme280Sensor {
    cycle: UpdateLoop,
    // only the update loop takes this lock, so the blocking read inside
    // cannot stall anyone else
    driver: Mutex<Box<dyn ClimateDriver>>,
    temperature: Measurement,
    humidity: Measurement,
    pressure: Measurement,
    settings: Arc<Settings>,
    registry: Weak<ComponentRegistry>,
}

impl Bme280Sensor {
    /// Wrap a driver. `registry` may be empty (`Weak::new()`) when the
    /// sensor is used stand-alone, e.g. in tests.
    pub fn new(
        driver: Box<dyn ClimateDriver>,
        settings: Arc<Settings>,
        registry: Weak<ComponentRegistry>,
    ) -> Self {
        Self {
            cycle: UpdateLoop::new("bme280", CycleTiming::new(UPDATE_INTERVAL)),
            driver: Mutex::new(driver),
            temperature: Measurement::temperature(MEASURE_POINTS),
            humidity: Measurement::humidity(MEASURE_POINTS),
            pressure: Measurement::pressure(MEASURE_POINTS),
            settings,
            registry,
        }
    }

    fn read_into_window(&self) -> anyhow::Result<()> {
        let sample = self.driver.lock().sample().context("BME280 read")?;

        if let Some(temperature) = sample.temperature_c {
            self.temperature.record(temperature);
        }
        if let Some(humidity) = sample.humidity_pct {
            self.humidity.record(humidity);
        }
        if let Some(pressure) = sample.pressure_hpa {
            let (altitude_m, outdoor_temp_c) = self.reference_conditions();
            self.pressure
                .record(sea_level_pressure(pressure, altitude_m, outdoor_temp_c));
        }

        debug!(
            "BME280: temp={:?} hum={:?} pres={:?}",
            sample.temperature_c, sample.humidity_pct, sample.pressure_hpa
        );
        Ok(())
    }

    /// Altitude and outdoor temperature for the sea-level conversion,
    /// preferring live forecast data over configured values.
    fn reference_conditions(&self) -> (f64, f64) {
        let configured = self.settings.read().sensors.location_altitude_m;
        if let Some(registry) = self.registry.upgrade() {
            if let Some(weather) = registry.weather().current_weather() {
                let altitude = weather.altitude_m.unwrap_or(configured);
                return (altitude, weather.temperature_c);
            }
        }
        (configured, DEFAULT_OUTDOOR_TEMP_C)
    }
}

#[async_trait]
impl Cyclic for Bme280Sensor {
    async fn init(&self) -> anyhow::Result<()> {
        // the first successful read is the init step; until it lands the
        // component is alive but not ready
        self.read_into_window()
    }

    async fn update(&self) -> anyhow::Result<()> {
        self.read_into_window()
    }
}

#[async_trait]
impl Component for Bme280Sensor {
    fn name(&self) -> &'static str {
        "bme280"
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

impl TemperatureSensor for Bme280Sensor {
    fn temperature(&self) -> Option<f64> {
        self.temperature.value()
    }
}

impl HumiditySensor for Bme280Sensor {
    fn humidity(&self) -> Option<f64> {
        self.humidity.value()
    }
}

impl PressureSensor for Bme280Sensor {
    fn pressure(&self) -> Option<f64> {
        self.pressure.value()
    }
}

/// Convert an absolute pressure reading to its sea-level equivalent, the
/// form used in weather forecasts.
pub fn sea_level_pressure(absolute_hpa: f64, altitude_m: f64, outdoor_temp_c: f64) -> f64 {
    let correction = 0.0065 * altitude_m;
    absolute_hpa * (1.0 - correction / (outdoor_temp_c + correction + 273.15)).powf(-5.257)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::driver::ClimateSample;
    use crate::sensors::simulated::{FailingClimate, FixedClimate};

    fn fixed_sensor(sample: ClimateSample) -> Arc<Bme280Sensor> {
        Arc::new(Bme280Sensor::new(
            Box::new(FixedClimate(sample)),
            Settings::in_memory(),
            Weak::new(),
        ))
    }

    #[test]
    fn sea_level_conversion_matches_expectations() {
        // at sea level nothing changes
        assert!((sea_level_pressure(1013.0, 0.0, 15.0) - 1013.0).abs() < 1e-9);
        // 500 m of altitude adds roughly 60 hPa
        let corrected = sea_level_pressure(950.0, 500.0, 10.0);
        assert!((corrected - 1008.0).abs() < 5.0, "got {corrected}");
        // higher stations correct more
        assert!(sea_level_pressure(950.0, 800.0, 10.0) > corrected);
    }

    #[tokio::test]
    async fn constant_readings_average_to_the_constant() {
        let sample = ClimateSample {
            temperature_c: Some(21.4),
            humidity_pct: Some(48.0),
            pressure_hpa: Some(1013.0),
            ..ClimateSample::default()
        };
        let sensor = fixed_sensor(sample);
        sensor.read_into_window().unwrap();
        sensor.read_into_window().unwrap();

        assert!((sensor.temperature().unwrap() - 21.4).abs() < 1e-9);
        assert!((sensor.humidity().unwrap() - 48.0).abs() < 1e-9);
        // altitude 0 keeps pressure unchanged
        assert!((sensor.pressure().unwrap() - 1013.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_reads_keep_the_sensor_alive_but_never_ready() {
        let sensor = Arc::new(Bme280Sensor::new(
            Box::new(FailingClimate),
            Settings::in_memory(),
            Weak::new(),
        ));
        sensor.clone().start();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(sensor.is_alive());
        assert!(!sensor.is_ready());
        assert_eq!(sensor.temperature(), None);
        assert_eq!(sensor.pressure(), None);

        sensor.stop().await;
        assert!(!sensor.is_alive());
    }

    #[tokio::test]
    async fn a_failed_read_leaves_prior_values_intact() {
        let sample = ClimateSample {
            temperature_c: Some(20.0),
            ..ClimateSample::default()
        };
        let sensor = fixed_sensor(sample);
        sensor.read_into_window().unwrap();
        let before = sensor.temperature();

        *sensor.driver.lock() = Box::new(FailingClimate);
        assert!(sensor.read_into_window().is_err());
        assert_eq!(sensor.temperature(), before);
    }
}
