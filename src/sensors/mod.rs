// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Sensor components and the averaging policy smoothing their raw reads

mod bme280;
mod ccs811;
pub mod driver;
mod measurement;
mod motion;
mod remote;
pub mod simulated;

pub use bme280::{sea_level_pressure, Bme280Sensor};
pub use ccs811::Ccs811Sensor;
pub use driver::{ClimateDriver, ClimateSample, IioClimateDriver, MotionDriver, SensorReadError};
pub use measurement::{Measurement, MeasurementSpec};
pub use motion::MotionSensorComponent;
#[cfg(feature = "gpio")]
pub use motion::GpioMotionDriver;
pub use remote::RemoteStationSensor;

use std::sync::Arc;

use crate::core::Component;

/// Measures air temperature in degrees Celsius.
pub trait TemperatureSensor: Component {
    /// Current averaged temperature, `None` while there is no data.
    fn temperature(&self) -> Option<f64>;
}

/// Measures relative humidity in percent.
pub trait HumiditySensor: Component {
    /// Current averaged humidity, `None` while there is no data.
    fn humidity(&self) -> Option<f64>;
}

/// Measures barometric pressure in hPa, sea-level corrected.
pub trait PressureSensor: Component {
    /// Current averaged pressure, `None` while there is no data.
    fn pressure(&self) -> Option<f64>;
}

/// Measures equivalent CO2 concentration in ppm.
pub trait Co2Sensor: Component {
    /// Current averaged eCO2, `None` while there is no data.
    fn co2(&self) -> Option<f64>;

    /// Whether the element is past its warm-up and readings are trustworthy.
    fn readings_stabilized(&self) -> bool {
        true
    }
}

/// Measures total volatile organic compounds in ppb.
pub trait TvocSensor: Component {
    /// Current averaged TVOC, `None` while there is no data.
    fn tvoc(&self) -> Option<f64>;
}

/// Detects motion in front of the station.
pub trait MotionSensor: Component {
    /// Whether motion was seen within the hold window.
    fn motion_detected(&self) -> bool;
}

/// Stand-in for a sensor slot whose hardware is absent or switched off.
///
/// Dependents can always call the slot; every getter reports no data and
/// no hardware is ever touched.
pub struct DisabledSensor {
    name: &'static str,
}

impl DisabledSensor {
    /// A disabled sensor registered under `name`.
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name })
    }
}

#[async_trait::async_trait]
impl Component for DisabledSensor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_disabled(&self) -> bool {
        true
    }

    fn is_ready(&self) -> bool {
        false
    }
}

impl TemperatureSensor for DisabledSensor {
    fn temperature(&self) -> Option<f64> {
        None
    }
}

impl HumiditySensor for DisabledSensor {
    fn humidity(&self) -> Option<f64> {
        None
    }
}

impl PressureSensor for DisabledSensor {
    fn pressure(&self) -> Option<f64> {
        None
    }
}

impl Co2Sensor for DisabledSensor {
    fn co2(&self) -> Option<f64> {
        None
    }

    fn readings_stabilized(&self) -> bool {
        false
    }
}

impl TvocSensor for DisabledSensor {
    fn tvoc(&self) -> Option<f64> {
        None
    }
}

impl MotionSensor for DisabledSensor {
    fn motion_detected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sensor_reports_no_data_everywhere() {
        let sensor = DisabledSensor::new("climate_sensor");
        assert!(sensor.is_disabled());
        assert!(!sensor.is_ready());
        assert_eq!(sensor.temperature(), None);
        assert_eq!(sensor.humidity(), None);
        assert_eq!(sensor.pressure(), None);
        assert_eq!(sensor.co2(), None);
        assert_eq!(sensor.tvoc(), None);
        assert!(!sensor.motion_detected());
    }
}
