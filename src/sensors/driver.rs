// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Raw-read boundary between sensor components and their hardware
//!
//! Drivers are opaque capabilities: one fallible read per call, no retries.
//! The owning component skips the tick on failure; the next scheduled tick
//! is the retry mechanism.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

/// A raw sensor read failed. Transient by definition.
#[derive(Debug, Error)]
pub enum SensorReadError {
    /// The sensor is not reachable right now.
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    /// Reading the sensor's backing file or bus failed.
    #[error("sensor I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sensor produced output that could not be interpreted.
    #[error("unparseable sensor output: {0}")]
    Parse(String),
}

/// One multi-quantity reading from a climate sensor. Quantities the sensor
/// does not measure stay `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClimateSample {
    /// Temperature in degrees Celsius.
    pub temperature_c: Option<f64>,
    /// Relative humidity in percent.
    pub humidity_pct: Option<f64>,
    /// Absolute pressure in hPa.
    pub pressure_hpa: Option<f64>,
    /// Equivalent CO2 in ppm.
    pub co2_ppm: Option<f64>,
    /// Total volatile organic compounds in ppb.
    pub tvoc_ppb: Option<f64>,
}

/// Raw-read capability wrapping one physical climate sensor.
pub trait ClimateDriver: Send {
    /// Attempt a single read.
    fn sample(&mut self) -> Result<ClimateSample, SensorReadError>;
}

/// Momentary state of a motion detector input.
pub trait MotionDriver: Send {
    /// Whether the detector output is currently active.
    fn is_active(&mut self) -> Result<bool, SensorReadError>;
}

/// Which [`ClimateSample`] field an IIO channel feeds.
#[derive(Debug, Clone, Copy)]
pub enum ClimateQuantity {
    /// Degrees Celsius.
    Temperature,
    /// Percent relative humidity.
    Humidity,
    /// hPa.
    Pressure,
    /// ppm equivalent CO2.
    Co2,
    /// ppb total VOC.
    Tvoc,
}

/// One sysfs attribute of an IIO device and the scale turning its raw
/// integer into the sample unit.
#[derive(Debug, Clone)]
pub struct IioChannel {
    /// Attribute file name, e.g. `in_temp_input`.
    pub file: &'static str,
    /// Multiplier applied to the parsed raw value.
    pub scale: f64,
    /// Sample field the channel feeds.
    pub quantity: ClimateQuantity,
}

/// Climate driver reading calibrated values from a Linux IIO device.
///
/// The kernel driver owns the chip protocol; this only parses and scales
/// the exported numbers, so any IIO-backed sensor works through it.
pub struct IioClimateDriver {
    device_dir: PathBuf,
    channels: Vec<IioChannel>,
}

impl IioClimateDriver {
    /// Driver over an explicit channel list.
    pub fn new(device_dir: PathBuf, channels: Vec<IioChannel>) -> Self {
        Self {
            device_dir,
            channels,
        }
    }

    /// Channel layout of the in-kernel BME280 driver (milli-units, kPa).
    pub fn bme280(device_dir: PathBuf) -> Self {
        Self::new(
            device_dir,
            vec![
                IioChannel {
                    file: "in_temp_input",
                    scale: 0.001,
                    quantity: ClimateQuantity::Temperature,
                },
                IioChannel {
                    file: "in_humidityrelative_input",
                    scale: 0.001,
                    quantity: ClimateQuantity::Humidity,
                },
                IioChannel {
                    file: "in_pressure_input",
                    scale: 10.0,
                    quantity: ClimateQuantity::Pressure,
                },
            ],
        )
    }

    /// Channel layout of the in-kernel CCS811 driver.
    pub fn ccs811(device_dir: PathBuf) -> Self {
        Self::new(
            device_dir,
            vec![
                IioChannel {
                    file: "in_concentration_co2_input",
                    scale: 1.0,
                    quantity: ClimateQuantity::Co2,
                },
                IioChannel {
                    file: "in_concentration_voc_input",
                    scale: 1.0,
                    quantity: ClimateQuantity::Tvoc,
                },
            ],
        )
    }

    fn read_channel(&self, channel: &IioChannel) -> Result<f64, SensorReadError> {
        let path = self.device_dir.join(channel.file);
        let raw = fs::read_to_string(&path)?;
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| SensorReadError::Parse(format!("{}: {:?}", path.display(), raw.trim())))?;
        Ok(value * channel.scale)
    }
}

impl ClimateDriver for IioClimateDriver {
    fn sample(&mut self) -> Result<ClimateSample, SensorReadError> {
        let mut sample = ClimateSample::default();
        let mut first_error = None;
        let mut any_ok = false;

        for channel in &self.channels {
            match self.read_channel(channel) {
                Ok(value) => {
                    any_ok = true;
                    let slot = match channel.quantity {
                        ClimateQuantity::Temperature => &mut sample.temperature_c,
                        ClimateQuantity::Humidity => &mut sample.humidity_pct,
                        ClimateQuantity::Pressure => &mut sample.pressure_hpa,
                        ClimateQuantity::Co2 => &mut sample.co2_ppm,
                        ClimateQuantity::Tvoc => &mut sample.tvoc_ppb,
                    };
                    *slot = Some(value);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if any_ok {
            Ok(sample)
        } else {
            Err(first_error
                .unwrap_or_else(|| SensorReadError::Unavailable("no channels configured".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn iio_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("airbarn-iio-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn iio_driver_scales_raw_values() {
        let dir = iio_dir("scale");
        let mut f = fs::File::create(dir.join("in_temp_input")).unwrap();
        writeln!(f, "21870").unwrap();
        drop(f);

        let mut driver = IioClimateDriver::new(
            dir.clone(),
            vec![IioChannel {
                file: "in_temp_input",
                scale: 0.001,
                quantity: ClimateQuantity::Temperature,
            }],
        );
        let sample = driver.sample().unwrap();
        assert!((sample.temperature_c.unwrap() - 21.87).abs() < 1e-9);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn iio_driver_fails_when_no_channel_is_readable() {
        let dir = iio_dir("missing");
        let mut driver = IioClimateDriver::bme280(dir.clone());
        assert!(driver.sample().is_err());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn iio_driver_tolerates_partially_readable_devices() {
        let dir = iio_dir("partial");
        let mut f = fs::File::create(dir.join("in_pressure_input")).unwrap();
        writeln!(f, "98.4").unwrap();
        drop(f);

        let mut driver = IioClimateDriver::bme280(dir.clone());
        let sample = driver.sample().unwrap();
        assert!(sample.temperature_c.is_none());
        assert!((sample.pressure_hpa.unwrap() - 984.0).abs() < 1e-9);
        fs::remove_dir_all(&dir).ok();
    }
}
