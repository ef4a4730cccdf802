// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Simulated drivers for development hosts and demo mode
//!
//! Readings are drawn from a slowly drifting baseline with Gaussian noise,
//! plus an occasional injected read failure so the retry path stays honest
//! off target too.

use rand::prelude::*;
use rand_distr::Normal;

use super::driver::{ClimateDriver, ClimateSample, MotionDriver, SensorReadError};

/// Climate driver producing plausible indoor readings.
pub struct SimulatedClimate {
    rng: StdRng,
    drift: f64,
    fail_probability: f64,
    base: ClimateSample,
}

impl SimulatedClimate {
    /// Typical living-room climate: 22 degC, 45 %RH, 1013 hPa.
    pub fn indoor() -> Self {
        Self::from_base(ClimateSample {
            temperature_c: Some(22.0),
            humidity_pct: Some(45.0),
            pressure_hpa: Some(1013.0),
            ..ClimateSample::default()
        })
    }

    /// Typical indoor air quality: 600 ppm eCO2, 20 ppb TVOC.
    pub fn air_quality() -> Self {
        Self::from_base(ClimateSample {
            co2_ppm: Some(600.0),
            tvoc_ppb: Some(20.0),
            ..ClimateSample::default()
        })
    }

    /// Simulate around an explicit baseline.
    pub fn from_base(base: ClimateSample) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            drift: 0.0,
            fail_probability: 0.02,
            base,
        }
    }

    /// Chance per tick of a simulated read dropout.
    pub fn with_fail_probability(mut self, fail_probability: f64) -> Self {
        self.fail_probability = fail_probability;
        self
    }

    fn jitter(&mut self, base: f64, sigma: f64) -> f64 {
        let noise = Normal::new(0.0, sigma)
            .map(|n| self.rng.sample::<f64, _>(n))
            .unwrap_or(0.0);
        base + self.drift + noise
    }
}

impl ClimateDriver for SimulatedClimate {
    fn sample(&mut self) -> Result<ClimateSample, SensorReadError> {
        if self.rng.gen::<f64>() < self.fail_probability {
            return Err(SensorReadError::Unavailable("simulated dropout".into()));
        }
        self.drift += self.rng.gen_range(-0.01..0.01);

        Ok(ClimateSample {
            temperature_c: self.base.temperature_c.map(|b| self.jitter(b, 0.1)),
            humidity_pct: self.base.humidity_pct.map(|b| self.jitter(b, 0.5)),
            pressure_hpa: self.base.pressure_hpa.map(|b| self.jitter(b, 0.2)),
            co2_ppm: self.base.co2_ppm.map(|b| self.jitter(b, 10.0)),
            tvoc_ppb: self.base.tvoc_ppb.map(|b| self.jitter(b, 2.0)),
        })
    }
}

/// Climate driver returning the same sample forever. Used by tests.
pub struct FixedClimate(pub ClimateSample);

impl ClimateDriver for FixedClimate {
    fn sample(&mut self) -> Result<ClimateSample, SensorReadError> {
        Ok(self.0)
    }
}

/// Climate driver that never produces a value. Used by tests.
pub struct FailingClimate;

impl ClimateDriver for FailingClimate {
    fn sample(&mut self) -> Result<ClimateSample, SensorReadError> {
        Err(SensorReadError::Unavailable("always failing".into()))
    }
}

/// Motion driver firing occasionally at random.
pub struct SimulatedMotion {
    rng: StdRng,
    activity: f64,
}

impl SimulatedMotion {
    /// Roughly one activation per twenty polls.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            activity: 0.05,
        }
    }
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionDriver for SimulatedMotion {
    fn is_active(&mut self) -> Result<bool, SensorReadError> {
        Ok(self.rng.gen::<f64>() < self.activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_readings_stay_near_the_baseline() {
        let mut driver = SimulatedClimate::indoor().with_fail_probability(0.0);
        for _ in 0..50 {
            let sample = driver.sample().unwrap();
            let temp = sample.temperature_c.unwrap();
            assert!((15.0..30.0).contains(&temp), "temperature drifted to {temp}");
            assert!(sample.co2_ppm.is_none());
        }
    }

    #[test]
    fn failing_driver_always_errors() {
        let mut driver = FailingClimate;
        assert!(driver.sample().is_err());
        assert!(driver.sample().is_err());
    }
}
