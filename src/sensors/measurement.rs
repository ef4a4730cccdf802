// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Rolling-window measurement storage
//!
//! Raw sensor hardware is electrically noisy and intermittently unreadable.
//! Each measured quantity keeps a bounded FIFO window of its most recent
//! valid readings; the externally visible value is the mean over the window.
//! A failed or rejected read leaves the window untouched, so one bad sample
//! never distorts the reported value.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

/// An implausible jump is rejected this many times before the new level is
/// accepted as real.
const MAX_DELTA_VIOLATIONS: u32 = 1;

const DEFAULT_INVALIDATION: Duration = Duration::from_secs(60);

/// Validation and smoothing parameters for one measured quantity.
#[derive(Debug, Clone)]
pub struct MeasurementSpec {
    /// Quantity label used in log messages, e.g. `temperature`.
    pub quantity: &'static str,
    /// Unit label, e.g. `degC`.
    pub unit: &'static str,
    /// Readings below this are invalid and rejected.
    pub min_value: f64,
    /// Readings above this are invalid and rejected.
    pub max_value: f64,
    /// Largest plausible jump between consecutive readings; 0 disables the
    /// check.
    pub max_delta: f64,
    /// Number of samples in the moving-average window.
    pub measure_points: usize,
    /// Readings snap to multiples of this base; 0 keeps them unrounded.
    pub rounding_base: f64,
    /// Without a fresh sample within this span the value expires.
    pub invalidation: Duration,
}

struct Window {
    values: VecDeque<f64>,
    last_sample: Option<Instant>,
    first_written: bool,
    delta_violations: u32,
}

/// Moving average over the most recent valid readings of one quantity.
///
/// Single writer (the owning component's update loop), any number of
/// concurrent readers. The lock only guards the window itself, never I/O.
pub struct Measurement {
    spec: MeasurementSpec,
    window: RwLock<Window>,
}

impl Measurement {
    /// Create an empty window. Until the first valid reading arrives the
    /// measurement reports no data.
    pub fn new(spec: MeasurementSpec) -> Self {
        let capacity = spec.measure_points.max(1);
        Self {
            spec,
            window: RwLock::new(Window {
                values: VecDeque::with_capacity(capacity),
                last_sample: None,
                first_written: false,
                delta_violations: 0,
            }),
        }
    }

    /// Temperature in degrees Celsius.
    pub fn temperature(measure_points: usize) -> Self {
        Self::new(MeasurementSpec {
            quantity: "temperature",
            unit: "degC",
            min_value: -30.0,
            max_value: 60.0,
            max_delta: 3.0,
            measure_points,
            rounding_base: 0.1,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    /// Relative humidity in percent.
    pub fn humidity(measure_points: usize) -> Self {
        Self::new(MeasurementSpec {
            quantity: "humidity",
            unit: "%",
            min_value: 10.0,
            max_value: 100.0,
            max_delta: 10.0,
            measure_points,
            rounding_base: 0.1,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    /// Barometric pressure in hPa.
    pub fn pressure(measure_points: usize) -> Self {
        Self::new(MeasurementSpec {
            quantity: "pressure",
            unit: "hPa",
            min_value: 800.0,
            max_value: 2000.0,
            max_delta: 3.0,
            measure_points,
            rounding_base: 0.1,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    /// Equivalent CO2 concentration in ppm.
    pub fn co2(measure_points: usize) -> Self {
        Self::new(MeasurementSpec {
            quantity: "co2",
            unit: "ppm",
            min_value: 400.0,
            max_value: 5000.0,
            max_delta: 50.0,
            measure_points,
            rounding_base: 5.0,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    /// Total volatile organic compounds in ppb.
    pub fn tvoc(measure_points: usize) -> Self {
        Self::new(MeasurementSpec {
            quantity: "tvoc",
            unit: "ppb",
            min_value: 0.0,
            max_value: 500.0,
            max_delta: 100.0,
            measure_points,
            rounding_base: 5.0,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    /// Override the invalidation span.
    pub fn with_invalidation(mut self, invalidation: Duration) -> Self {
        self.spec.invalidation = invalidation;
        self
    }

    /// Validate and store one raw reading. Returns whether it was accepted.
    pub fn record(&self, value: f64) -> bool {
        let rounded = round_to_base(value, self.spec.rounding_base);
        if !(self.spec.min_value..=self.spec.max_value).contains(&rounded) {
            warn!(
                "{}: reading {} {} out of bounds, rejected",
                self.spec.quantity, rounded, self.spec.unit
            );
            return false;
        }

        let mut window = self.window.write();
        if self.spec.max_delta > 0.0 && window.first_written {
            if let Some(&last) = window.values.back() {
                let delta = (rounded - last).abs();
                if delta >= self.spec.max_delta {
                    if window.delta_violations < MAX_DELTA_VIOLATIONS {
                        window.delta_violations += 1;
                        warn!(
                            "{}: jump of {:.2} {} rejected as implausible",
                            self.spec.quantity, delta, self.spec.unit
                        );
                        return false;
                    }
                    // the jump persisted, take the new level as real
                    window.delta_violations = 0;
                }
            }
        }

        while window.values.len() >= self.spec.measure_points.max(1) {
            window.values.pop_front();
        }
        window.values.push_back(rounded);
        window.last_sample = Some(Instant::now());
        window.first_written = true;
        true
    }

    /// Mean over the current window, or `None` before the first valid
    /// reading and after the value has expired.
    pub fn value(&self) -> Option<f64> {
        let window = self.window.read();
        let last = window.last_sample?;
        if last.elapsed() > self.spec.invalidation {
            debug!("{}: reading expired", self.spec.quantity);
            return None;
        }
        if window.values.is_empty() {
            return None;
        }
        Some(window.values.iter().sum::<f64>() / window.values.len() as f64)
    }

    /// Number of samples currently held.
    pub fn sample_count(&self) -> usize {
        self.window.read().values.len()
    }

    /// Parameters this measurement was built with.
    pub fn spec(&self) -> &MeasurementSpec {
        &self.spec
    }
}

fn round_to_base(value: f64, base: f64) -> f64 {
    if base <= 0.0 {
        return value;
    }
    (value / base).round() * base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(measure_points: usize) -> Measurement {
        Measurement::new(MeasurementSpec {
            quantity: "test",
            unit: "u",
            min_value: -1000.0,
            max_value: 1000.0,
            max_delta: 0.0,
            measure_points,
            rounding_base: 0.0,
            invalidation: DEFAULT_INVALIDATION,
        })
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a value");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_window_reports_no_data() {
        assert_eq!(plain(5).value(), None);
    }

    #[test]
    fn mean_over_partial_window_is_valid() {
        let m = plain(5);
        assert!(m.record(10.0));
        assert!(m.record(20.0));
        assert_eq!(m.sample_count(), 2);
        assert_close(m.value(), 15.0);
    }

    #[test]
    fn oldest_reading_is_evicted_first() {
        let m = plain(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            assert!(m.record(v));
        }
        assert_eq!(m.sample_count(), 3);
        assert_close(m.value(), 3.0); // mean of 2, 3, 4
    }

    #[test]
    fn out_of_bounds_reading_leaves_window_untouched() {
        let m = Measurement::temperature(3);
        assert!(m.record(21.0));
        assert!(!m.record(120.0));
        assert_eq!(m.sample_count(), 1);
        assert_close(m.value(), 21.0);
    }

    #[test]
    fn implausible_jump_is_rejected_once_then_accepted() {
        let m = Measurement::temperature(5);
        assert!(m.record(21.0));
        // a 15 degree jump is above max_delta
        assert!(!m.record(36.0));
        assert_close(m.value(), 21.0);
        // the level persists, so it is taken as real
        assert!(m.record(36.0));
        assert_close(m.value(), 28.5);
    }

    #[test]
    fn readings_snap_to_the_rounding_base() {
        let m = Measurement::co2(1);
        assert!(m.record(612.0));
        assert_close(m.value(), 610.0);
    }

    #[test]
    fn value_expires_without_fresh_samples() {
        let m = plain(2).with_invalidation(Duration::from_millis(10));
        assert!(m.record(5.0));
        assert!(m.value().is_some());
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(m.value(), None);
    }

    #[test]
    fn single_point_window_tracks_the_latest_reading() {
        let m = plain(1);
        assert!(m.record(7.0));
        assert!(m.record(9.0));
        assert_eq!(m.sample_count(), 1);
        assert_close(m.value(), 9.0);
    }
}
