// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! SR501-class PIR motion sensor component

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::{Component, CycleTiming, Cyclic, UpdateLoop};

use super::driver::MotionDriver;
use super::MotionSensor;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Detection is held this long to smooth the PIR's bouncy output.
const HOLD_TIME: Duration = Duration::from_secs(3);

/// Cyclic component polling a PIR motion detector input.
pub struct MotionSensorComponent {
    cycle: UpdateLoop,
    driver: Mutex<Box<dyn MotionDriver>>,
    active_until: Mutex<Option<Instant>>,
}

impl MotionSensorComponent {
    /// Wrap a motion driver.
    pub fn new(driver: Box<dyn MotionDriver>) -> Self {
        Self {
            cycle: UpdateLoop::new("motion_sensor", CycleTiming::new(POLL_INTERVAL)),
            driver: Mutex::new(driver),
            active_until: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Cyclic for MotionSensorComponent {
    async fn update(&self) -> anyhow::Result<()> {
        let active = self.driver.lock().is_active().context("PIR read")?;
        if active {
            *self.active_until.lock() = Some(Instant::now() + HOLD_TIME);
            debug!("motion detected");
        }
        Ok(())
    }
}

#[async_trait]
impl Component for MotionSensorComponent {
    fn name(&self) -> &'static str {
        "motion_sensor"
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

impl MotionSensor for MotionSensorComponent {
    fn motion_detected(&self) -> bool {
        self.active_until
            .lock()
            .map_or(false, |until| Instant::now() < until)
    }
}

/// Motion driver reading a GPIO input pin on the target board.
#[cfg(feature = "gpio")]
pub struct GpioMotionDriver {
    pin: rppal::gpio::InputPin,
}

#[cfg(feature = "gpio")]
impl GpioMotionDriver {
    /// Claim the given BCM pin as a pulled-down input.
    pub fn new(bcm_pin: u8) -> Result<Self, super::driver::SensorReadError> {
        use super::driver::SensorReadError;

        let gpio = rppal::gpio::Gpio::new()
            .map_err(|err| SensorReadError::Unavailable(err.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|err| SensorReadError::Unavailable(err.to_string()))?
            .into_input_pulldown();
        Ok(Self { pin })
    }
}

#[cfg(feature = "gpio")]
impl MotionDriver for GpioMotionDriver {
    fn is_active(&mut self) -> Result<bool, super::driver::SensorReadError> {
        Ok(self.pin.is_high())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::driver::SensorReadError;

    struct ScriptedMotion {
        states: Vec<bool>,
    }

    impl MotionDriver for ScriptedMotion {
        fn is_active(&mut self) -> Result<bool, SensorReadError> {
            if self.states.is_empty() {
                Ok(false)
            } else {
                Ok(self.states.remove(0))
            }
        }
    }

    #[tokio::test]
    async fn detection_is_held_after_the_pulse_ends() {
        let sensor = Arc::new(MotionSensorComponent::new(Box::new(ScriptedMotion {
            states: vec![true],
        })));
        assert!(!sensor.motion_detected());

        sensor.clone().start();
        // the first poll happens one interval after activation
        tokio::time::sleep(Duration::from_millis(650)).await;

        // the single pulse was consumed but the hold window keeps it visible
        assert!(sensor.motion_detected());
        sensor.stop().await;
    }
}
