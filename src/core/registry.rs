// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Component registry - constructs, owns and wires all station components

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::components::{
    Display, EnergySaver, EventHandler, OnlineWeather, SensorLogger, Sound, Speech,
};
use crate::config::Settings;
use crate::runtime::RuntimeSystem;
use crate::sensors::driver::MotionDriver;
use crate::sensors::simulated::{SimulatedClimate, SimulatedMotion};
use crate::sensors::{
    Bme280Sensor, Ccs811Sensor, Co2Sensor, DisabledSensor, HumiditySensor, IioClimateDriver,
    MotionSensor, MotionSensorComponent, PressureSensor, RemoteStationSensor, TemperatureSensor,
    TvocSensor,
};

use super::Component;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns every component of the station.
///
/// Components are constructed exactly once, in dependency order, honoring
/// the per-component enable flags in settings. Disabled slots still hold a
/// callable component whose getters report no data. Components that consult
/// peers at runtime hold a weak back-reference to this registry - a lookup
/// relation, never ownership, so each component remains testable alone.
pub struct ComponentRegistry {
    display: Arc<Display>,
    energy_saver: Arc<EnergySaver>,
    sound: Arc<Sound>,
    speech: Arc<Speech>,
    weather: Arc<OnlineWeather>,
    event_handler: Arc<EventHandler>,
    sensor_logger: Arc<SensorLogger>,
    temperature: Arc<dyn TemperatureSensor>,
    humidity: Arc<dyn HumiditySensor>,
    pressure: Arc<dyn PressureSensor>,
    co2: Arc<dyn Co2Sensor>,
    tvoc: Arc<dyn TvocSensor>,
    motion: Arc<dyn MotionSensor>,
    components: Vec<Arc<dyn Component>>,
}

impl ComponentRegistry {
    /// Construct all components according to settings. Nothing runs until
    /// [`ComponentRegistry::start_all`].
    pub fn new(settings: Arc<Settings>, runtime: Arc<RuntimeSystem>) -> anyhow::Result<Arc<Self>> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("cannot build HTTP client")?;

        Ok(Arc::new_cyclic(|me: &Weak<ComponentRegistry>| {
            let config = settings.read().clone();
            let mut components: Vec<Arc<dyn Component>> = Vec::new();

            // online weather first, the pressure sensor consults it
            let weather = Arc::new(OnlineWeather::new(client.clone(), &config.forecast));
            if weather.is_disabled() {
                info!("online weather disabled in settings");
            }
            components.push(weather.clone());

            // climate slot: a companion station beats local hardware
            let temperature: Arc<dyn TemperatureSensor>;
            let humidity: Arc<dyn HumiditySensor>;
            let pressure: Arc<dyn PressureSensor>;
            let mut remote: Option<Arc<RemoteStationSensor>> = None;

            if !config.sensors.remote_station_url.is_empty() {
                let sensor = Arc::new(RemoteStationSensor::new(
                    client.clone(),
                    &config.sensors.remote_station_url,
                    &config.sensors.remote_station_api_key,
                ));
                components.push(sensor.clone());
                temperature = sensor.clone();
                humidity = sensor.clone();
                pressure = sensor.clone();
                remote = Some(sensor);
            } else if config.sensors.bme280_enabled {
                let driver: Box<dyn crate::sensors::ClimateDriver> = if runtime.use_hardware() {
                    Box::new(IioClimateDriver::bme280(
                        config.sensors.bme280_iio_path.clone(),
                    ))
                } else {
                    Box::new(SimulatedClimate::indoor())
                };
                let sensor = Arc::new(Bme280Sensor::new(driver, settings.clone(), me.clone()));
                components.push(sensor.clone());
                temperature = sensor.clone();
                humidity = sensor.clone();
                pressure = sensor;
            } else {
                info!("no climate sensor configured");
                let disabled = DisabledSensor::new("climate_sensor");
                components.push(disabled.clone());
                temperature = disabled.clone();
                humidity = disabled.clone();
                pressure = disabled;
            }

            // air quality slot: the companion station wins for CO2, TVOC
            // only ever comes from a local CCS811
            let ccs811 = if config.sensors.ccs811_enabled {
                let driver: Box<dyn crate::sensors::ClimateDriver> = if runtime.use_hardware() {
                    Box::new(IioClimateDriver::ccs811(
                        config.sensors.ccs811_iio_path.clone(),
                    ))
                } else {
                    Box::new(SimulatedClimate::air_quality())
                };
                let sensor = Arc::new(Ccs811Sensor::new(driver));
                components.push(sensor.clone());
                Some(sensor)
            } else {
                None
            };

            let co2: Arc<dyn Co2Sensor>;
            let tvoc: Arc<dyn TvocSensor>;
            match (&remote, &ccs811) {
                (Some(station), Some(local)) => {
                    co2 = station.clone();
                    tvoc = local.clone();
                }
                (None, Some(local)) => {
                    co2 = local.clone();
                    tvoc = local.clone();
                }
                (station, None) => {
                    if station.is_none() {
                        info!("no air quality sensor configured");
                    }
                    let disabled = DisabledSensor::new("air_quality_sensor");
                    components.push(disabled.clone());
                    co2 = match station {
                        Some(station) => station.clone(),
                        None => disabled.clone(),
                    };
                    tvoc = disabled;
                }
            }

            // motion slot
            let motion: Arc<dyn MotionSensor> = if config.sensors.motion_sensor_enabled {
                let driver: Option<Box<dyn MotionDriver>> = if runtime.use_hardware() {
                    hardware_motion_driver(config.sensors.motion_sensor_pin)
                } else {
                    Some(Box::new(SimulatedMotion::new()))
                };
                match driver {
                    Some(driver) => {
                        let sensor = Arc::new(MotionSensorComponent::new(driver));
                        components.push(sensor.clone());
                        sensor
                    }
                    None => {
                        let disabled = DisabledSensor::new("motion_sensor");
                        components.push(disabled.clone());
                        disabled
                    }
                }
            } else {
                info!("motion sensor disabled in settings");
                let disabled = DisabledSensor::new("motion_sensor");
                components.push(disabled.clone());
                disabled
            };

            // outputs, in dependency order: display and motion feed the
            // energy saver, the energy saver feeds sound, sound feeds speech
            let display = Arc::new(Display::new(&settings, runtime.clone()));
            components.push(display.clone());

            let energy_saver = Arc::new(EnergySaver::new(settings.clone(), me.clone()));
            components.push(energy_saver.clone());

            let sound = Arc::new(Sound::new(&settings, me.clone()));
            if sound.is_disabled() {
                info!("sound disabled in settings");
            }
            components.push(sound.clone());

            let speech = Arc::new(Speech::new(&config, me.clone()));
            components.push(speech.clone());

            let event_handler = Arc::new(EventHandler::new(
                config.events.enabled,
                config.events.events_file.clone(),
                me.clone(),
            ));
            if event_handler.is_disabled() {
                info!("events disabled in settings");
            }
            components.push(event_handler.clone());

            let sensor_logger = Arc::new(SensorLogger::new(
                config.sensor_log.enabled,
                &config.data_dir,
                config.sensor_log.interval_s,
                me.clone(),
            ));
            components.push(sensor_logger.clone());

            Self {
                display,
                energy_saver,
                sound,
                speech,
                weather,
                event_handler,
                sensor_logger,
                temperature,
                humidity,
                pressure,
                co2,
                tvoc,
                motion,
                components,
            }
        }))
    }

    /// Component registered under `name`, the same instance for the
    /// registry's lifetime.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components
            .iter()
            .find(|component| component.name() == name)
            .cloned()
    }

    /// Names of all owned components, in construction order.
    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Activate every component's background work.
    pub fn start_all(&self) {
        for component in &self.components {
            component.clone().start();
        }
        info!("started {} components", self.components.len());
    }

    /// Stop every component, in reverse construction order. A stuck or
    /// failing component is logged by its own loop and never blocks the
    /// rest of the shutdown.
    pub async fn stop_all(&self) {
        for component in self.components.iter().rev() {
            component.stop().await;
        }
        info!("all components stopped");
    }

    /// Re-activate components whose loop died. Disabled components and
    /// those marked `reload_forbidden` are left alone.
    pub fn restart_dead(&self) {
        for component in &self.components {
            if component.is_alive() || component.is_disabled() || component.reload_forbidden() {
                continue;
            }
            warn!("{}: loop is dead, restarting", component.name());
            component.clone().start();
        }
    }

    /// Display brightness component.
    pub fn display(&self) -> Arc<Display> {
        self.display.clone()
    }

    /// Night mode / standby policy component.
    pub fn energy_saver(&self) -> Arc<EnergySaver> {
        self.energy_saver.clone()
    }

    /// Audio playback sink.
    pub fn sound(&self) -> Arc<Sound> {
        self.sound.clone()
    }

    /// Text-to-speech sink.
    pub fn speech(&self) -> Arc<Speech> {
        self.speech.clone()
    }

    /// Online forecast component.
    pub fn weather(&self) -> Arc<OnlineWeather> {
        self.weather.clone()
    }

    /// Scheduled events component.
    pub fn event_handler(&self) -> Arc<EventHandler> {
        self.event_handler.clone()
    }

    /// CSV sensor value logger.
    pub fn sensor_logger(&self) -> Arc<SensorLogger> {
        self.sensor_logger.clone()
    }

    /// The selected temperature sensor slot.
    pub fn temperature_sensor(&self) -> Arc<dyn TemperatureSensor> {
        self.temperature.clone()
    }

    /// The selected humidity sensor slot.
    pub fn humidity_sensor(&self) -> Arc<dyn HumiditySensor> {
        self.humidity.clone()
    }

    /// The selected pressure sensor slot.
    pub fn pressure_sensor(&self) -> Arc<dyn PressureSensor> {
        self.pressure.clone()
    }

    /// The selected CO2 sensor slot.
    pub fn co2_sensor(&self) -> Arc<dyn Co2Sensor> {
        self.co2.clone()
    }

    /// The selected TVOC sensor slot.
    pub fn tvoc_sensor(&self) -> Arc<dyn TvocSensor> {
        self.tvoc.clone()
    }

    /// The selected motion sensor slot.
    pub fn motion_sensor(&self) -> Arc<dyn MotionSensor> {
        self.motion.clone()
    }
}

#[cfg(feature = "gpio")]
fn hardware_motion_driver(pin: u8) -> Option<Box<dyn MotionDriver>> {
    use crate::sensors::GpioMotionDriver;

    match GpioMotionDriver::new(pin) {
        Ok(driver) => Some(Box::new(driver)),
        Err(err) => {
            warn!("motion sensor hardware unavailable: {}", err);
            None
        }
    }
}

#[cfg(not(feature = "gpio"))]
fn hardware_motion_driver(pin: u8) -> Option<Box<dyn MotionDriver>> {
    let _ = pin;
    warn!("motion sensor enabled but gpio support is not compiled in");
    None
}
