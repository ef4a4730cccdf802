// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Configuration module

use anyhow::Result;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Run with simulated sensors even on target hardware
    pub demo_mode: bool,

    /// Data directory for sensor logs and caches
    pub data_dir: PathBuf,

    /// Sensor configuration
    pub sensors: SensorConfig,

    /// Display configuration
    pub display: DisplayConfig,

    /// Energy saver configuration
    pub energy: EnergyConfig,

    /// Sound configuration
    pub sound: SoundConfig,

    /// Online forecast configuration
    pub forecast: ForecastConfig,

    /// Scheduled events configuration
    pub events: EventsConfig,

    /// Sensor value logging configuration
    pub sensor_log: SensorLogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            demo_mode: false,
            data_dir: PathBuf::from("./data"),
            sensors: SensorConfig::default(),
            display: DisplayConfig::default(),
            energy: EnergyConfig::default(),
            sound: SoundConfig::default(),
            forecast: ForecastConfig::default(),
            events: EventsConfig::default(),
            sensor_log: SensorLogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("airbarn"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Enable the BME280 climate sensor (temperature/humidity/pressure)
    pub bme280_enabled: bool,

    /// IIO device directory of the BME280 kernel driver
    pub bme280_iio_path: PathBuf,

    /// Enable the CCS811 air quality sensor (eCO2/TVOC)
    pub ccs811_enabled: bool,

    /// IIO device directory of the CCS811 kernel driver
    pub ccs811_iio_path: PathBuf,

    /// Enable the PIR motion sensor
    pub motion_sensor_enabled: bool,

    /// BCM pin number of the motion sensor input
    pub motion_sensor_pin: u8,

    /// Base URL of a companion station to poll instead of local sensors
    pub remote_station_url: String,

    /// Bearer token for the companion station API
    pub remote_station_api_key: String,

    /// Station altitude above sea level, used for pressure correction
    pub location_altitude_m: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            bme280_enabled: true,
            bme280_iio_path: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            ccs811_enabled: false,
            ccs811_iio_path: PathBuf::from("/sys/bus/iio/devices/iio:device1"),
            motion_sensor_enabled: false,
            motion_sensor_pin: 23,
            remote_station_url: String::new(),
            remote_station_api_key: String::new(),
            location_altitude_m: 0.0,
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Backlight sysfs directory
    pub backlight_path: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backlight_path: PathBuf::from("/sys/class/backlight/rpi_backlight"),
        }
    }
}

/// Energy saver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Hour of day (0-23) night mode begins
    pub night_mode_begin: u32,

    /// Hour of day (0-23) night mode ends
    pub night_mode_end: u32,

    /// Normal display brightness in percent
    pub brightness: u8,

    /// Brightness in daytime standby
    pub standby_brightness: u8,

    /// Brightness during night mode
    pub night_brightness: u8,

    /// Wake the display when motion is detected
    pub motion_wake_enabled: bool,

    /// Seconds the display stays awake after daytime motion
    pub day_standby_timeout_s: u64,

    /// Seconds the display stays awake after nighttime motion
    pub night_standby_timeout_s: u64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            night_mode_begin: 22,
            night_mode_end: 7,
            brightness: 90,
            standby_brightness: 20,
            night_brightness: 0,
            motion_wake_enabled: true,
            day_standby_timeout_s: 600,
            night_standby_timeout_s: 600,
        }
    }
}

/// Sound configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Enable audio output
    pub enabled: bool,

    /// Playback volume during night mode (0.0 - 1.0)
    pub night_volume: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            night_volume: 0.4,
        }
    }
}

/// Online forecast configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Enable the online weather component
    pub enabled: bool,

    /// Location name, informational only
    pub location: String,

    /// Latitude of the station
    pub latitude: f64,

    /// Longitude of the station
    pub longitude: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: String::new(),
            latitude: 47.5,
            longitude: 19.0,
        }
    }
}

/// Scheduled events configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Enable scheduled events
    pub enabled: bool,

    /// Path to the events definition file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_file: Option<PathBuf>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            events_file: None,
        }
    }
}

/// Sensor value logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLogConfig {
    /// Enable periodic logging of averaged sensor values
    pub enabled: bool,

    /// Seconds between log rows
    pub interval_s: u64,
}

impl Default for SensorLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_s: 60,
        }
    }
}

/// Live view of the configuration shared by all components.
///
/// Components constructed without a settings file run on the built-in
/// defaults via [`Settings::in_memory`] and never fail because of missing
/// options.
pub struct Settings {
    path: Option<PathBuf>,
    inner: RwLock<Config>,
}

impl Settings {
    /// Read the settings file, creating it with defaults if missing.
    pub fn load_or_create(path: &Path) -> Result<Arc<Self>> {
        let config = Config::load_or_create(path)?;
        Ok(Arc::new(Self {
            path: Some(path.to_path_buf()),
            inner: RwLock::new(config),
        }))
    }

    /// Defaults only, not backed by a file.
    pub fn in_memory() -> Arc<Self> {
        Self::from_config(Config::default())
    }

    /// Wrap an explicit configuration, not backed by a file.
    pub fn from_config(config: Config) -> Arc<Self> {
        Arc::new(Self {
            path: None,
            inner: RwLock::new(config),
        })
    }

    /// Current configuration. The guard must not be held across await points.
    pub fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.inner.read()
    }

    /// Mutate the configuration and persist it when file-backed.
    pub fn update(&self, mutate: impl FnOnce(&mut Config)) -> Result<()> {
        {
            let mut config = self.inner.write();
            mutate(&mut config);
        }
        self.save()
    }

    /// Write the current configuration back to its file, if any.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            self.inner.read().save(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("airbarn-{}-{}.toml", tag, std::process::id()))
    }

    #[test]
    fn defaults_roundtrip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.energy.night_mode_begin, config.energy.night_mode_begin);
        assert_eq!(parsed.sensors.bme280_enabled, config.sensors.bme280_enabled);
        assert_eq!(parsed.sound.enabled, config.sound.enabled);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed: Config = toml::from_str("[sound]\nenabled = true\n").unwrap();
        assert!(parsed.sound.enabled);
        assert_eq!(parsed.energy.brightness, EnergyConfig::default().brightness);
        assert!(parsed.sensors.bme280_enabled);
    }

    #[test]
    fn load_or_create_writes_missing_file() {
        let path = temp_config_path("create");
        std::fs::remove_file(&path).ok();

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.log_level, "info");

        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded.energy.brightness, config.energy.brightness);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn in_memory_settings_update_without_file() {
        let settings = Settings::in_memory();
        assert!(!settings.read().demo_mode);
        settings.update(|c| c.demo_mode = true).unwrap();
        assert!(settings.read().demo_mode);
    }
}
