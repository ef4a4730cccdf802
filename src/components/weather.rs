// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Online weather component
//!
//! Periodically fetches current conditions and the daily forecast from the
//! Open-Meteo API. The provider JSON is opaque plumbing; consumers only see
//! the typed records cached here.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::config::ForecastConfig;
use crate::core::{Component, CycleTiming, Cyclic, UpdateLoop};

const UPDATE_INTERVAL: Duration = Duration::from_secs(600);
const INIT_WAIT: Duration = Duration::from_secs(1);

/// Current outdoor conditions.
#[derive(Debug, Clone)]
pub struct CurrentWeather {
    /// Outdoor temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Wind speed in km/h.
    pub wind_speed_kmh: f64,
    /// Provider condition code.
    pub weather_code: u8,
    /// Elevation of the forecast grid cell in meters.
    pub altitude_m: Option<f64>,
    /// When the record was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// One day of forecast.
#[derive(Debug, Clone)]
pub struct DailyForecast {
    /// Forecast day.
    pub date: NaiveDate,
    /// Daily minimum temperature in degrees Celsius.
    pub temp_min_c: f64,
    /// Daily maximum temperature in degrees Celsius.
    pub temp_max_c: f64,
    /// Provider condition code.
    pub weather_code: u8,
    /// Total precipitation in mm.
    pub precipitation_mm: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    elevation: Option<f64>,
    current_weather: Option<ProviderCurrent>,
    daily: Option<ProviderDaily>,
}

#[derive(Debug, Deserialize)]
struct ProviderCurrent {
    temperature: f64,
    windspeed: f64,
    weathercode: u8,
}

#[derive(Debug, Deserialize)]
struct ProviderDaily {
    time: Vec<NaiveDate>,
    temperature_2m_min: Vec<f64>,
    temperature_2m_max: Vec<f64>,
    weathercode: Vec<u8>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
}

/// Cyclic component caching online forecast records.
pub struct OnlineWeather {
    cycle: UpdateLoop,
    client: reqwest::Client,
    disabled: bool,
    latitude: f64,
    longitude: f64,
    current: RwLock<Option<CurrentWeather>>,
    forecast: RwLock<Vec<DailyForecast>>,
}

impl OnlineWeather {
    /// Forecast fetcher for the configured location.
    pub fn new(client: reqwest::Client, config: &ForecastConfig) -> Self {
        let timing = CycleTiming::new(UPDATE_INTERVAL)
            .with_init_wait(INIT_WAIT)
            .with_stop_timeout(Duration::from_secs(5));
        Self {
            cycle: UpdateLoop::new("online_weather", timing),
            client,
            disabled: !config.enabled,
            latitude: config.latitude,
            longitude: config.longitude,
            current: RwLock::new(None),
            forecast: RwLock::new(Vec::new()),
        }
    }

    /// Latest current-conditions record, if any fetch has succeeded and the
    /// component is enabled.
    pub fn current_weather(&self) -> Option<CurrentWeather> {
        if self.disabled {
            return None;
        }
        self.current.read().clone()
    }

    /// Latest daily forecast, oldest day first. Empty before the first
    /// successful fetch.
    pub fn daily_forecast(&self) -> Vec<DailyForecast> {
        self.forecast.read().clone()
    }

    async fn fetch(&self) -> anyhow::Result<()> {
        let url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}\
             &current_weather=true\
             &daily=temperature_2m_min,temperature_2m_max,weathercode,precipitation_sum\
             &timezone=UTC",
            self.latitude, self.longitude
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("cannot reach weather provider")?;
        anyhow::ensure!(
            response.status().is_success(),
            "weather provider returned {}",
            response.status()
        );
        let payload: ProviderResponse = response
            .json()
            .await
            .context("weather provider sent invalid JSON")?;

        if let Some(current) = payload.current_weather {
            *self.current.write() = Some(CurrentWeather {
                temperature_c: current.temperature,
                wind_speed_kmh: current.windspeed,
                weather_code: current.weathercode,
                altitude_m: payload.elevation,
                fetched_at: Utc::now(),
            });
        }
        if let Some(daily) = payload.daily {
            *self.forecast.write() = convert_daily(daily);
        }
        debug!(
            "weather: updated, {} forecast days",
            self.forecast.read().len()
        );
        Ok(())
    }
}

fn convert_daily(daily: ProviderDaily) -> Vec<DailyForecast> {
    let mut days = Vec::with_capacity(daily.time.len());
    for (index, date) in daily.time.iter().enumerate() {
        let (Some(&min), Some(&max), Some(&code)) = (
            daily.temperature_2m_min.get(index),
            daily.temperature_2m_max.get(index),
            daily.weathercode.get(index),
        ) else {
            // ragged provider arrays, take what lines up
            break;
        };
        days.push(DailyForecast {
            date: *date,
            temp_min_c: min,
            temp_max_c: max,
            weather_code: code,
            precipitation_mm: daily.precipitation_sum.get(index).copied().unwrap_or(0.0),
        });
    }
    days
}

#[async_trait]
impl Cyclic for OnlineWeather {
    async fn init(&self) -> anyhow::Result<()> {
        self.fetch().await
    }

    async fn update(&self) -> anyhow::Result<()> {
        self.fetch().await
    }
}

#[async_trait]
impl Component for OnlineWeather {
    fn name(&self) -> &'static str {
        "online_weather"
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn is_ready(&self) -> bool {
        self.cycle.is_ready()
    }

    fn is_alive(&self) -> bool {
        self.cycle.is_alive()
    }

    fn start(self: Arc<Self>) {
        if self.disabled {
            debug!("weather: disabled, not starting");
            return;
        }
        self.cycle.spawn(self.clone());
    }

    async fn stop(&self) {
        self.cycle.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "elevation": 118.0,
        "current_weather": {
            "temperature": 17.3,
            "windspeed": 9.1,
            "weathercode": 3,
            "time": "2026-04-02T09:00"
        },
        "daily": {
            "time": ["2026-04-02", "2026-04-03"],
            "temperature_2m_min": [6.1, 7.4],
            "temperature_2m_max": [18.2, 16.0],
            "weathercode": [3, 61],
            "precipitation_sum": [0.0, 4.2]
        }
    }"#;

    #[test]
    fn provider_payload_converts_to_records() {
        let payload: ProviderResponse = serde_json::from_str(SAMPLE).unwrap();
        let current = payload.current_weather.as_ref().unwrap();
        assert!((current.temperature - 17.3).abs() < 1e-9);
        assert_eq!(payload.elevation, Some(118.0));

        let days = convert_daily(payload.daily.unwrap());
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].weather_code, 61);
        assert!((days[1].precipitation_mm - 4.2).abs() < 1e-9);
    }

    #[test]
    fn ragged_daily_arrays_are_truncated() {
        let daily = ProviderDaily {
            time: vec![
                NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 4, 3).unwrap(),
            ],
            temperature_2m_min: vec![6.1],
            temperature_2m_max: vec![18.2, 16.0],
            weathercode: vec![3, 61],
            precipitation_sum: vec![],
        };
        let days = convert_daily(daily);
        assert_eq!(days.len(), 1);
        assert!((days[0].precipitation_mm - 0.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_component_reports_no_data() {
        let config = ForecastConfig {
            enabled: false,
            ..ForecastConfig::default()
        };
        let weather = OnlineWeather::new(reqwest::Client::new(), &config);
        assert!(weather.is_disabled());
        assert!(weather.current_weather().is_none());
        assert!(weather.daily_forecast().is_empty());
    }
}
