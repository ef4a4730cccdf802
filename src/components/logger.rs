// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Sensor value logger - periodic CSV rows of the averaged readings

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::core::{Component, ComponentRegistry, CycleTiming, Cyclic, UpdateLoop};

const HEADER: &str = "timestamp,temperature_c,humidity_pct,pressure_hpa,co2_ppm,tvoc_ppb\n";

/// Cyclic component appending the current averaged sensor values to a CSV
/// file. Quantities without data stay empty in the row.
pub struct SensorLogger {
    cycle: UpdateLoop,
    disabled: bool,
    log_file: PathBuf,
    registry: Weak<ComponentRegistry>,
}

impl SensorLogger {
    /// Logger writing to `<data_dir>/sensors.csv` every `interval_s`.
    pub fn new(
        enabled: bool,
        data_dir: &std::path::Path,
        interval_s: u64,
        registry: Weak<ComponentRegistry>,
    ) -> Self {
        let interval = Duration::from_secs(interval_s.max(1));
        Self {
            cycle: UpdateLoop::new("sensor_logger", CycleTiming::new(interval)),
            disabled: !enabled,
            log_file: data_dir.join("sensors.csv"),
            registry,
        }
    }

    fn append_row(&self) -> anyhow::Result<()> {
        let Some(registry) = self.registry.upgrade() else {
            return Ok(());
        };
        let row = format!(
            "{},{},{},{},{},{}\n",
            Utc::now().to_rfc3339(),
            field(registry.temperature_sensor().temperature()),
            field(registry.humidity_sensor().humidity()),
            field(registry.pressure_sensor().pressure()),
            field(registry.co2_sensor().co2()),
            field(registry.tvoc_sensor().tvoc()),
        );
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("open {}", self.log_file.display()))?;
        file.write_all(row.as_bytes())
            .with_context(|| format!("append to {}", self.log_file.display()))?;
        debug!("sensor log: row appended");
        Ok(())
    }
}

#[async_trait]
impl Cyclic for SensorLogger {
    async fn init(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        if !self.log_file.exists() {
            std::fs::write(&self.log_file, HEADER)
                .with_context(|| format!("create {}", self.log_file.display()))?;
        }
        Ok(())
    }

    async fn update(&self) -> anyhow::Result<()> {
        self.append_row()
    }
}

#[async_trait]
impl Component for SensorLogger {
    fn name(&self) -> &'static str {
        "sensor_logger"
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
            debug!("sensor log: disabled, not starting");
            return;
        }
        self.cycle.spawn(self.clone());
    }

    async fn stop(&self) {
        self.cycle.stop().await;
    }
}

fn field(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_leave_empty_fields() {
        assert_eq!(field(Some(21.456)), "21.46");
        assert_eq!(field(None), "");
    }

    #[tokio::test]
    async fn init_creates_the_file_with_a_header() {
        let dir = std::env::temp_dir().join(format!("airbarn-log-{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        let logger = SensorLogger::new(true, &dir, 60, Weak::new());

        logger.init().await.unwrap();
        let content = std::fs::read_to_string(dir.join("sensors.csv")).unwrap();
        assert!(content.starts_with("timestamp,"));

        // without a registry an update appends nothing but also fails nothing
        logger.update().await.unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }
}
