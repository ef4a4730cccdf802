// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Display brightness component

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::Settings;
use crate::core::Component;
use crate::runtime::RuntimeSystem;

/// Brightness control for the station's touchscreen.
///
/// Non-cyclic: brightness changes are applied synchronously on call. Marked
/// `reload_forbidden` because re-initializing the backlight visibly
/// flickers the panel.
pub struct Display {
    runtime: Arc<RuntimeSystem>,
    backlight_dir: PathBuf,
    brightness: AtomicU8,
}

impl Display {
    /// Create the display wrapper and apply the configured brightness.
    pub fn new(settings: &Settings, runtime: Arc<RuntimeSystem>) -> Self {
        let config = settings.read();
        let display = Self {
            runtime,
            backlight_dir: config.display.backlight_path.clone(),
            brightness: AtomicU8::new(config.energy.brightness.min(100)),
        };
        drop(config);
        display.apply(display.brightness.load(Ordering::SeqCst));
        display
    }

    /// Current brightness in percent.
    pub fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::SeqCst)
    }

    /// Set the brightness in percent. A repeated value is a no-op; the
    /// hardware write happens on a blocking thread and only on the target.
    pub fn set_brightness(&self, percent: u8) {
        let percent = percent.min(100);
        if self.brightness.swap(percent, Ordering::SeqCst) == percent {
            return;
        }
        debug!("display: brightness -> {}%", percent);
        self.apply(percent);
    }

    fn apply(&self, percent: u8) {
        if !self.runtime.is_target_system() {
            return;
        }
        let dir = self.backlight_dir.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = write_backlight(&dir, percent) {
                error!("display: cannot set brightness to {}%: {}", percent, err);
            }
        });
    }
}

#[async_trait]
impl Component for Display {
    fn name(&self) -> &'static str {
        "display"
    }

    fn reload_forbidden(&self) -> bool {
        true
    }
}

fn write_backlight(dir: &Path, percent: u8) -> io::Result<()> {
    let max: u32 = fs::read_to_string(dir.join("max_brightness"))?
        .trim()
        .parse()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err}")))?;
    let raw = max * u32::from(percent) / 100;
    fs::write(dir.join("brightness"), raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn brightness_is_tracked_without_hardware() {
        let display = Display::new(&Settings::in_memory(), Arc::new(RuntimeSystem::host()));
        assert_eq!(display.brightness(), 90);

        display.set_brightness(40);
        assert_eq!(display.brightness(), 40);

        // values are clamped to percent
        display.set_brightness(200);
        assert_eq!(display.brightness(), 100);
    }

    #[test]
    fn backlight_write_scales_to_the_panel_maximum() {
        let dir = std::env::temp_dir().join(format!("airbarn-backlight-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("max_brightness"), "255\n").unwrap();

        write_backlight(&dir, 50).unwrap();
        let raw = fs::read_to_string(dir.join("brightness")).unwrap();
        assert_eq!(raw, "127");
        fs::remove_dir_all(&dir).ok();
    }
}
