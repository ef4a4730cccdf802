// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Fire-and-forget sound playback
//!
//! Sounds play one after another: a dedicated playback mutex makes the
//! second sound wait for the first to finish. The mutex only serializes
//! audio; no sensor or registry lock is ever involved.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::core::{Component, ComponentRegistry};

/// Serialized audio playback sink.
pub struct Sound {
    disabled: bool,
    night_volume: f32,
    registry: Weak<ComponentRegistry>,
    playback: Arc<Mutex<()>>,
}

impl Sound {
    /// Playback sink; volume drops to the configured night level while the
    /// energy saver reports night mode.
    pub fn new(settings: &Settings, registry: Weak<ComponentRegistry>) -> Self {
        let config = settings.read();
        Self {
            disabled: !config.sound.enabled,
            night_volume: config.sound.night_volume.clamp(0.0, 1.0),
            registry,
            playback: Arc::new(Mutex::new(())),
        }
    }

    /// Play an audio file without blocking the caller. Errors are logged,
    /// never returned; a disabled sink drops the request silently.
    pub fn play(&self, path: PathBuf) {
        if self.disabled {
            debug!("sound: disabled, dropping {}", path.display());
            return;
        }
        let volume = self.current_volume();
        let playback = self.playback.clone();
        tokio::task::spawn_blocking(move || {
            // wait for the previous sound to end
            let _guard = playback.lock();
            if let Err(err) = play_file(&path, volume) {
                warn!("sound: cannot play {}: {:#}", path.display(), err);
            }
        });
    }

    fn current_volume(&self) -> f32 {
        let night = self
            .registry
            .upgrade()
            .map_or(false, |registry| registry.energy_saver().night_mode_active());
        if night {
            self.night_volume
        } else {
            1.0
        }
    }
}

#[async_trait]
impl Component for Sound {
    fn name(&self) -> &'static str {
        "sound"
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }
}

#[cfg(feature = "audio")]
fn play_file(path: &Path, volume: f32) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::io::BufReader;

    let (_stream, handle) =
        rodio::OutputStream::try_default().context("no audio output device")?;
    let sink = rodio::Sink::try_new(&handle).context("cannot open audio sink")?;
    let file = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let source = rodio::Decoder::new(BufReader::new(file)).context("undecodable audio file")?;
    sink.set_volume(volume);
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(not(feature = "audio"))]
fn play_file(path: &Path, _volume: f32) -> anyhow::Result<()> {
    anyhow::bail!(
        "audio support is not compiled in, cannot play {}",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn disabled_sink_drops_requests_without_error() {
        let sound = Sound::new(&Settings::in_memory(), Weak::new());
        assert!(sound.is_disabled());
        sound.play(PathBuf::from("/nonexistent.wav"));
    }

    #[test]
    fn volume_is_full_without_a_registry() {
        let mut config = Config::default();
        config.sound.enabled = true;
        let sound = Sound::new(&Settings::from_config(config), Weak::new());
        assert!(!sound.is_disabled());
        assert!((sound.current_volume() - 1.0).abs() < f32::EPSILON);
    }
}
