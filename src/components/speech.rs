// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Text-to-speech sink
//!
//! Synthesis runs through an external `espeak-ng` process into a cached wav
//! which is then handed to the sound component. The whole path is
//! fire-and-forget: any failure is logged and swallowed.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Weak;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::{Component, ComponentRegistry};

const SYNTHESIZER: &str = "espeak-ng";

/// Spoken announcements for greetings and alarms.
pub struct Speech {
    cache_dir: PathBuf,
    registry: Weak<ComponentRegistry>,
}

impl Speech {
    /// TTS sink caching synthesized files under the data directory.
    pub fn new(config: &Config, registry: Weak<ComponentRegistry>) -> Self {
        Self {
            cache_dir: config.data_dir.join("tts"),
            registry,
        }
    }

    /// Speak a text without blocking the caller. Silently does nothing
    /// while sound output is disabled.
    pub fn say(&self, text: &str) {
        let Some(registry) = self.registry.upgrade() else {
            debug!("speech: no registry, dropping {:?}", text);
            return;
        };
        let sound = registry.sound();
        if sound.is_disabled() {
            return;
        }
        let text = text.to_string();
        let cache_dir = self.cache_dir.clone();
        tokio::task::spawn_blocking(move || match synthesize(&cache_dir, &text) {
            Ok(file) => sound.play(file),
            Err(err) => warn!("speech: cannot synthesize {:?}: {:#}", text, err),
        });
    }
}

#[async_trait]
impl Component for Speech {
    fn name(&self) -> &'static str {
        "speech"
    }
}

fn synthesize(cache_dir: &Path, text: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("create {}", cache_dir.display()))?;
    let file = cache_dir.join(format!("{}.wav", cache_key(text)));
    if !file.exists() {
        let status = Command::new(SYNTHESIZER)
            .arg("-w")
            .arg(&file)
            .arg(text)
            .status()
            .with_context(|| format!("{} not available", SYNTHESIZER))?;
        anyhow::ensure!(status.success(), "{} exited with {}", SYNTHESIZER, status);
        debug!("speech: synthesized {:?} to {}", text, file.display());
    }
    Ok(file)
}

/// Filename-safe cache key derived from the text.
fn cache_key(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .take(30)
        .collect()
}
