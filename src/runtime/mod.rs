// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Runtime system detection - target board vs. development host

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

/// Information about the system the process runs on, determined once at
/// startup and passed by reference to everything that touches hardware.
///
/// Failing to identify the target board is not an error: the station then
/// runs in host mode, where every hardware side effect is replaced by a
/// no-op or a simulated value so the same codebase works on a workstation.
pub struct RuntimeSystem {
    is_target: bool,
    demo_mode: bool,
    platform: String,
}

impl RuntimeSystem {
    /// Probe the board identity. `demo_mode` forces simulated sensor
    /// drivers even when running on real target hardware.
    pub fn detect(demo_mode: bool) -> Self {
        match read_board_model() {
            Some(model) if model.contains("Raspberry Pi") => {
                info!("Target system detected: {}", model);
                Self {
                    is_target: true,
                    demo_mode,
                    platform: model,
                }
            }
            _ => {
                let platform = host_platform();
                info!("No target board found, running in host mode ({})", platform);
                Self {
                    is_target: false,
                    demo_mode,
                    platform,
                }
            }
        }
    }

    /// Host-mode instance without probing. Used by tests.
    pub fn host() -> Self {
        Self {
            is_target: false,
            demo_mode: false,
            platform: host_platform(),
        }
    }

    /// True when running on the hardware the station is deployed to.
    pub fn is_target_system(&self) -> bool {
        self.is_target
    }

    /// Simulated drivers were requested regardless of the platform.
    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// True when sensor components should talk to real hardware.
    pub fn use_hardware(&self) -> bool {
        self.is_target && !self.demo_mode
    }

    /// Board model on the target, `os@arch` on a host.
    pub fn platform_name(&self) -> &str {
        &self.platform
    }

    /// Power the machine off. Only executed on the target system.
    pub fn shutdown(&self) {
        self.system_command("shutdown", &["now"]);
    }

    /// Reboot the machine. Only executed on the target system.
    pub fn restart(&self) {
        self.system_command("shutdown", &["-r", "now"]);
    }

    fn system_command(&self, program: &str, args: &[&str]) {
        if !self.is_target {
            info!("Host mode, skipping `{} {}`", program, args.join(" "));
            return;
        }
        if let Err(err) = Command::new(program).args(args).spawn() {
            warn!("Failed to run `{} {}`: {}", program, args.join(" "), err);
        }
    }
}

fn read_board_model() -> Option<String> {
    read_board_model_from(Path::new(DEVICE_TREE_MODEL))
}

fn read_board_model_from(path: &Path) -> Option<String> {
    let raw = fs::read(path).ok()?;
    // device-tree strings are NUL terminated
    let model = String::from_utf8_lossy(&raw)
        .trim_end_matches('\0')
        .trim()
        .to_string();
    if model.is_empty() {
        None
    } else {
        Some(model)
    }
}

fn host_platform() -> String {
    let os = sysinfo::System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
    format!("{}@{}", os, std::env::consts::ARCH)
}
