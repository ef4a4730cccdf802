// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Base capability shared by every station component

use std::sync::Arc;

use async_trait::async_trait;

/// Common interface of all station components.
///
/// A component is constructed exactly once by the registry (or directly in
/// tests), optionally runs a background update loop, and is stopped when the
/// registry is torn down. Consumers only ever see this surface plus the
/// quantity getters of the sensor traits.
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable name the registry files this component under.
    fn name(&self) -> &'static str;

    /// The component was switched off in settings or has no backing
    /// hardware. Its interface stays callable; getters report no data
    /// instead of failing the caller.
    fn is_disabled(&self) -> bool {
        false
    }

    /// First initialization has completed. Components without a background
    /// loop are ready as soon as they are constructed.
    fn is_ready(&self) -> bool {
        true
    }

    /// The background loop is currently scheduled. Components without a
    /// loop report `true` so supervision leaves them alone.
    fn is_alive(&self) -> bool {
        true
    }

    /// Re-running this component's initialization has a visible side effect
    /// (e.g. a display flicker), so it must never be restarted implicitly.
    fn reload_forbidden(&self) -> bool {
        false
    }

    /// Begin background work. No-op for components without a loop.
    fn start(self: Arc<Self>) {}

    /// Stop background work. Idempotent and safe to call before `start`.
    async fn stop(&self) {}
}
