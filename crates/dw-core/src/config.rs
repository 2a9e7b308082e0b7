//! Engine configuration.

use crate::error::DwError;
use crate::main_loop::{DEFAULT_DRAIN_POLICY, DEFAULT_POLL_INTERVAL_MS, DrainPolicy};
use crate::queue::{DEFAULT_QUEUE_CAPACITY, DEFAULT_SPIN_LIMIT};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for an [`crate::Engine`]. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Defer expose events to the UI thread and draw through a backing bitmap.
    pub render_safe: bool,
    /// Records per queue.
    pub queue_capacity: usize,
    /// Upper bound on how long the main loop sleeps without events.
    pub poll_interval_ms: u64,
    /// `try_lock` attempts before a producer blocks on a queue lock.
    pub enqueue_spin_limit: u32,
    pub drain_policy: DrainPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_safe: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            enqueue_spin_limit: DEFAULT_SPIN_LIMIT,
            drain_policy: DEFAULT_DRAIN_POLICY,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self, DwError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from config file, or return default if missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(DwError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save to config file
    pub fn save(&self, path: &Path) -> Result<(), DwError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply `DW_RENDER_SAFE` and `DW_POLL_INTERVAL_MS` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("DW_RENDER_SAFE") {
            match parse_flag(&value) {
                Some(flag) => self.render_safe = flag,
                None => warn!("Ignoring DW_RENDER_SAFE={}", value),
            }
        }
        if let Ok(value) = std::env::var("DW_POLL_INTERVAL_MS") {
            match value.trim().parse() {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(_) => warn!("Ignoring DW_POLL_INTERVAL_MS={}", value),
            }
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
