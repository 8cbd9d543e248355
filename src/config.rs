//! Engine configuration.
//!
//! Capacities and feed scaling knobs, loadable from a TOML file for
//! the replay binaries. Every field has a default, so an empty file is
//! a valid configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Orders pre-reserved in the order arena
    pub order_capacity: u32,
    /// Levels pre-reserved in the level arena
    pub level_capacity: u32,
    /// Trade-window ring capacity (power of two)
    pub window_capacity: usize,
    /// Ticks per price unit when converting decimal feed prices
    pub price_scale: u32,
    /// Optional CPU core to pin the replay thread to
    pub pin_core: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_capacity: 1 << 16,
            level_capacity: 1 << 11,
            window_capacity: 1 << 16,
            price_scale: 100,
            pin_core: None,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.window_capacity.is_power_of_two() {
            bail!(
                "window_capacity must be a power of two, got {}",
                self.window_capacity
            );
        }
        if self.price_scale == 0 {
            bail!("price_scale must be non-zero");
        }
        Ok(())
    }
}
