use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub flame: FlameConfig,
}

/// What to do with an Enter whose correlation key is already open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateEnterPolicy {
    /// The newer Enter replaces the open one.
    #[default]
    Replace,
    /// The first open Enter is kept; later ones are ignored.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window_ms: u64,
    pub refresh_interval_ms: u64,
    pub min_segment_ms: u64,
    pub duplicate_enter: DuplicateEnterPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_ms: 2_000,
            refresh_interval_ms: 400,
            min_segment_ms: 30,
            duplicate_enter: DuplicateEnterPolicy::Replace,
        }
    }
}

impl WindowConfig {
    pub fn window(&self) -> Timestamp {
        Timestamp::from_millis(self.window_ms)
    }

    pub fn refresh_interval(&self) -> Timestamp {
        Timestamp::from_millis(self.refresh_interval_ms)
    }

    pub fn min_segment(&self) -> Timestamp {
        Timestamp::from_millis(self.min_segment_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlameConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_factor: f64,
    pub pan_fraction: f64,
    pub row_height: f32,
    pub row_gap: f32,
    pub axis_height: f32,
    pub axis_intervals: u32,
    pub label_min_px: f32,
    pub min_rect_px: f32,
    pub cull_px: f32,
    /// Device time units in one second; used for axis and tooltip labels.
    pub units_per_second: u64,
}

impl Default for FlameConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.00001,
            max_zoom: 100.0,
            zoom_factor: 1.2,
            pan_fraction: 0.15,
            row_height: 40.0,
            row_gap: 2.0,
            axis_height: 20.0,
            axis_intervals: 10,
            label_min_px: 40.0,
            min_rect_px: 1.0,
            cull_px: 0.2,
            units_per_second: 1_000_000,
        }
    }
}

impl FlameConfig {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `HERMES_WINDOW_MS` and `HERMES_REFRESH_MS` from the process
    /// environment, then re-validates.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(ms) = override_ms(&lookup, "HERMES_WINDOW_MS")? {
            self.window.window_ms = ms;
        }
        if let Some(ms) = override_ms(&lookup, "HERMES_REFRESH_MS")? {
            self.window.refresh_interval_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let flame = &self.flame;
        if self.window.window_ms == 0 {
            return Err(invalid("window.window_ms", "must be positive"));
        }
        if self.window.refresh_interval_ms == 0 {
            return Err(invalid("window.refresh_interval_ms", "must be positive"));
        }
        if !(flame.min_zoom > 0.0) {
            return Err(invalid("flame.min_zoom", "must be positive"));
        }
        if !(flame.min_zoom < flame.max_zoom) {
            return Err(invalid(
                "flame.max_zoom",
                format!("must exceed min_zoom ({})", flame.min_zoom),
            ));
        }
        if !(flame.zoom_factor > 1.0) {
            return Err(invalid("flame.zoom_factor", "must be greater than 1"));
        }
        if !(flame.pan_fraction > 0.0 && flame.pan_fraction <= 1.0) {
            return Err(invalid("flame.pan_fraction", "must be in (0, 1]"));
        }
        if !(flame.row_height > flame.row_gap) {
            return Err(invalid("flame.row_height", "must exceed row_gap"));
        }
        if flame.axis_intervals == 0 {
            return Err(invalid("flame.axis_intervals", "must be positive"));
        }
        if flame.units_per_second == 0 {
            return Err(invalid("flame.units_per_second", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn override_ms(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|err| invalid(name, format!("{raw:?}: {err}")))
}
