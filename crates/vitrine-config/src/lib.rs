//! Vitrine configuration system
//!
//! This crate provides centralized configuration for the portfolio motion
//! toolkit, loading defaults for reveals, parallax and counters from
//! `vitrine.toml`, with environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "vitrine.toml";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`VitrineConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VitrineConfig {
    /// Scroll-triggered reveal defaults
    pub reveal: RevealSettings,
    /// Parallax defaults
    pub parallax: ParallaxSettings,
    /// Animated counter defaults
    pub counter: CounterSettings,
    /// Global motion preferences
    pub motion: MotionSettings,
}

/// Scroll-triggered reveal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSettings {
    /// Fraction of the element that must be visible before it reveals
    pub threshold: f64,
    /// CSS-style margin applied to the viewport (e.g. "0px 0px -10% 0px")
    pub root_margin: String,
    /// Latch the reveal once it has happened
    pub once: bool,
    /// Delay between crossing the threshold and revealing
    pub delay_ms: f64,
    /// Length of the reveal transition
    pub duration_ms: f64,
    /// Delay between consecutive children of a staggered reveal
    pub stagger_ms: f64,
    /// Reveal variant name (fadeIn, slideUp, scaleUp, ...)
    pub variant: String,
}

/// Parallax configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxSettings {
    /// Default speed factor
    pub speed: f64,
    /// CSS-style margin applied to the viewport when tracking visibility
    pub root_margin: String,
    /// Minimum interval between scroll-driven recomputations
    pub throttle_ms: f64,
    /// Minimum interval between resize-driven bounds refreshes
    pub resize_throttle_ms: f64,
}

/// Animated counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterSettings {
    /// Animation length
    pub duration_ms: f64,
    /// Easing name (linear, easeOut, easeInOutCubic, bounce, ...)
    pub easing: String,
    /// Visibility threshold for counters that start on scroll
    pub threshold: f64,
    /// Only auto-start on the first time the counter becomes visible
    pub once: bool,
    /// Locale tag used by currency and percentage formatting
    pub locale: String,
    /// ISO 4217 currency code
    pub currency: String,
    /// Thousands separator for plain numbers
    pub separator: String,
    /// Extra delay per index when a batch runs sequentially
    pub sequential_delay_ms: f64,
}

/// Global motion preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Skip motion: reveal immediately, freeze parallax, jump counters to their end value
    pub reduced_motion: bool,
    /// Frame interval used by the simulated host
    pub frame_interval_ms: f64,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin: "0px 0px -10% 0px".to_string(),
            once: true,
            delay_ms: 0.0,
            duration_ms: 600.0,
            stagger_ms: 100.0,
            variant: "fadeIn".to_string(),
        }
    }
}

impl Default for ParallaxSettings {
    fn default() -> Self {
        Self {
            speed: 0.5,
            root_margin: "0px".to_string(),
            throttle_ms: 16.0,
            resize_throttle_ms: 100.0,
        }
    }
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            duration_ms: 2000.0,
            easing: "easeOut".to_string(),
            threshold: 0.1,
            once: true,
            locale: "en-US".to_string(),
            currency: "USD".to_string(),
            separator: ",".to_string(),
            sequential_delay_ms: 500.0,
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            frame_interval_ms: 1000.0 / 60.0,
        }
    }
}

impl VitrineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `vitrine.toml` in the current directory,
    /// or return the defaults if it is missing or invalid
    pub fn load_or_default() -> Self {
        match Self::load_from_file(CONFIG_FILE) {
            Ok(config) => config,
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(error) => {
                warn!(%error, "ignoring {CONFIG_FILE}, using defaults");
                Self::default()
            }
        }
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Some(flag) = env_flag("VITRINE_REDUCED_MOTION") {
            self.motion.reduced_motion = flag;
        }
        if let Some(interval) = env_number("VITRINE_FRAME_INTERVAL_MS") {
            if interval > 0.0 {
                self.motion.frame_interval_ms = interval;
            }
        }

        if let Ok(locale) = std::env::var("VITRINE_LOCALE") {
            self.counter.locale = locale;
        }
        if let Ok(currency) = std::env::var("VITRINE_CURRENCY") {
            self.counter.currency = currency;
        }
        if let Some(duration) = env_number("VITRINE_COUNTER_DURATION_MS") {
            self.counter.duration_ms = duration.max(0.0);
        }

        if let Some(throttle) = env_number("VITRINE_PARALLAX_THROTTLE_MS") {
            self.parallax.throttle_ms = throttle.max(0.0);
        }

        if let Some(threshold) = env_number("VITRINE_REVEAL_THRESHOLD") {
            self.reveal.threshold = threshold.clamp(0.0, 1.0);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from vitrine.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
}

fn env_number(name: &str) -> Option<f64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(variable = name, value = %raw, "ignoring non-numeric override");
            None
        }
    }
}
