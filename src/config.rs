//! Configuration management for the rendition engine

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default timeout for a single handler invocation
pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 30;
/// Default JPEG-style quality applied when a request leaves it unset
pub const DEFAULT_QUALITY: u8 = 85;
/// Default output resolution
pub const DEFAULT_DPI: u32 = 150;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on a single handler call, in seconds
    pub handler_timeout_secs: u64,
    /// Quality used when neither the caller nor the profile sets one
    pub default_quality: u8,
    /// DPI used when neither the caller nor the profile sets one
    pub default_dpi: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            handler_timeout_secs: DEFAULT_HANDLER_TIMEOUT_SECS,
            default_quality: DEFAULT_QUALITY,
            default_dpi: DEFAULT_DPI,
        }
    }
}

impl EngineConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} out of range: {value} (max: {max})")]
    OutOfRange {
        name: &'static str,
        value: u64,
        max: u64,
    },
}

impl Config {
    /// Load configuration from `RENDITION_*` environment variables.
    ///
    /// Unset variables fall back to defaults; set but unparseable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let handler_timeout_secs =
            parse_var("RENDITION_HANDLER_TIMEOUT_SECS", DEFAULT_HANDLER_TIMEOUT_SECS)?;
        let default_quality: u64 = parse_var("RENDITION_DEFAULT_QUALITY", DEFAULT_QUALITY as u64)?;
        if default_quality > 100 {
            return Err(ConfigError::OutOfRange {
                name: "RENDITION_DEFAULT_QUALITY",
                value: default_quality,
                max: 100,
            });
        }
        let default_dpi = parse_var("RENDITION_DEFAULT_DPI", DEFAULT_DPI)?;

        Ok(Config {
            engine: EngineConfig {
                handler_timeout_secs,
                default_quality: default_quality as u8,
                default_dpi,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
