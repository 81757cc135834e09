//! Configuration types for encoding and playback.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default sampling interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u32 = 100;

/// Sampling interval range accepted by the encoder front end.
pub const MIN_ENCODE_INTERVAL_MS: u32 = 100;
pub const MAX_ENCODE_INTERVAL_MS: u32 = 10_000;

/// Exclusive upper bound for playback retiming.
pub const MAX_PLAYBACK_INTERVAL_MS: u32 = 100_000;

/// Default number of frames held in memory during playback.
pub const DEFAULT_WINDOW_LENGTH: usize = 128;

/// Largest window a player will allocate.
pub const MAX_WINDOW_LENGTH: usize = 1 << 20;

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MS
}

fn default_window_length() -> usize {
    DEFAULT_WINDOW_LENGTH
}

fn default_extra_axes() -> bool {
    true
}

/// Settings for turning source documents into a frame table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Milliseconds between frames in the encoded table.
    #[serde(default = "default_interval")]
    pub interval_ms: u32,
    /// Directory for the output file. Current directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            output_dir: None,
        }
    }
}

impl EncoderConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_ENCODE_INTERVAL_MS..=MAX_ENCODE_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(ConfigError::IntervalOutOfRange {
                value: self.interval_ms,
                min: MIN_ENCODE_INTERVAL_MS,
                max: MAX_ENCODE_INTERVAL_MS,
            });
        }
        Ok(())
    }
}

/// Settings for a playback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Frames held in memory at once.
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Emit surge/sway commands from the extension block.
    #[serde(default = "default_extra_axes")]
    pub extra_axes: bool,
    /// Playback interval override; the header's interval when unset.
    #[serde(default)]
    pub interval_ms: Option<u32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            extra_axes: true,
            interval_ms: None,
        }
    }
}

impl PlayerConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window_length(self.window_length)?;
        if let Some(v) = self.interval_ms
            && !is_playback_interval(v)
        {
            return Err(ConfigError::IntervalOutOfRange {
                value: v,
                min: 1,
                max: MAX_PLAYBACK_INTERVAL_MS - 1,
            });
        }
        Ok(())
    }
}

/// Check a window length against `1..=MAX_WINDOW_LENGTH`.
pub fn check_window_length(window_length: usize) -> Result<(), ConfigError> {
    if window_length == 0 {
        return Err(ConfigError::InvalidWindowLength);
    }
    if window_length > MAX_WINDOW_LENGTH {
        return Err(ConfigError::WindowTooLarge {
            value: window_length,
            max: MAX_WINDOW_LENGTH,
        });
    }
    Ok(())
}

/// Whether `v` is accepted by playback retiming.
#[inline]
pub fn is_playback_interval(v: u32) -> bool {
    v > 0 && v < MAX_PLAYBACK_INTERVAL_MS
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Interval {value} ms is outside {min}..={max} ms")]
    IntervalOutOfRange { value: u32, min: u32, max: u32 },
    #[error("Interval must be positive")]
    InvalidInterval,
    #[error("Window length must be at least one frame")]
    InvalidWindowLength,
    #[error("Window length {value} exceeds {max} frames")]
    WindowTooLarge { value: usize, max: usize },
}
