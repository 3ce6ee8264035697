//! Configuration management for playback parameters
//!
//! This module provides runtime configuration loading from JSON files so
//! stream format, tone and polling parameters can be adjusted without
//! recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub tone: ToneConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Output stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Requested sample rate in Hz (the device default is used if unsupported)
    pub sample_rate: u32,
    /// Requested output channel count
    pub channel_count: u16,
    /// Burst size in frames used when the host cannot report one
    pub frames_per_burst: u32,
    /// Buffer size in bursts applied at creation (0 = automatic)
    pub buffer_size_in_bursts: i32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channel_count: 2,
            // 4ms at 48kHz, the usual low-latency burst on Android devices
            frames_per_burst: 192,
            buffer_size_in_bursts: 0,
        }
    }
}

/// Tone generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency_hz: f32,
    /// Peak amplitude in [0.0, 1.0]
    pub amplitude: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            amplitude: 0.3,
        }
    }
}

/// Controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Period of the latency poll in milliseconds
    pub latency_update_interval_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            latency_update_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file doesn't exist
    /// or its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config.sanitized()
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Android builds do not ship a config file; defaults are used.
    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/playback_config.json")
    }

    /// Replace out-of-range values with their defaults
    fn sanitized(mut self) -> Self {
        if self.audio.sample_rate == 0 {
            log::warn!("[Config] sample_rate must be > 0, using default");
            self.audio.sample_rate = AudioConfig::default().sample_rate;
        }
        if self.audio.channel_count == 0 {
            log::warn!("[Config] channel_count must be > 0, using default");
            self.audio.channel_count = AudioConfig::default().channel_count;
        }
        if self.audio.frames_per_burst == 0 {
            log::warn!("[Config] frames_per_burst must be > 0, using default");
            self.audio.frames_per_burst = AudioConfig::default().frames_per_burst;
        }
        self.tone.amplitude = self.tone.amplitude.clamp(0.0, 1.0);
        if self.ui.latency_update_interval_ms == 0 {
            self.ui.latency_update_interval_ms = UiConfig::default().latency_update_interval_ms;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.frames_per_burst, 192);
        assert_eq!(config.audio.buffer_size_in_bursts, 0);
        assert_eq!(config.tone.frequency_hz, 440.0);
        assert_eq!(config.ui.latency_update_interval_ms, 1000);
    }

    #[test]
    fn test_partial_json_uses_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "tone": {{ "frequency_hz": 880.0 }} }}"#).unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.tone.frequency_hz, 880.0);
        assert_eq!(config.tone.amplitude, 0.3);
        assert_eq!(config.audio.sample_rate, 48000);
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "audio": {{ "frames_per_burst": 0 }}, "tone": {{ "amplitude": 4.0 }} }}"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.audio.frames_per_burst, 192);
        assert_eq!(config.tone.amplitude, 1.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/playback_config.json");
        assert_eq!(config.audio.channel_count, 2);
    }

    #[test]
    fn test_malformed_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.ui.latency_update_interval_ms, 1000);
    }
}
