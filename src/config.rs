//! Application-level configuration loading, including match-format limits.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "X01_BACK_CONFIG_PATH";

/// Start scores offered as presets when none is given.
const DEFAULT_PRESET_SCORES: [u16; 2] = [301, 501];
/// Bounds for custom start scores. The lower bound keeps a leg winnable
/// (a score of 1 can never be checked out).
const DEFAULT_CUSTOM_SCORE_RANGE: (u16, u16) = (2, 1001);
/// Default length of generated join codes.
const DEFAULT_ROOM_CODE_LENGTH: usize = 6;
/// Default broadcast capacity for SSE hubs.
const DEFAULT_SSE_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    preset_start_scores: Vec<u16>,
    custom_score_min: u16,
    custom_score_max: u16,
    room_code_length: usize,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Whether `score` is an acceptable leg start score: either one of the
    /// configured presets or inside the custom range.
    pub fn is_valid_start_score(&self, score: u16) -> bool {
        self.preset_start_scores.contains(&score)
            || (self.custom_score_min..=self.custom_score_max).contains(&score)
    }

    /// Length of generated join codes.
    pub fn room_code_length(&self) -> usize {
        self.room_code_length
    }

    /// Broadcast channel capacity for SSE hubs.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preset_start_scores: DEFAULT_PRESET_SCORES.to_vec(),
            custom_score_min: DEFAULT_CUSTOM_SCORE_RANGE.0,
            custom_score_max: DEFAULT_CUSTOM_SCORE_RANGE.1,
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    preset_start_scores: Option<Vec<u16>>,
    #[serde(default)]
    custom_score_min: Option<u16>,
    #[serde(default)]
    custom_score_max: Option<u16>,
    #[serde(default)]
    room_code_length: Option<usize>,
    #[serde(default)]
    sse_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            preset_start_scores: raw
                .preset_start_scores
                .filter(|scores| !scores.is_empty())
                .unwrap_or(defaults.preset_start_scores),
            custom_score_min: raw.custom_score_min.unwrap_or(defaults.custom_score_min).max(2),
            custom_score_max: raw.custom_score_max.unwrap_or(defaults.custom_score_max),
            room_code_length: raw
                .room_code_length
                .unwrap_or(defaults.room_code_length)
                .clamp(4, 12),
            sse_capacity: raw.sse_capacity.unwrap_or(defaults.sse_capacity).max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_accept_presets_and_custom_scores() {
        let config = AppConfig::default();
        assert!(config.is_valid_start_score(501));
        assert!(config.is_valid_start_score(301));
        assert!(config.is_valid_start_score(170));
        assert!(!config.is_valid_start_score(1));
        assert!(!config.is_valid_start_score(0));
        assert!(!config.is_valid_start_score(1002));
    }

    #[test]
    fn raw_config_backfills_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"room_code_length": 8}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.room_code_length(), 8);
        assert_eq!(config.sse_capacity(), DEFAULT_SSE_CAPACITY);
        assert!(config.is_valid_start_score(501));
    }
}
