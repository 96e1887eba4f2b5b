use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Live tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Configuration for the live position hub
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Assumed average vehicle speed for ETA estimates in km/h (default: 40)
    #[serde(default = "TrackingConfig::default_average_speed_kmh")]
    pub average_speed_kmh: f64,
    /// Buffered updates per schedule fan-out channel (default: 16).
    /// Subscribers that fall behind skip to the latest update.
    #[serde(default = "TrackingConfig::default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: Self::default_average_speed_kmh(),
            channel_capacity: Self::default_channel_capacity(),
        }
    }
}

impl TrackingConfig {
    fn default_average_speed_kmh() -> f64 {
        40.0
    }
    fn default_channel_capacity() -> usize {
        16
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("cors_permissive: true").unwrap();
        assert!(config.cors_permissive);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.tracking.average_speed_kmh, 40.0);
        assert_eq!(config.tracking.channel_capacity, 16);
    }

    #[test]
    fn tracking_overrides_apply() {
        let yaml = "tracking:\n  average_speed_kmh: 55.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tracking.average_speed_kmh, 55.0);
        assert_eq!(config.tracking.channel_capacity, 16);
    }
}
