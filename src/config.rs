//! Sender configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FountainError, Result};

/// Encoder and emission settings.
///
/// Only `slice_size` reaches the codec; the rest drives the display loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Bytes per source symbol.
    ///
    /// Default: 1000
    pub slice_size: usize,

    /// Target blocks per second for the emission loop.
    ///
    /// Default: 20
    pub emission_rate: u32,

    /// Prepended to every transport string so a generic scanner can route
    /// it, e.g. a URI fragment prefix.
    ///
    /// Default: empty
    pub scheme_prefix: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            slice_size: 1000,
            emission_rate: 20,
            scheme_prefix: String::new(),
        }
    }
}

impl EncoderConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slice_size == 0 {
            return Err(FountainError::EncoderMisuse(
                "slice_size must be positive".into(),
            ));
        }
        if self.emission_rate == 0 {
            return Err(FountainError::EncoderMisuse(
                "emission_rate must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Pause between two emitted blocks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.emission_rate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.slice_size, 1000);
        assert_eq!(config.emission_rate, 20);
        assert_eq!(config.frame_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EncoderConfig::from_json(r#"{"slice_size": 400}"#).unwrap();
        assert_eq!(config.slice_size, 400);
        assert_eq!(config.emission_rate, 20);
        assert!(config.scheme_prefix.is_empty());
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(matches!(
            EncoderConfig::from_json(r#"{"slice_size": 0}"#),
            Err(FountainError::EncoderMisuse(_))
        ));
        assert!(matches!(
            EncoderConfig::from_json(r#"{"emission_rate": 0}"#),
            Err(FountainError::EncoderMisuse(_))
        ));
    }
}
