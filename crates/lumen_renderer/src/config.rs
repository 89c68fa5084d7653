//! Session configuration.
//!
//! Everything here is fixed when a session is created. The driver may build
//! it in code with the `with_*` methods or send it as JSON across its worker
//! boundary; missing JSON fields fall back to the defaults.

use crate::accumulation::ToneMap;
use crate::bucket::DEFAULT_BUCKET_SIZE;
use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Base seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x5eed_1f0c_a11e_d5ee;

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Worker thread hint; `None` uses the available hardware parallelism
    pub threads: Option<usize>,
    /// Base seed for every sample stream
    pub seed: u64,
    /// Tone mapping applied when converting to RGBA8
    pub tone_map: ToneMap,
    /// Edge length of the square work buckets, in pixels
    pub bucket_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threads: None,
            seed: DEFAULT_SEED,
            tone_map: ToneMap::Clamp,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl SessionConfig {
    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the tone mapping operator.
    pub fn with_tone_map(mut self, tone_map: ToneMap) -> Self {
        self.tone_map = tone_map;
        self
    }

    /// Set the bucket size.
    pub fn with_bucket_size(mut self, bucket_size: u32) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.threads == Some(0) {
            return Err(RenderError::InvalidConfig("thread count must be at least 1".into()));
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidConfig("bucket size must be at least 1".into()));
        }
        Ok(())
    }

    /// Worker count after applying the hardware default.
    pub fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.resolved_threads() >= 1);
        assert_eq!(config.bucket_size, DEFAULT_BUCKET_SIZE);
    }

    #[test]
    fn test_builder_methods() {
        let config = SessionConfig::default()
            .with_threads(3)
            .with_seed(9)
            .with_tone_map(ToneMap::Reinhard)
            .with_bucket_size(8);

        assert_eq!(config.resolved_threads(), 3);
        assert_eq!(config.seed, 9);
        assert_eq!(config.tone_map, ToneMap::Reinhard);
        assert_eq!(config.bucket_size, 8);
    }

    #[test]
    fn test_rejects_zero_threads_and_buckets() {
        assert!(matches!(
            SessionConfig::default().with_threads(0).validate(),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::default().with_bucket_size(0).validate(),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{ "threads": 2, "tone_map": "Reinhard" }"#).unwrap();
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.tone_map, ToneMap::Reinhard);
        assert_eq!(config.seed, DEFAULT_SEED);

        let back = SessionConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_bad_json_is_reported() {
        assert!(matches!(SessionConfig::from_json("{ not json"), Err(RenderError::Config(_))));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "bucket_size": 0 }"#),
            Err(RenderError::InvalidConfig(_))
        ));
    }
}
