//! Engine configuration.

use model::{EngineError, Result};
use pipeline::{ActiveConstraints, ScorerWeights};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for slate generation and the catalog cache.
///
/// Every field has a default, so a partial config file only needs to name
/// what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Suggestions per round
    pub slate_size: usize,
    /// Discovery pages fetched per relaxation pass
    pub pages_per_pass: u32,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    /// How many finished rounds count towards the freshness penalty
    pub freshness_rounds: usize,
    pub weights: ScorerWeights,
    /// Constraints enforced on the first pass
    pub constraints: ActiveConstraints,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slate_size: 5,
            pages_per_pass: 2,
            cache_ttl_secs: 600,
            cache_capacity: 1000,
            freshness_rounds: 5,
            weights: ScorerWeights::default(),
            constraints: ActiveConstraints::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_slate_size(mut self, slate_size: usize) -> Self {
        self.slate_size = slate_size;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slate_size == 0 {
            return Err(EngineError::Validation("slate size must be at least 1".into()));
        }
        if self.pages_per_pass == 0 {
            return Err(EngineError::Validation(
                "pages per pass must be at least 1".into(),
            ));
        }
        if !self.constraints.content_rating {
            return Err(EngineError::Validation(
                "the content-rating ceiling cannot be disabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"slate_size": 8}"#).unwrap();
        assert_eq!(config.slate_size, 8);
        assert_eq!(config.pages_per_pass, 2);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(EngineConfig::default().with_slate_size(0).validate().is_err());

        let mut config = EngineConfig::default();
        config.constraints.content_rating = false;
        assert!(config.validate().is_err());
    }
}
