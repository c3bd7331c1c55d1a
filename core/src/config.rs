use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Storage settings handed to the loader, the aggregator, and the service.
///
/// Nothing in this crate reads the environment; callers build this explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    pub connection_string: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub full_reload: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl StoreConfig {
    pub fn new(connection_string: impl Into<String>) -> Result<Self> {
        let config = Self {
            connection_string: connection_string.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            full_reload: false,
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            connection_string: ":memory:".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            full_reload: false,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_full_reload(mut self, full_reload: bool) -> Self {
        self.full_reload = full_reload;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(Error::Validation(
                "connection string must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Validation(
                "batch size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = StoreConfig::new("sqlite://health.db").unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!config.full_reload);
    }

    #[test]
    fn test_rejects_empty_connection_string() {
        assert!(matches!(
            StoreConfig::new("  "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let config = StoreConfig::in_memory().with_batch_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"connection_string": ":memory:"}"#).unwrap();
        assert_eq!(config.batch_size, 100);
        assert!(!config.full_reload);

        let config: StoreConfig = serde_json::from_str(
            r#"{"connection_string": ":memory:", "batch_size": 5, "full_reload": true}"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 5);
        assert!(config.full_reload);
    }
}
