use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Serialize;
use std::path::PathBuf;

use loseit_core::config::{DEFAULT_BATCH_SIZE, StoreConfig};
use loseit_core::service::HealthService;

#[derive(Debug, Serialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub connection_string: String,
    pub batch_size: usize,
}

impl Config {
    /// Resolve the data directory and apply `--db` and environment overrides.
    pub fn load(db_override: Option<&str>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "loseit").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::resolve(data_dir, db_override, |key| std::env::var(key).ok())
    }

    fn resolve(
        data_dir: PathBuf,
        db_override: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let connection_string = db_override
            .map(str::to_string)
            .or_else(|| non_empty(env("LOSEIT_DATABASE_URL")))
            .or_else(|| non_empty(env("DATABASE_URL")))
            .unwrap_or_else(|| data_dir.join("loseit.db").to_string_lossy().into_owned());

        let batch_size = match non_empty(env("LOSEIT_BATCH_SIZE")) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid LOSEIT_BATCH_SIZE '{raw}'"))?,
            None => DEFAULT_BATCH_SIZE,
        };

        Ok(Config {
            data_dir,
            connection_string,
            batch_size,
        })
    }

    pub fn store_config(&self, full_reload: bool) -> Result<StoreConfig> {
        let config = StoreConfig::new(self.connection_string.clone())?
            .with_batch_size(self.batch_size)
            .with_full_reload(full_reload);
        config.validate()?;
        Ok(config)
    }

    pub fn open(&self, full_reload: bool) -> Result<HealthService> {
        let store = self.store_config(full_reload)?;
        HealthService::open(store)
            .with_context(|| format!("Failed to open database: {}", self.connection_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_database_lives_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve(dir.path().to_path_buf(), None, env_of(&[])).unwrap();
        assert_eq!(
            PathBuf::from(&config.connection_string),
            dir.path().join("loseit.db")
        );
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_env_overrides_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("LOSEIT_DATABASE_URL", "sqlite://mine.db"),
            ("LOSEIT_BATCH_SIZE", "25"),
        ]);
        let config = Config::resolve(dir.path().to_path_buf(), None, env).unwrap();
        assert_eq!(config.connection_string, "sqlite://mine.db");
        assert_eq!(config.batch_size, 25);

        let env = env_of(&[("DATABASE_URL", "sqlite://other.db")]);
        let config = Config::resolve(dir.path().to_path_buf(), None, env).unwrap();
        assert_eq!(config.connection_string, "sqlite://other.db");
    }

    #[test]
    fn test_db_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[("LOSEIT_DATABASE_URL", "sqlite://mine.db")]);
        let config = Config::resolve(dir.path().to_path_buf(), Some(":memory:"), env).unwrap();
        assert_eq!(config.connection_string, ":memory:");
    }

    #[test]
    fn test_invalid_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[("LOSEIT_BATCH_SIZE", "lots")]);
        assert!(Config::resolve(dir.path().to_path_buf(), None, env).is_err());

        let env = env_of(&[("LOSEIT_BATCH_SIZE", "0")]);
        let config = Config::resolve(dir.path().to_path_buf(), None, env).unwrap();
        assert!(config.store_config(false).is_err());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve(dir.path().to_path_buf(), None, env_of(&[])).unwrap();
        let service = config.open(true).unwrap();
        assert!(service.config().full_reload);
        assert!(dir.path().join("loseit.db").exists());
    }
}
