//! Runtime configuration.
//!
//! Every setting has a default. An optional RON file can override them, and
//! environment variables override the file:
//!
//! - `POKEROLL_API_URL`: base URL of the PokéAPI
//! - `POKEROLL_CACHE_DIR`: root of the on-disk cache
//! - `POKEROLL_LOCALE`: locale used for display names
//! - `POKEROLL_RETRIES`: retries after a failed request
//! - `POKEROLL_BACKOFF_MS`: delay before the first retry, doubled each time
//! - `POKEROLL_INTERVAL_MS`: minimum delay between request starts
use crate::Locale;

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub cache_dir: PathBuf,
    pub locale: Locale,
    pub retries: usize,
    pub backoff: Duration,
    pub interval: Duration,
    pub concurrency: usize,
    pub timeout: Duration,
    pub prefetch_batch: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("could not read config file: {0}")]
    Io(Arc<std::io::Error>),
    #[error("malformed config file: {0}")]
    Malformed(Arc<ron::error::SpannedError>),
    #[error("invalid value for {name}: {value}")]
    InvalidVariable { name: &'static str, value: String },
}

impl Config {
    pub const DEFAULT_API_URL: &'static str = "https://pokeapi.co/api/v2";

    /// Loads the config file at `path`, if present, and applies environment
    /// overrides on top.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let config = if fs::try_exists(path).await.unwrap_or(false) {
            let contents = fs::read_to_string(path)
                .await
                .map_err(|error| Error::Io(Arc::new(error)))?;

            let file: File =
                ron::from_str(&contents).map_err(|error| Error::Malformed(Arc::new(error)))?;

            log::info!("Loaded configuration from {}", path.display());

            file.apply(Self::default())
        } else {
            Self::default()
        };

        config.with_env(|name| env::var(name).ok())
    }

    fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        if let Some(api_url) = var("POKEROLL_API_URL") {
            self.api_url = api_url;
        }

        if let Some(cache_dir) = var("POKEROLL_CACHE_DIR") {
            self.cache_dir = PathBuf::from(cache_dir);
        }

        if let Some(locale) = var("POKEROLL_LOCALE") {
            self.locale = Locale::new(locale);
        }

        if let Some(retries) = var("POKEROLL_RETRIES") {
            self.retries = parse("POKEROLL_RETRIES", retries)?;
        }

        if let Some(backoff) = var("POKEROLL_BACKOFF_MS") {
            self.backoff = Duration::from_millis(parse("POKEROLL_BACKOFF_MS", backoff)?);
        }

        if let Some(interval) = var("POKEROLL_INTERVAL_MS") {
            self.interval = Duration::from_millis(parse("POKEROLL_INTERVAL_MS", interval)?);
        }

        Ok(self)
    }

    /// The delay before retry number `attempt` (starting at 0).
    pub fn backoff(&self, attempt: usize) -> Duration {
        self.backoff
            .saturating_mul(1 << attempt.min(16) as u32)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_owned(),
            cache_dir: dirs::cache_dir()
                .unwrap_or_default()
                .join("pokeroll"),
            locale: Locale::english(),
            retries: 2,
            backoff: Duration::from_millis(200),
            interval: Duration::from_millis(50),
            concurrency: 8,
            timeout: Duration::from_secs(10),
            prefetch_batch: 12,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct File {
    api_url: Option<String>,
    cache_dir: Option<PathBuf>,
    locale: Option<String>,
    retries: Option<usize>,
    backoff_ms: Option<u64>,
    interval_ms: Option<u64>,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
    prefetch_batch: Option<usize>,
}

impl File {
    fn apply(self, config: Config) -> Config {
        Config {
            api_url: self.api_url.unwrap_or(config.api_url),
            cache_dir: self.cache_dir.unwrap_or(config.cache_dir),
            locale: self.locale.map(Locale::new).unwrap_or(config.locale),
            retries: self.retries.unwrap_or(config.retries),
            backoff: self
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(config.backoff),
            interval: self
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(config.interval),
            concurrency: self.concurrency.unwrap_or(config.concurrency).max(1),
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(config.timeout),
            prefetch_batch: self.prefetch_batch.unwrap_or(config.prefetch_batch),
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidVariable { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    #[test]
    fn environment_overrides_defaults() {
        let vars = HashMap::from([
            ("POKEROLL_API_URL", "http://localhost:8000/api/v2"),
            ("POKEROLL_CACHE_DIR", "/tmp/pokeroll"),
            ("POKEROLL_LOCALE", "de"),
            ("POKEROLL_RETRIES", "5"),
            ("POKEROLL_BACKOFF_MS", "10"),
        ]);

        let config = Config::default()
            .with_env(|name| vars.get(name).map(|value| (*value).to_owned()))
            .unwrap();

        assert_eq!(config.api_url, "http://localhost:8000/api/v2");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/pokeroll"));
        assert_eq!(config.locale, Locale::new("de"));
        assert_eq!(config.retries, 5);
        assert_eq!(config.backoff, Duration::from_millis(10));
        assert_eq!(config.interval, Config::default().interval);
    }

    #[test]
    fn invalid_variables_are_reported() {
        let result = Config::default().with_env(|name| {
            (name == "POKEROLL_RETRIES").then(|| "many".to_owned())
        });

        assert!(matches!(
            result,
            Err(Error::InvalidVariable {
                name: "POKEROLL_RETRIES",
                ..
            })
        ));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = Config::default();

        assert_eq!(config.backoff(0), Duration::from_millis(200));
        assert_eq!(config.backoff(1), Duration::from_millis(400));
        assert_eq!(config.backoff(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn config_file_is_optional_and_partial() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.ron");

        let missing = Config::load(&path).await.unwrap();
        let defaults = Config::default()
            .with_env(|name| env::var(name).ok())
            .unwrap();
        assert_eq!(missing.retries, defaults.retries);

        fs::write(&path, "(retries: Some(7), interval_ms: Some(5))")
            .await
            .unwrap();

        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.interval, Duration::from_millis(5));
        assert_eq!(loaded.api_url, Config::DEFAULT_API_URL);
    }
}
