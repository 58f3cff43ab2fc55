use std::{collections::HashMap, time::Duration};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_REMOVE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepfetchConfig {
    pub http_timeout: Duration,
    pub remove_timeout: Duration,
    pub lock_timeout: Duration,
    pub progress_disabled: bool,
}

impl DepfetchConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(RawConfig::load(None)?.into())
    }
}

impl From<RawConfig> for DepfetchConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            http_timeout: Duration::from_secs(
                raw.http.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            remove_timeout: Duration::from_secs(
                raw.remove.timeout.unwrap_or(DEFAULT_REMOVE_TIMEOUT_SECS),
            ),
            lock_timeout: Duration::from_secs(
                raw.lock.timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT_SECS),
            ),
            progress_disabled: raw.progress.disabled.unwrap_or(false),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    http: TimeoutConfig,
    #[serde(default)]
    remove: TimeoutConfig,
    #[serde(default)]
    lock: TimeoutConfig,
    #[serde(default)]
    progress: ProgressConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct TimeoutConfig {
    timeout: Option<u64>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ProgressConfig {
    disabled: Option<bool>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("DEPFETCH")
                    .separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_empty() {
        let env = HashMap::from([]);
        let config = RawConfig::load(Some(env)).unwrap();
        assert_eq!(config, RawConfig::default());
        assert_eq!(
            DepfetchConfig::from(config),
            DepfetchConfig {
                http_timeout: Duration::from_secs(300),
                remove_timeout: Duration::from_secs(10),
                lock_timeout: Duration::from_secs(300),
                progress_disabled: false,
            }
        );
    }

    #[test]
    fn load_environment() {
        let env = HashMap::from([
            ("DEPFETCH_HTTP_TIMEOUT".to_owned(), "30".to_owned()),
            ("DEPFETCH_REMOVE_TIMEOUT".to_owned(), "2".to_owned()),
            ("DEPFETCH_LOCK_TIMEOUT".to_owned(), "5".to_owned()),
            ("DEPFETCH_PROGRESS_DISABLED".to_owned(), "true".to_owned()),
        ]);
        let config = RawConfig::load(Some(env)).unwrap();
        assert_eq!(
            config,
            RawConfig {
                http: TimeoutConfig { timeout: Some(30) },
                remove: TimeoutConfig { timeout: Some(2) },
                lock: TimeoutConfig { timeout: Some(5) },
                progress: ProgressConfig {
                    disabled: Some(true)
                },
            }
        );
        assert_eq!(
            DepfetchConfig::from(config).remove_timeout,
            Duration::from_secs(2)
        );
    }
}
