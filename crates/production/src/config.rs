//! Node configuration loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [agreement]
//! tick_interval_ms = 250
//! fast_path = true
//!
//! [committee]
//! retention_rounds = 5
//!
//! [dispatcher]
//! thread_name = "meridian-dispatcher"
//!
//! [vote_cache]
//! capacity = 1024
//!
//! [logging]
//! filter = "info,meridian=debug"
//! with_thread_ids = true
//! ```

use meridian_agreement::AgreementConfig;
use meridian_committee::DEFAULT_RETENTION_ROUNDS;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub agreement: AgreementSection,
    pub committee: CommitteeSection,
    pub dispatcher: DispatcherConfig,
    pub vote_cache: VoteCacheSection,
    pub logging: LoggingConfig,
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agreement.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "agreement.tick_interval_ms must be greater than 0".into(),
            ));
        }
        if self.vote_cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "vote_cache.capacity must be greater than 0".into(),
            ));
        }
        if self.dispatcher.thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "dispatcher.thread_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgreementSection {
    /// Interval between agreement ticks.
    pub tick_interval_ms: u64,
    /// Enter each position through the fast path.
    pub fast_path: bool,
}

impl AgreementSection {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn driver_config(&self) -> AgreementConfig {
        AgreementConfig {
            fast_path: self.fast_path,
        }
    }
}

impl Default for AgreementSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            fast_path: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitteeSection {
    /// Older rounds kept alongside the newest populated one.
    pub retention_rounds: u64,
}

impl Default for CommitteeSection {
    fn default() -> Self {
        Self {
            retention_rounds: DEFAULT_RETENTION_ROUNDS,
        }
    }
}

/// Dispatcher worker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    pub thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "meridian-dispatcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoteCacheSection {
    pub capacity: usize,
}

impl Default for VoteCacheSection {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Log output settings. `RUST_LOG` overrides `filter` when set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: String,
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,meridian=debug".to_string(),
            with_thread_ids: true,
        }
    }
}
