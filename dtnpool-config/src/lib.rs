//! # dtnpool configuration
//!
//! Layered configuration for the block pool, its worker threads and logging.
//!
//! Hierarchy (later layers win):
//! 1. Built-in defaults
//! 2. `config/dtnpool.yaml`
//! 3. `config/<DTNPOOL_ENV>.yaml` (defaults to `production`, which may be
//!    absent; an explicitly named overlay must exist)
//! 4. `DTNPOOL_*` environment variables, `__` separating nested keys
//!    (e.g. `DTNPOOL_POOL__BLOCK_COUNT=64k`)

#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod pool;
mod telemetry;
pub mod validation;

pub use error::ConfigError;
pub use pool::{PoolConfig, WorkerConfig};
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/dtnpool.yaml";
const ENV_PREFIX: &str = "DTNPOOL_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq, Eq)]
pub struct DtnPoolConfig {
    /// Block arena sizing and recycling.
    #[validate(nested)]
    #[serde(default)]
    pub pool: PoolConfig,

    /// Worker threads draining the active job list.
    #[validate(nested)]
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Logging output.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl DtnPoolConfig {
    /// Load configuration from the default files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(DtnPoolConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let (env, explicit) = match std::env::var("DTNPOOL_ENV") {
            Ok(env) => (env, true),
            Err(_) => ("production".to_owned(), false),
        };
        let env_file = PathBuf::from(format!("config/{}.yaml", env));
        if env_file.exists() {
            figment = figment.merge(Yaml::file(env_file));
        } else if explicit {
            return Err(ConfigError::MissingOverlay { env, path: env_file });
        }

        Self::finish(figment)
    }

    /// Load configuration from an explicit file, still honoring the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(DtnPoolConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}
