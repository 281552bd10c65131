use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_RESOURCE_DIR: &str = "facescanner";
const CONFIG_FILE: &str = "configure.txt";
const MODEL_FILE: &str = "model/resnetsmall_5DB_2loss_140000_kaiya3.dat";
const DATABASE_FILE: &str = "visitor.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {what} payload from {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine configuration payload.
    pub config_path: PathBuf,
    /// Engine model payload.
    pub model_path: PathBuf,
    /// Initial face database payload.
    pub database_path: PathBuf,
    /// Directory for per-operation exchange files and the live database copy.
    pub exchange_dir: PathBuf,
}

impl Config {
    /// Load configuration from `FACESCAN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: PathBuf| var(key).map(PathBuf::from).unwrap_or(default);
        let resource_dir = path("FACESCAN_RESOURCE_DIR", PathBuf::from(DEFAULT_RESOURCE_DIR));

        Self {
            config_path: path("FACESCAN_CONFIG_PATH", resource_dir.join(CONFIG_FILE)),
            model_path: path("FACESCAN_MODEL_PATH", resource_dir.join(MODEL_FILE)),
            database_path: path("FACESCAN_DB_PATH", resource_dir.join(DATABASE_FILE)),
            exchange_dir: path("FACESCAN_EXCHANGE_DIR", std::env::temp_dir()),
        }
    }
}

/// The three opaque blobs the engine is initialized from.
#[derive(Clone, Default)]
pub struct EnginePayloads {
    pub config: Vec<u8>,
    pub model: Vec<u8>,
    pub database: Vec<u8>,
}

impl EnginePayloads {
    /// Read all payloads from the paths in `config`.
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        let payloads = Self {
            config: read_payload("config", &config.config_path)?,
            model: read_payload("model", &config.model_path)?,
            database: read_payload("database", &config.database_path)?,
        };
        tracing::info!(
            config_bytes = payloads.config.len(),
            model_bytes = payloads.model.len(),
            database_bytes = payloads.database.len(),
            "engine payloads loaded"
        );
        Ok(payloads)
    }
}

impl std::fmt::Debug for EnginePayloads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePayloads")
            .field("config", &self.config.len())
            .field("model", &self.model.len())
            .field("database", &self.database.len())
            .finish()
    }
}

fn read_payload(what: &'static str, path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })
}
