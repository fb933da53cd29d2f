//! Server configuration.
//!
//! Settings come from an optional `config/goodshelf.toml` file, overridden
//! by `GOODSHELF_`-prefixed environment variables
//! (`GOODSHELF_SERVER__PORT=8080`, `GOODSHELF_STORAGE__BACKEND=postgres`).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which store backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// Connection string for the postgres backend, ignored otherwise.
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            database_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session cookie stays valid without a new login.
    pub ttl_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_minutes: 60 * 24 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn load() -> eyre::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/goodshelf").required(false))
            .add_source(config::Environment::with_prefix("GOODSHELF").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
