use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::log::LogSink;
use crate::server::im_server::ImServer;
use crate::store::{FileStore, MemoryStore, PasswordHasher, Store, StoreError};
use crate::sink_info;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9999";
pub const DEFAULT_STORE_DIR: &str = "quickim-data";
pub const STORE_DIR_ENV: &str = "QUICKIM_STORE_DIR";

/// Resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// `None` keeps everything in memory.
    pub store_dir: Option<PathBuf>,
    pub pbkdf2_iterations: u32,
}

impl ServerSettings {
    /// `[Server]` keys, with `QUICKIM_STORE_DIR` taking precedence over
    /// `store_dir`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let store_dir = std::env::var(STORE_DIR_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                config
                    .get_or_default("Server", "store_dir", DEFAULT_STORE_DIR)
                    .to_string()
            });
        Ok(Self {
            bind_addr: config
                .get_or_default("Server", "bind_addr", DEFAULT_BIND_ADDR)
                .to_string(),
            store_dir: Some(PathBuf::from(store_dir)),
            pbkdf2_iterations: config
                .get_parsed("Server", "pbkdf2_iterations")?
                .unwrap_or(PasswordHasher::DEFAULT_ITERATIONS),
        })
    }

    pub fn open_store(&self, log: Arc<dyn LogSink>) -> Result<Arc<dyn Store>, StoreError> {
        let hasher = PasswordHasher::new(self.pbkdf2_iterations);
        Ok(match &self.store_dir {
            Some(dir) => {
                sink_info!(log, "using store directory {}", dir.display());
                Arc::new(FileStore::open_with(dir, hasher, log)?)
            }
            None => {
                sink_info!(log, "running with an in-memory store");
                Arc::new(MemoryStore::with_hasher(hasher))
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("listener: {0}")]
    Io(#[from] io::Error),
}

/// Open the store, bind, and serve until the listener fails.
pub fn run_server(settings: &ServerSettings, log: Arc<dyn LogSink>) -> Result<(), StartupError> {
    let store = settings.open_store(Arc::clone(&log))?;
    let server = ImServer::bind(settings.bind_addr.as_str(), store, log)?;
    server.run()?;
    Ok(())
}
