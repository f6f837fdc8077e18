//! Server configuration.
//!
//! The JSON shape mirrors what deployments already write by hand:
//!
//! ```json
//! { "port": 3000, "logger": true, "auth": { "secretOrKey": "..." }, "cors": {} }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// URL prefix under which the database handler and all plugins are mounted.
pub const ADMIN_PREFIX: &str = "/admin";

/// Path served by the built-in admin UI handler.
pub const ADMIN_UI_PATH: &str = "/admin-ui";

/// CORS options, keyed by option name. The lifecycle controller never looks
/// inside; only the CORS handler interprets them.
pub type CorsOptions = Map<String, Value>;

/// Immutable server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Install the request logging handler
    pub logger: bool,
    /// Options handed to the auth handler
    pub auth: AuthOptions,
    /// Options handed to the CORS handler
    pub cors: CorsOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            logger: true,
            auth: AuthOptions::default(),
            cors: CorsOptions::new(),
        }
    }
}

impl ServerConfig {
    /// Load a config from a JSON file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_logger(mut self, logger: bool) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth.secret_or_key = secret.into();
        self
    }

    pub fn with_cors(mut self, cors: CorsOptions) -> Self {
        self.cors = cors;
        self
    }
}

/// Auth handler configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOptions {
    pub secret_or_key: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            secret_or_key: "yourKey".into(),
        }
    }
}

impl std::fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOptions")
            .field("secret_or_key", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
