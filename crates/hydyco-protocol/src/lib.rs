//! Hydyco shared types.
//!
//! Server configuration, lifecycle error kinds, and the JSON error body
//! returned by built-in handlers. Every other hydyco crate depends on this
//! one; it depends on nothing but serde.

pub mod config;
pub mod error;

pub use config::{
    ADMIN_PREFIX, ADMIN_UI_PATH, AuthOptions, ConfigError, CorsOptions, ServerConfig,
};
pub use error::{ErrorBody, ErrorCode, LifecycleError, PreconditionError, Registration};
