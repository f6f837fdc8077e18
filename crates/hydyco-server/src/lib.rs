//! Hydyco Server — lifecycle controller and built-in handlers.
//!
//! The controller owns the registered database, plugins, middleware and
//! routes, composes them into one pipeline in a fixed order, and binds that
//! pipeline to a port exactly once.

pub mod builtin;
pub mod controller;
pub mod error;
pub mod middleware;
pub mod plugins;

pub use controller::LifecycleController;
pub use error::StartError;
pub use middleware::{Authenticated, JsonBody, is_authenticated};
pub use plugins::FilePlugin;
