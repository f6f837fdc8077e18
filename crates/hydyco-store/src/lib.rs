//! Hydyco Mapping Store
//!
//! Persists named JSON documents ("mapping files") under a hidden
//! `.hydyco` directory at the project root. The root is found by walking up
//! from the install location until a `node_modules` marker directory turns
//! up (see [`RootResolver`]).
//!
//! All file operations are blocking. Async callers should run them on a
//! blocking thread.

pub mod error;
pub mod root;
pub mod store;

pub use error::StoreError;
pub use root::{DEFAULT_MARKER, RootResolver};
pub use store::{DOCUMENT_EXTENSION, Listing, MappingStore, normalize};
