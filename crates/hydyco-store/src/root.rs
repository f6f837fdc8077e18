//! Project root discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

/// Directory whose presence marks the project root.
pub const DEFAULT_MARKER: &str = "node_modules";

/// Result of searching for the project root, computed once per resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootResolver {
    start: PathBuf,
    marker: String,
    root: Option<PathBuf>,
}

impl RootResolver {
    /// Search upward from the directory holding the running executable.
    pub fn from_install_location() -> Result<Self, StoreError> {
        let exe = std::env::current_exe().map_err(|e| StoreError::io("locate executable", "", e))?;
        let start = exe.parent().map(Path::to_path_buf).unwrap_or(exe);
        Ok(Self::discover(start))
    }

    /// Search upward from `start` for the default marker.
    pub fn discover(start: impl Into<PathBuf>) -> Self {
        Self::discover_with_marker(start, DEFAULT_MARKER)
    }

    /// Search the proper ancestors of `start`, closest first, for one that
    /// has `marker` as a direct child directory. `start` itself and the
    /// filesystem root are never candidates.
    ///
    /// With nested markers the innermost one wins, not the outermost.
    pub fn discover_with_marker(start: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        let start = start.into();
        let marker = marker.into();

        let root = start
            .ancestors()
            .skip(1)
            .filter(|dir| dir.parent().is_some())
            .find(|dir| dir.join(&marker).is_dir())
            .map(Path::to_path_buf);

        match &root {
            Some(found) => debug!("Project root for {}: {}", start.display(), found.display()),
            None => debug!("No {marker} above {}", start.display()),
        }

        Self { start, marker, root }
    }

    /// A resolver pinned to a known root, skipping discovery.
    pub fn fixed(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            start: root.clone(),
            marker: DEFAULT_MARKER.into(),
            root: Some(root),
        }
    }

    /// The discovered root, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// The discovered root, or `RootNotFound`.
    pub fn require_root(&self) -> Result<&Path, StoreError> {
        self.root().ok_or_else(|| StoreError::RootNotFound {
            start: self.start.clone(),
            marker: self.marker.clone(),
        })
    }

    pub fn start(&self) -> &Path {
        &self.start
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}
