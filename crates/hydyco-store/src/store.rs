//! Mapping file store — CRUD over JSON documents identified by name.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::root::RootResolver;

/// Marker a filename must contain to be listed as a document.
pub const DOCUMENT_EXTENSION: &str = ".json";

const BASE_DIR: &str = ".hydyco";
const MAPPINGS_ALIAS_DIR: &str = "mappings";
const MODELS_DIR: &str = "models";

/// Canonical document name: everything before the first `.`, lowercased.
///
/// `"User.json"`, `"user.backup.txt"` and `"USER"` all become `"user"`.
pub fn normalize(name: &str) -> String {
    name.split('.').next().unwrap_or_default().to_lowercase()
}

/// Output of [`MappingStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Names(Vec<String>),
    Documents(Vec<Value>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Self::Names(names) => names.len(),
            Self::Documents(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The listing as one JSON array.
    pub fn into_value(self) -> Value {
        match self {
            Self::Names(names) => Value::from(names),
            Self::Documents(docs) => Value::Array(docs),
        }
    }
}

/// File-backed store of JSON mapping documents.
///
/// Layout under the project root:
///
/// ```text
/// <root>/.hydyco/              documents live here as <name>.json
/// <root>/.hydyco/mappings/
/// <root>/.hydyco/models/       reserved for plugins
/// ```
#[derive(Debug, Clone)]
pub struct MappingStore {
    root: PathBuf,
}

impl MappingStore {
    /// Open the store at the resolver's root and make sure its directory
    /// tree exists. Fails with `RootNotFound` when discovery found nothing.
    pub fn open(resolver: &RootResolver) -> Result<Self, StoreError> {
        let store = Self {
            root: resolver.require_root()?.to_path_buf(),
        };
        store.ensure_layout()?;
        Ok(store)
    }

    /// Open the store at the root discovered from the install location.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&RootResolver::from_install_location()?)
    }

    /// Create the store directories if absent. Safe to call repeatedly.
    pub fn ensure_layout(&self) -> Result<(), StoreError> {
        for dir in [self.mappings_dir(), self.alias_dir(), self.models_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StoreError::io("create directory", &dir, e))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the document files.
    pub fn mappings_dir(&self) -> PathBuf {
        self.root.join(BASE_DIR)
    }

    /// `.hydyco/mappings`, kept for plugins that look documents up there.
    pub fn alias_dir(&self) -> PathBuf {
        self.root.join(BASE_DIR).join(MAPPINGS_ALIAS_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(BASE_DIR).join(MODELS_DIR)
    }

    /// On-disk path of the document `name` refers to.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let normalized = normalize(name);
        if normalized.is_empty() || normalized.contains(['/', '\\']) {
            return Err(StoreError::InvalidName { name: name.into() });
        }
        Ok(self.mappings_dir().join(format!("{normalized}{DOCUMENT_EXTENSION}")))
    }

    /// Read a document. Missing and unparsable files are both `NotFound`.
    pub fn read(&self, name: &str) -> Result<Value, StoreError> {
        self.read_as(name)
    }

    /// Read a document into a typed value.
    pub fn read_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.path_for(name)?;
        let not_found = || StoreError::NotFound {
            name: normalize(name),
        };

        let raw = fs::read(&path).map_err(|_| not_found())?;
        serde_json::from_slice(&raw).map_err(|_| not_found())
    }

    /// Create or overwrite a document.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let raw = serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
            name: normalize(name),
            source,
        })?;

        fs::write(&path, raw).map_err(|e| StoreError::io("write", &path, e))?;
        debug!("Wrote mapping {}", path.display());
        Ok(())
    }

    /// Remove a document.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted mapping {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                name: normalize(name),
            }),
            Err(e) => Err(StoreError::io("delete", &path, e)),
        }
    }

    /// Whether a document exists on disk.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Every document in the mappings directory, as names or parsed values.
    /// Order follows directory enumeration and is not stable.
    pub fn list(&self, names_only: bool) -> Result<Listing, StoreError> {
        if names_only {
            self.list_names().map(Listing::Names)
        } else {
            self.list_documents().map(Listing::Documents)
        }
    }

    pub fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.document_files()?.iter().map(|file| normalize(file)).collect())
    }

    pub fn list_documents(&self) -> Result<Vec<Value>, StoreError> {
        self.document_files()?
            .iter()
            .map(|file| self.read(file))
            .collect()
    }

    fn document_files(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.mappings_dir();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io("read directory", &dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("read directory", &dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_file && name.contains(DOCUMENT_EXTENSION) {
                files.push(name);
            }
        }
        Ok(files)
    }
}
