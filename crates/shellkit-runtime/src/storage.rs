#![forbid(unsafe_code)]

//! Persistent preference storage.
//!
//! The panel controller remembers one boolean across reloads. Where that
//! boolean lives is a host concern: `localStorage` in the browser, a JSON
//! file for native hosts, a map in tests. [`PreferenceStore`] is the seam.
//!
//! # Failure Modes
//!
//! Every call may fail: private-browsing modes refuse access, quotas are
//! exceeded, files are unreadable. Errors are returned, never panicked, and
//! callers are expected to degrade (the panel controller switches to an
//! in-memory-only mode for the rest of the session).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Preference storage failure.
#[derive(Debug)]
pub enum StorageError {
    /// The backend refuses access entirely (e.g. private browsing).
    Unavailable(String),
    /// The write did not fit in the backend's quota.
    QuotaExceeded {
        /// Key being written.
        key: String,
    },
    /// I/O failure in a file-backed store.
    Io(std::io::Error),
    /// Stored data could not be decoded.
    Corrupt(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::QuotaExceeded { key } => write!(f, "storage quota exceeded writing {key:?}"),
            Self::Io(e) => write!(f, "storage I/O error: {e}"),
            Self::Corrupt(detail) => write!(f, "storage data corrupt: {detail}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// String key/value preference store.
pub trait PreferenceStore {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process preference store.
///
/// Clones share the same map, so a test can keep a handle, "reload" by
/// building a new controller on a clone, and inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    writes: Rc<RefCell<Vec<(String, String)>>>,
    reject_writes: Rc<Cell<bool>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Every successful write, in call order.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.borrow().clone()
    }

    /// Peek at a value without going through the trait.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Make subsequent writes fail with [`StorageError::QuotaExceeded`].
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }
}

impl PreferenceStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.get() {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
            });
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// A store that refuses every call, like `localStorage` in a locked-down
/// private window. Counts attempts so tests can assert a caller gave up.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStorage {
    attempts: Rc<Cell<u32>>,
}

impl UnavailableStorage {
    /// Create the store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get`/`set` calls made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }
}

impl PreferenceStore for UnavailableStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(StorageError::Unavailable("storage access denied".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(StorageError::Unavailable("storage access denied".into()))
    }
}

#[cfg(feature = "state-persistence")]
pub use file::JsonFileStorage;

#[cfg(feature = "state-persistence")]
mod file {
    //! JSON file preference store for native hosts.
    //!
    //! ```json
    //! { "version": 1, "entries": { "shellkit.right-panel.collapsed": "true" } }
    //! ```
    //!
    //! Writes use a temp-file-then-rename pattern to prevent corruption on
    //! crash. A missing file reads as empty.

    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use super::{PreferenceStore, StorageError};

    const FORMAT_VERSION: u64 = 1;

    #[derive(Debug, Serialize, Deserialize)]
    struct PreferenceFile {
        version: u64,
        entries: BTreeMap<String, String>,
    }

    /// File-backed preference store.
    #[derive(Debug)]
    pub struct JsonFileStorage {
        path: PathBuf,
        entries: RefCell<BTreeMap<String, String>>,
    }

    impl JsonFileStorage {
        /// Open (or lazily create) the store at `path`.
        ///
        /// - **Missing file**: starts empty.
        /// - **Corrupted file / version mismatch**: `StorageError::Corrupt`.
        pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
            let path = path.as_ref().to_path_buf();
            let entries = if path.exists() {
                let contents = std::fs::read_to_string(&path)?;
                let file: PreferenceFile = serde_json::from_str(&contents)
                    .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;
                if file.version != FORMAT_VERSION {
                    return Err(StorageError::Corrupt(format!(
                        "unsupported preference file version: {} (expected {FORMAT_VERSION})",
                        file.version
                    )));
                }
                file.entries
            } else {
                BTreeMap::new()
            };
            Ok(Self {
                path,
                entries: RefCell::new(entries),
            })
        }

        /// Location of the backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
            let file = PreferenceFile {
                version: FORMAT_VERSION,
                entries: entries.clone(),
            };
            let json = serde_json::to_string_pretty(&file)
                .map_err(|e| StorageError::Corrupt(format!("failed to serialize: {e}")))?;
            let temp = self.path.with_extension("json.tmp");
            std::fs::write(&temp, json)?;
            std::fs::rename(&temp, &self.path)?;
            Ok(())
        }
    }

    impl PreferenceStore for JsonFileStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let mut next = self.entries.borrow().clone();
            next.insert(key.to_string(), value.to_string());
            self.persist(&next)?;
            *self.entries.borrow_mut() = next;
            Ok(())
        }
    }

}
