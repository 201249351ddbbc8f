//! Client-local key/value persistence.
//!
//! Each key holds one JSON document. [`MemoryStorage`] keeps everything in
//! process; [`FileStorage`] writes `<dir>/<key>.json` files atomically via a
//! temp-rename so a crash mid-write never leaves a torn document behind.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

pub const USER_KEY: &str = "escrowUser";
pub const PRODUCTS_KEY: &str = "escrowProducts";
pub const TRANSACTIONS_KEY: &str = "escrowTransactions";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// In-process storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_owned();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Reads and decodes the document stored under `key`.
///
/// Returns `Ok(None)` when the key is absent or holds JSON that does not
/// decode as `T`; the latter is logged and treated like a missing entry.
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unreadable stored value");
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)?;
    Ok(())
}

/// Storage doubles for exercising write failures.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Memory storage that rejects writes to the keys it is told to fail.
    #[derive(Clone, Default)]
    pub(crate) struct FlakyStorage {
        pub(crate) inner: MemoryStorage,
        failing: Arc<Mutex<Vec<String>>>,
    }

    impl FlakyStorage {
        pub(crate) fn fail_writes_to(&self, keys: &[&str]) {
            *self.failing.lock() = keys.iter().map(|k| k.to_string()).collect();
        }

        pub(crate) fn fail_all_writes(&self) {
            self.fail_writes_to(&[USER_KEY, PRODUCTS_KEY, TRANSACTIONS_KEY]);
        }

        pub(crate) fn heal(&self) {
            self.failing.lock().clear();
        }

        fn check(&self, key: &str) -> io::Result<()> {
            if self.failing.lock().iter().any(|k| k == key) {
                return Err(io::Error::other("disk full"));
            }
            Ok(())
        }
    }

    impl Storage for FlakyStorage {
        fn get(&self, key: &str) -> io::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> io::Result<()> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> io::Result<()> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }
}
