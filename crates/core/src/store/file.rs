//! File-backed key-value store.
//!
//! Each key is stored as `<root>/<key>.json`. Writes go to a temporary sibling file first and
//! are renamed into place, so a failed write never truncates the previous value.
//!
//! Per-patient keys embed caller-supplied patient ids, so keys are escaped before they become file
//! names: ASCII alphanumerics, `-` and `_` pass through and every other byte is written as `%`
//! followed by two hex digits. The escaping is reversible, never yields a name starting with a
//! dot and never yields a path separator, so any key maps to exactly one file inside the root.

use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Longest escaped key, leaving room for the `.json` extension and temp-file decoration within
/// common 255-byte file name limits.
const MAX_ENCODED_KEY_LEN: usize = 200;

/// Key-value store persisting one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created, or
    /// `StoreError::InvalidInput` if `root` exists but is not a directory.
    pub fn open(root: &Path) -> StoreResult<Self> {
        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidInput(format!(
                "store root is not a directory: {}",
                root.display()
            )));
        }
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let encoded = encode_key(key)?;
        Ok(self.root.join(format!("{encoded}.json")))
    }
}

/// Escapes `key` into a file name stem.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the key is empty or its escaped form is longer than
/// the file name budget.
pub(crate) fn encode_key(key: &str) -> StoreResult<String> {
    if key.is_empty() {
        return Err(StoreError::InvalidInput(
            "storage key cannot be empty".into(),
        ));
    }

    let mut encoded = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            encoded.push(b as char);
        } else {
            encoded.push('%');
            encoded.push_str(&hex::encode([b]));
        }
    }

    if encoded.len() > MAX_ENCODED_KEY_LEN {
        return Err(StoreError::InvalidInput(format!(
            "storage key is too long for the file store ({} bytes escaped, limit {}): '{}'",
            encoded.len(),
            MAX_ENCODED_KEY_LEN,
            key
        )));
    }
    Ok(encoded)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let encoded = encode_key(key)?;
        let path = self.root.join(format!("{encoded}.json"));
        let tmp_path = self.root.join(format!(".{encoded}.json.tmp"));

        if let Err(e) = fs::write(&tmp_path, value) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::Io(e));
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(e)
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn check_key(&self, key: &str) -> StoreResult<()> {
        encode_key(key).map(|_| ())
    }
}
