use std::io::Write;
use std::path::PathBuf;

use crate::core::errors::{Result, SealroomError};
use crate::core::traits::key_value::KeyValueStore;

/// Key-value store that keeps one file per slot in the data directory.
///
/// Slot `hidden-keys` lives in `{dir}/hidden-keys.json`, and so on. Writes
/// go to a temp file in the same directory and are renamed into place, so
/// a crash never leaves a half-written slot behind.
#[derive(Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn slot_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SealroomError::PersistenceUnavailable {
                detail: format!("invalid slot name '{name}'"),
            });
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    fn unavailable(&self, action: &str, e: std::io::Error) -> SealroomError {
        SealroomError::PersistenceUnavailable {
            detail: format!("cannot {action} in {}: {e}", self.dir.display()),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, name: &str) -> Result<Option<String>> {
        let path = self.slot_path(name)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.unavailable(&format!("read '{name}'"), e)),
        }
    }

    fn put(&self, name: &str, value: &str) -> Result<()> {
        let path = self.slot_path(name)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| self.unavailable("create directory", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| self.unavailable("create temp file", e))?;
        tmp.write_all(value.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.unavailable(&format!("write '{name}'"), e))?;
        tmp.persist(&path)
            .map_err(|e| self.unavailable(&format!("replace '{name}'"), e.error))?;

        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.slot_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.unavailable(&format!("remove '{name}'"), e)),
        }
    }
}
