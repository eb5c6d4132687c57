//! Storage Backend for Experiment Tracking
//!
//! Keys are `/`-separated paths relative to the backend root.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{CardioError, Result};

/// Storage backend trait
pub trait StorageBackend: Send + Sync {
    /// Replace the object at `key` with `bytes`
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read the object at `key`, `NotFound` if absent
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Append one line to the object at `key`, creating it if needed
    fn append_line(&self, key: &str, line: &str) -> Result<()>;

    fn exists(&self, key: &str) -> bool;

    /// Names of the immediate child directories of `prefix` (empty for root)
    fn list_dirs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if storage is available
    fn is_available(&self) -> bool;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Local file system storage backend
pub struct LocalStorage {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a local storage backend rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(CardioError::ValidationError(format!("invalid storage key '{}'", key)));
        }
        Ok(self.base_dir.join(relative))
    }
}

impl StorageBackend for LocalStorage {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| CardioError::ValidationError(format!("invalid storage key '{}'", key)))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| CardioError::ValidationError(format!("invalid storage key '{}'", key)))?
            .to_string_lossy()
            .into_owned();

        let _guard = self.write_lock.lock();
        fs::create_dir_all(parent)?;

        // readers never observe a partially written file
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CardioError::NotFound(format!("'{}' in {}", key, self.location())),
            _ => e.into(),
        })
    }

    fn append_line(&self, key: &str, line: &str) -> Result<()> {
        let path = self.resolve(key)?;

        let _guard = self.write_lock.lock();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.trim_end_matches('\n').as_bytes());
        buf.push(b'\n');
        file.write_all(&buf)?;

        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.resolve(key).map(|p| p.exists()).unwrap_or(false)
    }

    fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = if prefix.is_empty() {
            self.base_dir.clone()
        } else {
            self.resolve(prefix)?
        };

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }

    fn is_available(&self) -> bool {
        fs::create_dir_all(&self.base_dir).is_ok()
    }

    fn location(&self) -> String {
        self.base_dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        storage.write("1/meta.json", b"{\"a\":1}").unwrap();
        assert_eq!(storage.read("1/meta.json").unwrap(), b"{\"a\":1}");
        assert!(storage.exists("1/meta.json"));

        storage.write("1/meta.json", b"{}").unwrap();
        assert_eq!(storage.read("1/meta.json").unwrap(), b"{}");
    }

    #[test]
    fn test_no_tmp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        storage.write("x/y.json", b"1").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path().join("x"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["y.json"]);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        assert!(matches!(storage.read("nope.json"), Err(CardioError::NotFound(_))));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        assert!(storage.write("../evil.json", b"x").is_err());
        assert!(storage.write("/etc/evil.json", b"x").is_err());
        assert!(!storage.exists("../"));
    }

    #[test]
    fn test_append_and_list_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        storage.append_line("2/log.jsonl", "a").unwrap();
        storage.append_line("2/log.jsonl", "b\n").unwrap();
        assert_eq!(storage.read("2/log.jsonl").unwrap(), b"a\nb\n");

        storage.write("1/meta.json", b"{}").unwrap();
        assert_eq!(storage.list_dirs("").unwrap(), vec!["1", "2"]);
        assert!(storage.list_dirs("missing").unwrap().is_empty());
    }
}
