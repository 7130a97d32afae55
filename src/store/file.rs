//! Durable session store persisted as a JSON file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::SessionStore;

/// Session store that mirrors every mutation to a JSON file.
///
/// The file is rewritten through a temporary sibling and renamed into
/// place, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    /// An unreadable or corrupt file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Session file is corrupt, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read session file, starting empty");
                HashMap::new()
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Session file opened");

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, f: impl FnOnce(&mut HashMap<String, String>)) {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut map);
        // Written under the lock so file order matches memory order
        if let Err(e) = self.flush(&map) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist session file");
        }
    }

    fn flush(&self, map: &HashMap<String, String>) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        // A leftover temp file would keep its old permissions
        let _ = fs::remove_file(&tmp);

        let mut file = open_private(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Create (or truncate) `path` readable only by the owner. The file holds
/// bearer credentials.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|map| {
            map.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|map| {
            map.remove(key);
        });
    }

    fn set_batch(&self, entries: &[(&str, String)]) {
        self.mutate(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), value.clone());
            }
        });
    }

    fn remove_batch(&self, keys: &[&str]) {
        self.mutate(|map| {
            for key in keys {
                map.remove(*key);
            }
        });
    }
}
