//! Compiled-template storage.
//!
//! A [`Storage`] backend answers three questions for a [`FileId`]: is the
//! cached entry fresh, what is its content, and store this content. An entry
//! is fresh when the [`SourceSignal`] recorded at write time still matches
//! the source file.
//!
//! Two backends are provided: [`FileStorage`] persists entries as JSON files
//! under a cache directory, and [`InMemoryStorage`] keeps them in a map.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use haml_rs_core::error::{HamlError, HamlResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The identity of a template source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    /// The cache key: the absolute path with the leading separator removed
    /// and every `/`, `\` and `:` replaced by `_`.
    pub key: String,
    /// The absolute source path.
    pub source: PathBuf,
}

impl FileId {
    /// Derives the identity of a source path. Relative paths are resolved
    /// against the current directory, and `.` and `..` components are
    /// removed, so every spelling of one file yields one key.
    ///
    /// # Examples
    ///
    /// ```
    /// use haml_rs_template::storage::FileId;
    ///
    /// let id = FileId::from_path("/srv/app/views/index.haml").unwrap();
    /// assert_eq!(id.key, "srv_app_views_index.haml");
    /// assert_eq!(FileId::from_path("/srv/app/./views/../views/index.haml").unwrap(), id);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> HamlResult<Self> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let source = normalize(&absolute);
        Ok(Self {
            key: cache_key(&source),
            source,
        })
    }
}

/// Removes `.` components and folds `..` into its parent, without touching
/// the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn cache_key(path: &Path) -> String {
    let text = path.to_string_lossy();
    text.trim_start_matches(|c| c == '/' || c == '\\')
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

/// The freshness signal of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSignal {
    /// Last modification time, in milliseconds since the Unix epoch.
    pub modified_ms: u64,
    /// SHA-256 of the file contents, hex encoded.
    pub digest: String,
}

impl SourceSignal {
    /// Reads the current signal of a source file.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        Self::snapshot(path).map(|(signal, _)| signal)
    }

    /// Reads a source file once, returning its signal together with the
    /// bytes the digest was computed from.
    ///
    /// The modification time is taken before the contents are read, so an
    /// edit racing the read yields a signal that matches neither version.
    pub fn snapshot(path: &Path) -> std::io::Result<(Self, Vec<u8>)> {
        let modified = std::fs::metadata(path)?.modified()?;
        let bytes = std::fs::read(path)?;
        Ok((Self::from_parts(modified, &bytes), bytes))
    }

    fn from_parts(modified: SystemTime, bytes: &[u8]) -> Self {
        let modified_ms = modified
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self {
            modified_ms,
            digest: format!("{:x}", Sha256::digest(bytes)),
        }
    }

    /// Returns `true` if `path` currently has this signal. A missing or
    /// unreadable source never matches.
    pub fn matches(&self, path: &Path) -> bool {
        Self::read(path).is_ok_and(|current| current == *self)
    }
}

/// A stored compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The source path the entry was compiled from.
    pub source: PathBuf,
    /// The source signal at write time.
    pub signal: SourceSignal,
    /// The compiled, evaluated content.
    pub content: String,
}

impl CacheEntry {
    /// Builds an entry for `id` recording `signal`.
    pub fn new(id: &FileId, signal: SourceSignal, content: &str) -> Self {
        Self {
            source: id.source.clone(),
            signal,
            content: content.to_string(),
        }
    }
}

/// A compiled-template storage backend.
pub trait Storage: Send + Sync {
    /// Returns `true` if an entry exists for `id` and matches its source.
    fn is_fresh(&self, id: &FileId) -> bool;

    /// Returns the stored content for `id`.
    ///
    /// # Errors
    ///
    /// Returns `CacheEntryNotFound` if there is no entry.
    fn fetch(&self, id: &FileId) -> HamlResult<String>;

    /// Stores `content` for `id` under `signal`, replacing any previous
    /// entry. `signal` must describe the source the content was compiled
    /// from.
    ///
    /// # Errors
    ///
    /// Returns `StorageWriteError` if the entry cannot be written.
    fn cache_with_signal(&self, id: &FileId, signal: SourceSignal, content: &str)
        -> HamlResult<()>;

    /// Stores `content` for `id` under the source's current signal.
    ///
    /// # Errors
    ///
    /// Returns `StorageWriteError` if the source cannot be read or the entry
    /// cannot be written.
    fn cache(&self, id: &FileId, content: &str) -> HamlResult<()> {
        let signal = SourceSignal::read(&id.source).map_err(|source| {
            HamlError::StorageWriteError {
                id: id.key.clone(),
                source,
            }
        })?;
        self.cache_with_signal(id, signal, content)
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn is_fresh(&self, id: &FileId) -> bool {
        (**self).is_fresh(id)
    }

    fn fetch(&self, id: &FileId) -> HamlResult<String> {
        (**self).fetch(id)
    }

    fn cache_with_signal(
        &self,
        id: &FileId,
        signal: SourceSignal,
        content: &str,
    ) -> HamlResult<()> {
        (**self).cache_with_signal(id, signal, content)
    }
}

/// Stores entries as JSON files under a root directory.
///
/// The entry for a source lives at `root/ab/cd/<key><extension>`, where
/// `abcd...` is the SHA-256 of the absolute source path. Writes go to a
/// temporary file in the target directory which is then renamed over the
/// entry, so readers never see a partial entry.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    extension: String,
}

impl FileStorage {
    /// Creates a file storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the entry file for `id`.
    pub fn entry_path(&self, id: &FileId) -> PathBuf {
        let hash = format!(
            "{:x}",
            Sha256::digest(id.source.to_string_lossy().as_bytes())
        );
        self.root
            .join(&hash[..2])
            .join(&hash[2..4])
            .join(format!("{}{}", id.key, self.extension))
    }

    fn read_entry(&self, id: &FileId) -> HamlResult<CacheEntry> {
        let path = self.entry_path(id);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HamlError::CacheEntryNotFound(id.key.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&data).map_err(|e| {
            HamlError::SerializationError(format!(
                "Corrupt cache entry '{}': {e}",
                path.display()
            ))
        })
    }
}

impl Storage for FileStorage {
    fn is_fresh(&self, id: &FileId) -> bool {
        self.read_entry(id)
            .is_ok_and(|entry| entry.signal.matches(&id.source))
    }

    fn fetch(&self, id: &FileId) -> HamlResult<String> {
        self.read_entry(id).map(|entry| entry.content)
    }

    fn cache_with_signal(
        &self,
        id: &FileId,
        signal: SourceSignal,
        content: &str,
    ) -> HamlResult<()> {
        let write_error = |source: std::io::Error| HamlError::StorageWriteError {
            id: id.key.clone(),
            source,
        };

        let entry = CacheEntry::new(id, signal, content);
        let json = serde_json::to_vec(&entry)
            .map_err(|e| HamlError::SerializationError(e.to_string()))?;

        let path = self.entry_path(id);
        let dir = path
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        std::fs::create_dir_all(&dir).map_err(write_error)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
        tmp.write_all(&json).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(&path).map_err(|e| write_error(e.error))?;

        tracing::debug!(key = %id.key, path = %path.display(), "wrote cache entry");
        Ok(())
    }
}

/// Keeps entries in memory.
///
/// # Examples
///
/// ```no_run
/// use haml_rs_template::storage::{FileId, InMemoryStorage, Storage};
///
/// let storage = InMemoryStorage::new();
/// let id = FileId::from_path("views/index.haml").unwrap();
/// storage.cache(&id, "<p>Hi</p>").unwrap();
/// assert!(storage.is_fresh(&id));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Storage for InMemoryStorage {
    fn is_fresh(&self, id: &FileId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.key)
            .is_some_and(|entry| entry.signal.matches(&id.source))
    }

    fn fetch(&self, id: &FileId) -> HamlResult<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.key)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| HamlError::CacheEntryNotFound(id.key.clone()))
    }

    fn cache_with_signal(
        &self,
        id: &FileId,
        signal: SourceSignal,
        content: &str,
    ) -> HamlResult<()> {
        let entry = CacheEntry::new(id, signal, content);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.key.clone(), entry);
        tracing::debug!(key = %id.key, "stored cache entry in memory");
        Ok(())
    }
}
