//! Deferred user-facing error messages.
//!
//! Notices are written while lifecycle events are handled and read by the
//! next rendered page, usually after a redirect. The backend therefore has
//! to outlive the request that produced the notices.

use crate::error::{SyncError, SyncResult};
use crate::store::write_atomically;
use ckan_sync_protocol::EntityKind;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Storage for notice lists, keyed by namespace.
///
/// Both operations must be atomic with respect to each other.
pub trait NoticeBackend: Send + Sync {
    /// Appends messages to the namespace's list.
    fn append(&self, namespace: &str, messages: &[String]) -> SyncResult<()>;

    /// Returns the namespace's list and resets it to empty.
    fn take(&self, namespace: &str) -> SyncResult<Vec<String>>;
}

/// In-memory notice backend for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryNoticeBackend {
    lists: Mutex<BTreeMap<String, Vec<String>>>,
}

impl MemoryNoticeBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoticeBackend for MemoryNoticeBackend {
    fn append(&self, namespace: &str, messages: &[String]) -> SyncResult<()> {
        self.lists
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    fn take(&self, namespace: &str) -> SyncResult<Vec<String>> {
        Ok(self.lists.lock().remove(namespace).unwrap_or_default())
    }
}

/// Notice backend persisted as a JSON file (`{"namespace": ["message", ...]}`).
///
/// Writes go to a sibling temporary file that is renamed over the original.
#[derive(Debug)]
pub struct FileNoticeBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileNoticeBackend {
    /// Opens a backend at the given path. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SyncResult<BTreeMap<String, Vec<String>>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(SyncError::Io(e)),
        }
    }

    fn write_all(&self, lists: &BTreeMap<String, Vec<String>>) -> SyncResult<()> {
        write_atomically(&self.path, &serde_json::to_vec_pretty(lists)?)
    }
}

impl NoticeBackend for FileNoticeBackend {
    fn append(&self, namespace: &str, messages: &[String]) -> SyncResult<()> {
        let _guard = self.lock.lock();
        let mut lists = self.read_all()?;
        lists
            .entry(namespace.to_string())
            .or_default()
            .extend_from_slice(messages);
        self.write_all(&lists)
    }

    fn take(&self, namespace: &str) -> SyncResult<Vec<String>> {
        let _guard = self.lock.lock();
        let mut lists = self.read_all()?;
        match lists.remove(namespace) {
            Some(messages) => {
                self.write_all(&lists)?;
                Ok(messages)
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Notice buffer of one entity kind.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct NoticeStore {
    backend: Arc<dyn NoticeBackend>,
    namespace: String,
}

impl NoticeStore {
    /// Creates a store for an entity kind (namespace `{field_prefix}notices`).
    pub fn for_kind(backend: Arc<dyn NoticeBackend>, kind: EntityKind) -> Self {
        Self::with_namespace(backend, format!("{}notices", kind.field_prefix()))
    }

    /// Creates a store with an explicit namespace.
    pub fn with_namespace(backend: Arc<dyn NoticeBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// In-memory store, mostly for tests.
    pub fn in_memory(kind: EntityKind) -> Self {
        Self::for_kind(Arc::new(MemoryNoticeBackend::new()), kind)
    }

    /// Returns the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Appends messages, keeping order and duplicates.
    pub fn append(&self, messages: &[String]) -> SyncResult<()> {
        if messages.is_empty() {
            return Ok(());
        }
        debug!(namespace = %self.namespace, count = messages.len(), "storing notices");
        self.backend.append(&self.namespace, messages)
    }

    /// Returns all pending messages and clears them.
    pub fn drain_and_clear(&self) -> SyncResult<Vec<String>> {
        self.backend.take(&self.namespace)
    }
}

impl std::fmt::Debug for NoticeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
