//! Local entity storage.
//!
//! The engine reads entity snapshots and writes back the fields it changes
//! (`reference_id`, `name`, `visibility`) through [`EntityStore`].

use crate::error::{SyncError, SyncResult};
use ckan_sync_protocol::{EntityId, EntityKind, LocalEntity};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage of local entity snapshots.
pub trait EntityStore: Send + Sync {
    /// Loads an entity.
    fn get(&self, id: EntityId) -> SyncResult<Option<LocalEntity>>;

    /// Inserts or replaces an entity.
    fn put(&self, entity: LocalEntity) -> SyncResult<()>;

    /// Removes an entity. Returns true if it existed.
    fn remove(&self, id: EntityId) -> SyncResult<bool>;

    /// Returns all entities of a kind, ordered by id.
    fn list(&self, kind: EntityKind) -> SyncResult<Vec<LocalEntity>>;

    /// Returns the next unused id.
    fn next_id(&self) -> SyncResult<EntityId>;

    /// Finds the first entity of a kind whose string field equals `value`.
    fn find_by_field(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> SyncResult<Option<LocalEntity>> {
        Ok(self
            .list(kind)?
            .into_iter()
            .find(|entity| entity.field_str(field) == Some(value)))
    }
}

fn next_free_id(entities: &BTreeMap<EntityId, LocalEntity>) -> EntityId {
    entities.keys().next_back().map_or(1, |id| id + 1)
}

fn of_kind(entities: &BTreeMap<EntityId, LocalEntity>, kind: EntityKind) -> Vec<LocalEntity> {
    entities
        .values()
        .filter(|entity| entity.kind == kind)
        .cloned()
        .collect()
}

/// An in-memory entity store.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: Mutex<BTreeMap<EntityId, LocalEntity>>,
}

impl MemoryEntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given entities.
    pub fn with_entities(entities: impl IntoIterator<Item = LocalEntity>) -> Self {
        Self {
            entities: Mutex::new(entities.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    /// Returns the number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.lock().is_empty()
    }
}

impl EntityStore for MemoryEntityStore {
    fn get(&self, id: EntityId) -> SyncResult<Option<LocalEntity>> {
        Ok(self.entities.lock().get(&id).cloned())
    }

    fn put(&self, entity: LocalEntity) -> SyncResult<()> {
        self.entities.lock().insert(entity.id, entity);
        Ok(())
    }

    fn remove(&self, id: EntityId) -> SyncResult<bool> {
        Ok(self.entities.lock().remove(&id).is_some())
    }

    fn list(&self, kind: EntityKind) -> SyncResult<Vec<LocalEntity>> {
        Ok(of_kind(&self.entities.lock(), kind))
    }

    fn next_id(&self) -> SyncResult<EntityId> {
        Ok(next_free_id(&self.entities.lock()))
    }
}

/// Entity store persisted as a JSON array of entities.
///
/// Every operation re-reads the file, so several processes can take turns
/// on the same file; concurrent writers follow last-write-wins.
#[derive(Debug)]
pub struct FileEntityStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileEntityStore {
    /// Opens a store at the given path. A missing file is an empty store.
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

    fn load(&self) -> SyncResult<BTreeMap<EntityId, LocalEntity>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(SyncError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        let entities: Vec<LocalEntity> = serde_json::from_slice(&bytes).map_err(|e| {
            SyncError::Store(format!("invalid entity file {}: {}", self.path.display(), e))
        })?;
        Ok(entities.into_iter().map(|e| (e.id, e)).collect())
    }

    fn save(&self, entities: &BTreeMap<EntityId, LocalEntity>) -> SyncResult<()> {
        let list: Vec<&LocalEntity> = entities.values().collect();
        write_atomically(&self.path, &serde_json::to_vec_pretty(&list)?)
    }
}

/// Returns the temporary sibling a file is staged in before the rename.
///
/// The full file name is kept, so `data.json` and `data.notices` never
/// share a temporary file.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes a file by staging it next to the target and renaming it over.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = staging_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl EntityStore for FileEntityStore {
    fn get(&self, id: EntityId) -> SyncResult<Option<LocalEntity>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(&id))
    }

    fn put(&self, entity: LocalEntity) -> SyncResult<()> {
        let _guard = self.lock.lock();
        let mut entities = self.load()?;
        entities.insert(entity.id, entity);
        self.save(&entities)
    }

    fn remove(&self, id: EntityId) -> SyncResult<bool> {
        let _guard = self.lock.lock();
        let mut entities = self.load()?;
        let existed = entities.remove(&id).is_some();
        if existed {
            self.save(&entities)?;
        }
        Ok(existed)
    }

    fn list(&self, kind: EntityKind) -> SyncResult<Vec<LocalEntity>> {
        let _guard = self.lock.lock();
        Ok(of_kind(&self.load()?, kind))
    }

    fn next_id(&self) -> SyncResult<EntityId> {
        let _guard = self.lock.lock();
        Ok(next_free_id(&self.load()?))
    }
}
