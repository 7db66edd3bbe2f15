//! Test fixtures wiring engines to a fake catalog.

use crate::fake::{FakeCatalog, TEST_API_KEY, TEST_ENDPOINT};
use ckan_sync_engine::{
    ApiClient, FileEntityStore, FileNoticeBackend, MemoryEntityStore, MemoryNoticeBackend,
    NoticeBackend, NoticeStore, SyncConfig, SyncEngine,
};
use ckan_sync_protocol::{EntityKind, EntityKindRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Transport used by the fixtures.
pub type FakeClient = ApiClient<FakeCatalog>;

/// Returns the configuration pointing at the fake catalog.
pub fn test_config() -> SyncConfig {
    SyncConfig::new(TEST_ENDPOINT, TEST_API_KEY)
}

/// A fake catalog, a client talking to it, a store and a notice backend.
pub struct TestHarness {
    /// Handle on the catalog for seeding and assertions.
    pub catalog: FakeCatalog,
    /// Shared API client.
    pub client: Arc<FakeClient>,
    /// Local entities.
    pub store: MemoryEntityStore,
    /// Notice backend shared by all engines of the harness.
    pub notices: Arc<dyn NoticeBackend>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with an empty catalog and store.
    pub fn new() -> Self {
        Self::with_catalog(FakeCatalog::new())
    }

    /// Creates a harness over an existing catalog.
    pub fn with_catalog(catalog: FakeCatalog) -> Self {
        let client = Arc::new(ApiClient::new(&test_config(), catalog.clone()));
        Self {
            catalog,
            client,
            store: MemoryEntityStore::new(),
            notices: Arc::new(MemoryNoticeBackend::new()),
        }
    }

    /// Creates an engine for a kind sharing the harness client and notices.
    pub fn engine(&self, kind: EntityKind) -> SyncEngine<FakeClient> {
        SyncEngine::<FakeClient>::new(
            kind,
            &EntityKindRegistry::standard(),
            self.client.clone(),
            NoticeStore::for_kind(self.notices.clone(), kind),
        )
        .expect("standard registry covers every kind")
    }
}

/// Temporary files for the file-backed stores.
pub struct TempFiles {
    dir: TempDir,
}

impl TempFiles {
    /// Creates a fresh temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of the entity file.
    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("entities.json")
    }

    /// Path of the notice file.
    pub fn notices_path(&self) -> PathBuf {
        self.dir.path().join("notices.json")
    }

    /// Opens the entity store.
    pub fn store(&self) -> FileEntityStore {
        FileEntityStore::open(self.store_path())
    }

    /// Opens the notice backend.
    pub fn notices(&self) -> Arc<dyn NoticeBackend> {
        Arc::new(FileNoticeBackend::open(self.notices_path()))
    }
}

impl Default for TempFiles {
    fn default() -> Self {
        Self::new()
    }
}
