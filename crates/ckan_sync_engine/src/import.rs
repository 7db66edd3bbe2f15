//! Dataset import.
//!
//! An import record is checked against the catalog (every group and the
//! owner organisation must exist), merged into the local dataset with the
//! same `masterid` or into a new one, and then saved through the engine
//! like any other edit.

use crate::catalog::CatalogLookup;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::store::EntityStore;
use crate::transport::CatalogTransport;
use ckan_sync_protocol::{EntityId, EntityKind, LocalEntity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

/// Field holding the source system's dataset id.
pub const MASTER_ID_FIELD: &str = "masterid";

/// A resource (distribution) of an imported dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportResource {
    /// Download URL.
    pub url: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
}

/// A free-form key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomField {
    /// Key.
    pub key: String,
    /// Value.
    pub value: String,
}

/// A parsed dataset to import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRecord {
    /// Id in the source system; identifies the dataset across imports.
    pub masterid: String,
    /// Slug.
    pub name: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description_de: String,
    /// Owner organisation slug.
    pub owner_org: String,
    /// Group slugs.
    pub groups: Vec<String>,
    /// Resources.
    pub resources: Vec<ImportResource>,
    /// Extra key/value pairs.
    pub custom_fields: Vec<CustomField>,
    /// Maintainer name.
    pub maintainer: String,
    /// Maintainer e-mail.
    pub maintainer_email: String,
    /// Author name.
    pub author: String,
    /// Author e-mail.
    pub author_email: String,
    /// Version.
    pub version: String,
}

impl ImportRecord {
    /// Returns the dataset fields described by this record.
    pub fn fields(&self) -> Map<String, Value> {
        let resources: Vec<Value> = self
            .resources
            .iter()
            .map(|r| json!({ "url": r.url, "name": r.title, "description": r.description }))
            .collect();
        let extras: Vec<Value> = self
            .custom_fields
            .iter()
            .map(|f| json!({ "key": f.key, "value": f.value }))
            .collect();

        let mut fields = Map::new();
        fields.insert(MASTER_ID_FIELD.into(), json!(self.masterid));
        fields.insert("title".into(), json!(self.title));
        fields.insert("notes".into(), json!(self.description_de));
        fields.insert("organisation".into(), json!(self.owner_org));
        fields.insert("groups".into(), json!(self.groups));
        fields.insert("resources".into(), Value::Array(resources));
        fields.insert("extras".into(), Value::Array(extras));
        fields.insert("maintainer".into(), json!(self.maintainer));
        fields.insert("maintainer_email".into(), json!(self.maintainer_email));
        fields.insert("author".into(), json!(self.author));
        fields.insert("author_email".into(), json!(self.author_email));
        fields.insert("version".into(), json!(self.version));
        fields
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Local id of the imported dataset.
    pub id: EntityId,
    /// True if a new local dataset was created.
    pub created: bool,
    /// True if the catalog accepted the save.
    pub synced: bool,
}

/// Imports datasets into the local store and the catalog.
pub struct DatasetImporter<'a, T: CatalogTransport> {
    engine: &'a SyncEngine<T>,
    store: &'a dyn EntityStore,
    lookup: CatalogLookup<T>,
}

impl<'a, T: CatalogTransport> DatasetImporter<'a, T> {
    /// Creates an importer over a dataset engine.
    pub fn new(engine: &'a SyncEngine<T>, store: &'a dyn EntityStore) -> SyncResult<Self> {
        if engine.kind() != EntityKind::Dataset {
            return Err(SyncError::Configuration(format!(
                "import needs a dataset engine, got {}",
                engine.kind()
            )));
        }
        Ok(Self {
            engine,
            store,
            lookup: CatalogLookup::new(engine.transport().clone()),
        })
    }

    /// Imports a record.
    ///
    /// Fails with [`SyncError::Import`] before touching the store when a
    /// group or the organisation is missing. A rejected save is not an
    /// error: the dataset is stored and the catalog message becomes a
    /// notice, as for an edit.
    pub fn import(&self, record: &ImportRecord) -> SyncResult<ImportOutcome> {
        for group in &record.groups {
            if !self.lookup.group_exists(group)? {
                return Err(SyncError::Import(format!(
                    "Group {group} does not exist! Import aborted."
                )));
            }
        }
        if !self.lookup.organisation_exists(&record.owner_org)? {
            return Err(SyncError::Import(format!(
                "Organisation {} does not exist! Import aborted.",
                record.owner_org
            )));
        }

        let existing = if record.masterid.is_empty() {
            None
        } else {
            self.store
                .find_by_field(EntityKind::Dataset, MASTER_ID_FIELD, &record.masterid)?
        };
        let created = existing.is_none();
        let mut entity = match existing {
            Some(entity) => entity,
            None => LocalEntity::published(EntityKind::Dataset, self.store.next_id()?),
        };

        entity.fields.extend(record.fields());
        if !record.name.is_empty() {
            entity.name = Some(record.name.clone());
        }

        let synced = self.engine.on_saved(&mut entity, false);
        let id = entity.id;
        self.store.put(entity)?;

        info!(id, masterid = %record.masterid, created, synced, "dataset imported");
        Ok(ImportOutcome { id, created, synced })
    }
}
