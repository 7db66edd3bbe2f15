//! # CKAN Sync Engine
//!
//! Mirrors lifecycle events of locally managed entities (datasets,
//! organisations, groups) into a CKAN-style catalog.
//!
//! This crate provides:
//! - `SyncEngine`, one per entity kind, mapping saves, trashes, untrashes
//!   and permanent deletes onto catalog actions
//! - The JSON action API client and its HTTP abstraction
//! - Deferred notices for failures, readable after a redirect
//! - Local entity storage and per-kind payload builders
//! - Catalog lookups, the harvest client and dataset import
//!
//! ## Key Invariants
//!
//! - Local state is authoritative and never rolled back
//! - An entity is created remotely at most once; later saves update it
//! - Datasets are never purged remotely
//! - Every id of a batch is handled independently
//! - Remote failures become notices, never panics or aborted batches

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod engine;
mod error;
mod harvest;
mod http;
mod import;
mod notice;
mod payload;
mod store;
mod transport;

pub use catalog::{CatalogLookup, CatalogOption, TYPE_NOT_AVAILABLE};
pub use config::{SyncConfig, API_KEY_VAR, ENDPOINT_VAR};
pub use engine::{BatchOutcome, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use harvest::{
    has_unfinished_job, readable_datetime, HarvestClient, HarvestJob, HarvestSource,
    HarvestStatus, JobStatus,
};
pub use http::{ApiClient, HttpClient};
pub use import::{
    CustomField, DatasetImporter, ImportOutcome, ImportRecord, ImportResource, MASTER_ID_FIELD,
};
pub use notice::{FileNoticeBackend, MemoryNoticeBackend, NoticeBackend, NoticeStore};
pub use payload::{PayloadBuilder, StandardPayload};
pub use store::{EntityStore, FileEntityStore, MemoryEntityStore};
pub use transport::{ApiOutcome, CatalogTransport, MockReply, MockTransport};
