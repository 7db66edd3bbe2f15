//! CLI command implementations.

pub mod harvest;
pub mod import;
pub mod lifecycle;
pub mod notices;
pub mod options;

use crate::client::ReqwestClient;
use ckan_sync_engine::{
    ApiClient, FileEntityStore, FileNoticeBackend, NoticeBackend, NoticeStore, SyncConfig,
    SyncEngine,
};
use ckan_sync_protocol::{EntityKind, EntityKindRegistry};
use std::path::PathBuf;
use std::sync::Arc;

/// Transport used by the CLI.
pub type Client = ApiClient<ReqwestClient>;

/// Result type of the commands.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: catalog access and the local files.
pub struct Context {
    /// Catalog configuration.
    pub config: SyncConfig,
    /// Shared API client.
    pub client: Arc<Client>,
    /// Local entities.
    pub store: FileEntityStore,
    /// Notice backend.
    pub notices: Arc<dyn NoticeBackend>,
}

impl Context {
    /// Opens the local files and builds the API client.
    pub fn open(
        config: SyncConfig,
        store: PathBuf,
        notices: PathBuf,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let http = ReqwestClient::new(config.request_timeout)?;
        let client = Arc::new(ApiClient::new(&config, http));
        Ok(Self {
            config,
            client,
            store: FileEntityStore::open(store),
            notices: Arc::new(FileNoticeBackend::open(notices)),
        })
    }

    /// Returns the notice store of a kind.
    pub fn notice_store(&self, kind: EntityKind) -> NoticeStore {
        NoticeStore::for_kind(self.notices.clone(), kind)
    }

    /// Builds the engine of a kind.
    pub fn engine(&self, kind: EntityKind) -> Result<SyncEngine<Client>, Box<dyn std::error::Error>> {
        Ok(SyncEngine::<Client>::new(
            kind,
            &EntityKindRegistry::standard(),
            self.client.clone(),
            self.notice_store(kind),
        )?)
    }
}

/// Parses a `key=value` argument. Values that parse as JSON are kept as
/// JSON, anything else is a string.
pub fn parse_field(arg: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    if key.is_empty() {
        return Err(format!("empty field name in {arg:?}"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_arguments() {
        assert_eq!(parse_field("title=Air").unwrap(), ("title".into(), json!("Air")));
        assert_eq!(
            parse_field("groups=[\"health\"]").unwrap(),
            ("groups".into(), json!(["health"]))
        );
        assert_eq!(parse_field("note=").unwrap(), ("note".into(), json!("")));
        assert!(parse_field("title").is_err());
        assert!(parse_field("=x").is_err());
    }
}
