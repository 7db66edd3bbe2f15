//! Harvest source management.
//!
//! Wraps the harvest extension's actions: start, abort and clear jobs, and
//! read sources, status and job history. The source list changes rarely and
//! is cached; status and jobs are always read fresh.

use crate::error::SyncResult;
use crate::transport::CatalogTransport;
use ckan_sync_protocol::Action;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A configured harvest source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarvestSource {
    /// Source id.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
}

/// Status of a harvest job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    /// Queued.
    New,
    /// Gathering or fetching.
    Running,
    /// Done.
    Finished,
    /// Aborted by a user.
    Aborted,
    /// Any other status reported by the extension.
    Other(String),
}

impl From<String> for JobStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "New" => JobStatus::New,
            "Running" => JobStatus::Running,
            "Finished" => JobStatus::Finished,
            "Aborted" => JobStatus::Aborted,
            _ => JobStatus::Other(status),
        }
    }
}

impl JobStatus {
    /// Returns true while the job has not finished.
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::New | JobStatus::Running)
    }

    /// Returns the status label.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::New => "New",
            JobStatus::Running => "Running",
            JobStatus::Finished => "Finished",
            JobStatus::Aborted => "Aborted",
            JobStatus::Other(status) => status,
        }
    }
}

/// A harvest job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarvestJob {
    /// Job id.
    pub id: String,
    /// Job status.
    pub status: JobStatus,
    /// Creation time (ISO 8601).
    #[serde(default)]
    pub created: Option<String>,
    /// Gather start time.
    #[serde(default)]
    pub gather_started: Option<String>,
    /// Gather end time.
    #[serde(default)]
    pub gather_finished: Option<String>,
}

/// Status of a harvest source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HarvestStatus {
    /// The most recent job, if any.
    #[serde(default)]
    pub last_job: Option<HarvestJob>,
    /// Number of datasets harvested from the source.
    #[serde(default)]
    pub total_datasets: Option<u64>,
}

/// Returns true if any job is still new or running.
pub fn has_unfinished_job(jobs: &[HarvestJob]) -> bool {
    jobs.iter().any(|job| job.status.is_running())
}

/// Formats an ISO 8601 timestamp as `dd.mm.yyyy HH:MM:SS`.
///
/// Empty or unparsable input yields `-`.
pub fn readable_datetime(datetime: Option<&str>) -> String {
    let Some(datetime) = datetime.filter(|d| !d.is_empty()) else {
        return "-".into();
    };
    let (date, time) = datetime.split_once(['T', ' ']).unwrap_or((datetime, "00:00:00"));
    let mut parts = date.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return "-".into();
    };
    let time = time.get(..8).unwrap_or(time);
    format!("{day}.{month}.{year} {time}")
}

/// Client for the harvest actions.
pub struct HarvestClient<T: CatalogTransport> {
    transport: Arc<T>,
    ttl: Duration,
    sources: Mutex<Option<(Instant, Vec<HarvestSource>)>>,
}

impl<T: CatalogTransport> HarvestClient<T> {
    /// Creates a client caching the source list for `ttl`.
    pub fn new(transport: Arc<T>, ttl: Duration) -> Self {
        Self {
            transport,
            ttl,
            sources: Mutex::new(None),
        }
    }

    /// Starts a new harvest job for a source.
    pub fn reharvest(&self, source_id: &str) -> SyncResult<()> {
        self.transport
            .call(&Action::HarvestJobCreate, &json!({ "source_id": source_id }))
            .into_result()?;
        info!(source_id, "harvest job created");
        Ok(())
    }

    /// Aborts the running job of a source.
    pub fn abort(&self, source_id: &str) -> SyncResult<()> {
        self.transport
            .call(&Action::HarvestJobAbort, &json!({ "source_id": source_id }))
            .into_result()?;
        info!(source_id, "harvest job aborted");
        Ok(())
    }

    /// Removes all datasets harvested from a source.
    pub fn clear(&self, source_id: &str) -> SyncResult<()> {
        self.transport
            .call(&Action::HarvestSourceClear, &json!({ "id": source_id }))
            .into_result()?;
        info!(source_id, "harvest source cleared");
        Ok(())
    }

    /// Returns the active sources, cached for the configured ttl.
    pub fn sources(&self) -> SyncResult<Vec<HarvestSource>> {
        if let Some((fetched, sources)) = self.sources.lock().as_ref() {
            if fetched.elapsed() < self.ttl {
                debug!("harvest sources served from cache");
                return Ok(sources.clone());
            }
        }

        let result = self
            .transport
            .call(&Action::HarvestSourceList, &json!({ "only_active": true }))
            .into_result()?;
        let sources: Vec<HarvestSource> = serde_json::from_value(result)?;
        *self.sources.lock() = Some((Instant::now(), sources.clone()));
        Ok(sources)
    }

    /// Drops the cached source list.
    pub fn invalidate_sources(&self) {
        *self.sources.lock() = None;
    }

    /// Returns the current status of a source.
    pub fn status(&self, source_id: &str) -> SyncResult<HarvestStatus> {
        let result = self
            .transport
            .call(&Action::HarvestSourceShowStatus, &json!({ "id": source_id }))
            .into_result()?;
        if result.is_null() {
            return Ok(HarvestStatus::default());
        }
        Ok(serde_json::from_value(result)?)
    }

    /// Returns all jobs of a source.
    pub fn jobs(&self, source_id: &str) -> SyncResult<Vec<HarvestJob>> {
        let result = self
            .transport
            .call(&Action::HarvestJobList, &json!({ "source_id": source_id }))
            .into_result()?;
        match result {
            Value::Null => Ok(Vec::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Returns the latest job only, as shown by default.
    pub fn latest_jobs(&self, source_id: &str) -> SyncResult<Vec<HarvestJob>> {
        Ok(self.status(source_id)?.last_job.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::transport::{MockReply, MockTransport};

    fn client(ttl: Duration) -> HarvestClient<MockTransport> {
        HarvestClient::new(Arc::new(MockTransport::new()), ttl)
    }

    #[test]
    fn job_actions_send_source() {
        let client = client(Duration::from_secs(60));
        client.transport.set_reply("harvest_job_create", MockReply::ok(json!({})));
        client.transport.set_reply("harvest_job_abort", MockReply::ok(json!({})));
        client.transport.set_reply("harvest_source_clear", MockReply::ok(json!({})));

        client.reharvest("src").unwrap();
        client.abort("src").unwrap();
        client.clear("src").unwrap();

        let calls = client.transport.calls();
        assert_eq!(calls[0], ("harvest_job_create".into(), json!({"source_id": "src"})));
        assert_eq!(calls[1], ("harvest_job_abort".into(), json!({"source_id": "src"})));
        assert_eq!(calls[2], ("harvest_source_clear".into(), json!({"id": "src"})));
    }

    #[test]
    fn reharvest_failure_carries_message() {
        let client = client(Duration::from_secs(60));
        client
            .transport
            .set_reply("harvest_job_create", MockReply::error("There already is an unrun job"));
        let err = client.reharvest("src").unwrap_err();
        assert!(matches!(err, SyncError::Application(ref m) if m[0] == "There already is an unrun job"));
    }

    #[test]
    fn sources_are_cached() {
        let client = client(Duration::from_secs(3600));
        client.transport.set_reply(
            "harvest_source_list",
            MockReply::ok(json!([{"id": "s1", "title": "Geo", "url": "http://x"}])),
        );

        let first = client.sources().unwrap();
        let second = client.sources().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].title, "Geo");
        assert_eq!(client.transport.call_count(), 1);
        assert_eq!(client.transport.calls()[0].1, json!({"only_active": true}));

        client.invalidate_sources();
        client.sources().unwrap();
        assert_eq!(client.transport.call_count(), 2);
    }

    #[test]
    fn expired_cache_refetches() {
        let client = client(Duration::ZERO);
        client
            .transport
            .set_reply("harvest_source_list", MockReply::ok(json!([])));
        client.sources().unwrap();
        client.sources().unwrap();
        assert_eq!(client.transport.call_count(), 2);
    }

    #[test]
    fn status_and_jobs() {
        let client = client(Duration::from_secs(60));
        client.transport.set_reply(
            "harvest_source_show_status",
            MockReply::ok(json!({"last_job": {"id": "j2", "status": "Running"}, "total_datasets": 4})),
        );
        client.transport.set_reply(
            "harvest_job_list",
            MockReply::ok(json!([
                {"id": "j2", "status": "Running", "created": "2016-01-18T09:30:05.123"},
                {"id": "j1", "status": "Finished"}
            ])),
        );

        let latest = client.latest_jobs("src").unwrap();
        assert_eq!(latest.len(), 1);
        assert!(has_unfinished_job(&latest));

        let jobs = client.jobs("src").unwrap();
        assert_eq!(jobs[1].status, JobStatus::Finished);
        assert!(has_unfinished_job(&jobs));
        assert!(!has_unfinished_job(&jobs[1..]));
        assert_eq!(client.status("src").unwrap().total_datasets, Some(4));
    }

    #[test]
    fn unknown_status_is_kept() {
        let status: JobStatus = "Errored".to_string().into();
        assert_eq!(status, JobStatus::Other("Errored".into()));
        assert_eq!(status.as_str(), "Errored");
        assert!(!status.is_running());
    }

    #[test]
    fn datetime_formatting() {
        assert_eq!(
            readable_datetime(Some("2016-01-18T09:30:05.123456")),
            "18.01.2016 09:30:05"
        );
        assert_eq!(readable_datetime(Some("2016-01-18")), "18.01.2016 00:00:00");
        assert_eq!(readable_datetime(Some("")), "-");
        assert_eq!(readable_datetime(None), "-");
        assert_eq!(readable_datetime(Some("garbage")), "-");
    }
}
