//! Integration tests for the sync engine against the fake catalog.

use ckan_sync_engine::{
    has_unfinished_job, ApiClient, CatalogLookup, DatasetImporter, EntityStore, HarvestClient,
    ImportRecord, JobStatus, NoticeStore, SyncEngine, SyncError,
};
use ckan_sync_protocol::{
    LifecycleEvent, LifecycleKind, LocalEntity, VisibilityState, SEND_FAILURE_MESSAGE,
};
use ckan_sync_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn put(harness: &TestHarness, entity: LocalEntity) {
    harness.store.put(entity).unwrap();
}

fn get(harness: &TestHarness, id: u64) -> LocalEntity {
    harness.store.get(id).unwrap().unwrap()
}

#[test]
fn create_then_update_reuses_reference() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Group);
    put(&harness, LocalEntity::published(EntityKind::Group, 1).with_field("title", "Public Health"));

    let outcome = engine.handle(&LifecycleEvent::saved(1), &harness.store);
    assert!(outcome.all_succeeded());
    let entity = get(&harness, 1);
    let reference = entity.reference_id().unwrap().to_string();
    assert_eq!(entity.name.as_deref(), Some("public-health"));

    let mut changed = entity.clone();
    changed.fields.insert("title".into(), json!("Health"));
    put(&harness, changed);
    engine.handle(&LifecycleEvent::saved(1), &harness.store);

    assert_eq!(harness.catalog.count("group_create"), 1);
    assert_eq!(harness.catalog.count("group_update"), 1);
    assert_eq!(get(&harness, 1).reference_id(), Some(reference.as_str()));
    assert_eq!(harness.catalog.records("group").len(), 1);
    assert_eq!(harness.catalog.record("group", &reference).unwrap()["title"], "Health");
}

#[test]
fn bulk_trash_with_one_failure() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Organisation);
    let first = harness.catalog.insert("organization", json!({"name": "bund"}));
    let third = harness.catalog.insert("organization", json!({"name": "bafu"}));
    put(&harness, LocalEntity::published(EntityKind::Organisation, 1).with_reference(first.clone()));
    put(&harness, LocalEntity::published(EntityKind::Organisation, 2).with_reference("gone"));
    put(&harness, LocalEntity::published(EntityKind::Organisation, 3).with_reference(third.clone()));

    let event = LifecycleEvent::bulk(LifecycleKind::Trashed, [1, 2, 3]);
    let outcome = engine.handle(&event, &harness.store);

    assert_eq!(outcome.results, vec![(1, true), (2, false), (3, true)]);
    for id in 1..=3 {
        assert_eq!(get(&harness, id).visibility, VisibilityState::Deleted);
    }
    assert_eq!(engine.drain_notices().unwrap(), vec![NOT_FOUND]);
    assert_eq!(harness.catalog.record("organization", &first).unwrap()["state"], "deleted");
    assert_eq!(harness.catalog.record("organization", &third).unwrap()["state"], "deleted");

    let outcome = engine.handle(&LifecycleEvent::undo("1,3"), &harness.store);
    assert!(outcome.all_succeeded());
    assert_eq!(get(&harness, 1).visibility, VisibilityState::Active);
    assert_eq!(harness.catalog.record("organization", &first).unwrap()["state"], "active");
    assert!(engine.drain_notices().unwrap().is_empty());
}

#[test]
fn permanent_delete_purges_except_datasets() {
    let harness = TestHarness::new();
    let datasets = harness.engine(EntityKind::Dataset);
    let groups = harness.engine(EntityKind::Group);

    let package = harness.catalog.insert("package", json!({"name": "air"}));
    let group = harness.catalog.insert("group", json!({"name": "health"}));
    put(&harness, LocalEntity::published(EntityKind::Dataset, 1).with_reference(package.clone()));
    put(&harness, LocalEntity::published(EntityKind::Group, 2).with_reference(group.clone()));
    put(&harness, LocalEntity::published(EntityKind::Group, 3));

    let delete = |ids: Vec<u64>| LifecycleEvent::bulk(LifecycleKind::PermanentlyDeleted, ids);
    assert!(datasets.handle(&delete(vec![1]), &harness.store).all_succeeded());
    assert!(groups.handle(&delete(vec![2, 3]), &harness.store).all_succeeded());

    assert_eq!(harness.catalog.call_names(), vec!["group_purge"]);
    assert!(harness.catalog.record("package", &package).is_some());
    assert!(harness.catalog.record("group", &group).is_none());
    assert!(harness.store.is_empty());
    assert_eq!(groups.stats().purges, 1);
}

#[test]
fn failed_purge_still_removes_locally() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Organisation);
    put(&harness, LocalEntity::published(EntityKind::Organisation, 1).with_reference("unknown"));

    let event = LifecycleEvent::single(LifecycleKind::PermanentlyDeleted, 1);
    let outcome = engine.handle(&event, &harness.store);

    assert_eq!(outcome.failed_ids(), vec![1]);
    assert!(harness.store.get(1).unwrap().is_none());
    assert_eq!(engine.drain_notices().unwrap(), vec![NOT_FOUND]);
}

#[test]
fn batch_skips_missing_and_foreign_ids() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Group);
    put(&harness, LocalEntity::published(EntityKind::Dataset, 1));
    put(&harness, LocalEntity::published(EntityKind::Group, 2).with_field("title", "Energy"));

    let event = LifecycleEvent::bulk(LifecycleKind::Saved { autosave: false }, [1, 2, 9]);
    let outcome = engine.handle(&event, &harness.store);

    assert_eq!(outcome.results, vec![(2, true)]);
    assert_eq!(outcome.skipped, vec![1, 9]);
    assert!(!get(&harness, 1).is_synced());
    assert!(get(&harness, 2).is_synced());
}

#[test]
fn notices_are_shared_per_kind() {
    let harness = TestHarness::new();
    let groups = harness.engine(EntityKind::Group);
    let orgs = harness.engine(EntityKind::Organisation);
    harness.catalog.fail_next("group_create", "Not authorized to create groups");
    put(&harness, LocalEntity::published(EntityKind::Group, 1));

    groups.handle(&LifecycleEvent::saved(1), &harness.store);

    assert!(orgs.drain_notices().unwrap().is_empty());
    let next_request = NoticeStore::for_kind(harness.notices.clone(), EntityKind::Group);
    assert_eq!(
        next_request.drain_and_clear().unwrap(),
        vec!["Not authorized to create groups"]
    );
    assert!(groups.drain_notices().unwrap().is_empty());
}

#[test]
fn undecodable_and_unauthorized_responses() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Group);
    harness
        .catalog
        .inject("group_create", Injected::Raw(b"<html>Bad Gateway</html>".to_vec()));
    put(&harness, LocalEntity::published(EntityKind::Group, 1));

    assert!(!engine.handle(&LifecycleEvent::saved(1), &harness.store).all_succeeded());
    assert_eq!(engine.drain_notices().unwrap(), vec![SEND_FAILURE_MESSAGE]);

    let wrong_key = FakeCatalog::with_api_key("other");
    let harness = TestHarness::with_catalog(wrong_key);
    let engine = harness.engine(EntityKind::Group);
    put(&harness, LocalEntity::published(EntityKind::Group, 1));
    engine.handle(&LifecycleEvent::saved(1), &harness.store);
    assert_eq!(engine.drain_notices().unwrap(), vec![ACCESS_DENIED]);
    assert!(!get(&harness, 1).is_synced());
}

#[test]
fn transport_failure_becomes_send_notice() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Dataset);
    harness
        .catalog
        .inject("package_create", Injected::Transport("connection reset".into()));
    put(&harness, LocalEntity::published(EntityKind::Dataset, 1));

    engine.handle(&LifecycleEvent::saved(1), &harness.store);

    assert_eq!(engine.drain_notices().unwrap(), vec![SEND_FAILURE_MESSAGE]);
    assert_eq!(harness.client.last_error().as_deref(), Some("connection reset"));
}

#[test]
fn file_backends_survive_reopen() {
    let files = TempFiles::new();
    let catalog = FakeCatalog::new();
    catalog.fail_next("organization_create", "Organization name already exists");

    {
        let client = Arc::new(ApiClient::new(&test_config(), catalog.clone()));
        let engine = SyncEngine::<FakeClient>::new(
            EntityKind::Organisation,
            &ckan_sync_protocol::EntityKindRegistry::standard(),
            client,
            NoticeStore::for_kind(files.notices(), EntityKind::Organisation),
        )
        .unwrap();
        let store = files.store();
        store
            .put(LocalEntity::published(EntityKind::Organisation, 1).with_field("title", "BAFU"))
            .unwrap();
        engine.handle(&LifecycleEvent::saved(1), &store);
        engine.handle(&LifecycleEvent::saved(1), &store);
    }

    let notices = NoticeStore::for_kind(files.notices(), EntityKind::Organisation);
    assert_eq!(
        notices.drain_and_clear().unwrap(),
        vec!["Organization name already exists"]
    );
    assert!(notices.drain_and_clear().unwrap().is_empty());

    let entity = files.store().get(1).unwrap().unwrap();
    assert_eq!(entity.name.as_deref(), Some("bafu"));
    assert!(entity.is_synced());
}

#[test]
fn organisation_parent_is_sent_as_group() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Organisation);
    put(
        &harness,
        LocalEntity::published(EntityKind::Organisation, 1)
            .with_field("title", "BAFU")
            .with_field("parent", "bund"),
    );

    engine.handle(&LifecycleEvent::saved(1), &harness.store);

    let reference = get(&harness, 1).reference_id().unwrap().to_string();
    let record = harness.catalog.record("organization", &reference).unwrap();
    assert_eq!(record["groups"], json!([{"name": "bund"}]));

    let lookup = CatalogLookup::new(harness.client.clone());
    harness.catalog.insert("organization", json!({"name": "bund", "title": "Bund"}));
    let parents = lookup.parent_options(Some("bafu")).unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].title, "Bund");
}

fn import_record() -> ImportRecord {
    serde_json::from_value(json!({
        "masterid": "m-1",
        "name": "air-quality",
        "title": "Air quality",
        "owner_org": "bafu",
        "groups": ["environment"],
        "resources": [{"url": "http://data.test/air.csv", "title": "CSV"}]
    }))
    .unwrap()
}

#[test]
fn import_creates_then_updates() {
    let harness = TestHarness::new();
    harness.catalog.insert("organization", json!({"name": "bafu"}));
    harness.catalog.insert("group", json!({"name": "environment"}));
    let engine = harness.engine(EntityKind::Dataset);
    let importer = DatasetImporter::new(&engine, &harness.store).unwrap();

    let first = importer.import(&import_record()).unwrap();
    assert!(first.created && first.synced);
    let reference = get(&harness, first.id).reference_id().unwrap().to_string();

    let mut record = import_record();
    record.title = "Air quality (revised)".into();
    let second = importer.import(&record).unwrap();

    assert_eq!(second.id, first.id);
    assert!(!second.created);
    assert_eq!(harness.catalog.count("package_create"), 1);
    assert_eq!(harness.catalog.count("package_update"), 1);
    let remote = harness.catalog.record("package", &reference).unwrap();
    assert_eq!(remote["title"], "Air quality (revised)");
    assert_eq!(remote["owner_org"], "bafu");
}

#[test]
fn import_aborts_on_missing_references() {
    let harness = TestHarness::new();
    let engine = harness.engine(EntityKind::Dataset);
    let importer = DatasetImporter::new(&engine, &harness.store).unwrap();

    let err = importer.import(&import_record()).unwrap_err();
    assert!(matches!(err, SyncError::Import(_)));
    assert_eq!(err.to_string(), "Group environment does not exist! Import aborted.");

    harness.catalog.insert("group", json!({"name": "environment"}));
    let err = importer.import(&import_record()).unwrap_err();
    assert_eq!(err.to_string(), "Organisation bafu does not exist! Import aborted.");
    assert!(harness.store.is_empty());
    assert_eq!(harness.catalog.count("package_create"), 0);
}

#[test]
fn harvest_round_trip() {
    let harness = TestHarness::new();
    harness.catalog.add_harvest_source("geo", "Geodata");
    let harvest = HarvestClient::new(harness.client.clone(), Duration::from_secs(3600));

    assert_eq!(harvest.sources().unwrap()[0].title, "Geodata");
    harvest.sources().unwrap();
    assert_eq!(harness.catalog.count("harvest_source_list"), 1);

    harvest.reharvest("geo").unwrap();
    assert!(has_unfinished_job(&harvest.latest_jobs("geo").unwrap()));
    let err = harvest.reharvest("geo").unwrap_err();
    assert!(err.is_remote());

    harvest.abort("geo").unwrap();
    let jobs = harvest.jobs("geo").unwrap();
    assert_eq!(jobs[0].status, JobStatus::Aborted);
    assert!(!has_unfinished_job(&jobs));

    harvest.clear("geo").unwrap();
    assert!(harvest.clear("nope").is_err());
}

proptest! {
    #[test]
    fn repeated_saves_create_once(entity in published_entity_strategy(EntityKind::Group), saves in 1..6usize) {
        let harness = TestHarness::new();
        let engine = harness.engine(EntityKind::Group);
        let id = entity.id;
        harness.store.put(entity).unwrap();

        for _ in 0..saves {
            let outcome = engine.handle(&LifecycleEvent::saved(id), &harness.store);
            prop_assert!(outcome.all_succeeded());
        }

        prop_assert_eq!(harness.catalog.count("group_create"), 1);
        prop_assert_eq!(harness.catalog.count("group_update"), saves - 1);
        prop_assert_eq!(harness.catalog.records("group").len(), 1);
    }

    #[test]
    fn trash_is_local_first(ids in id_set_strategy(5)) {
        let harness = TestHarness::new();
        let engine = harness.engine(EntityKind::Dataset);
        for &id in &ids {
            harness
                .store
                .put(LocalEntity::published(EntityKind::Dataset, id).with_reference(format!("missing-{id}")))
                .unwrap();
        }

        let trash = LifecycleEvent::bulk(LifecycleKind::Trashed, ids.clone());
        let outcome = engine.handle(&trash, &harness.store);

        prop_assert_eq!(outcome.failed_ids(), ids.clone());
        for &id in &ids {
            prop_assert_eq!(harness.store.get(id).unwrap().unwrap().visibility, VisibilityState::Deleted);
        }
        prop_assert_eq!(engine.drain_notices().unwrap().len(), ids.len());
    }
}
