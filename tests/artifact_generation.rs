//! Generator runs against the in-memory store, writing into a temp directory.

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use tidecast::application::repos::StoreError;
use tidecast::artifacts::{
    ArtifactGenerator, ArtifactPaths, ArtifactTarget, TargetOutcome, allowlist,
};
use tidecast::domain::entities::ContentEntry;
use tidecast::infra::memory::InMemoryContentStore;
use time::macros::datetime;

fn entry(key: &str, content: &str) -> ContentEntry {
    serde_json::from_value(json!({
        "key": key,
        "content": content,
        "page": "global",
        "section": "branding"
    }))
    .expect("valid entry")
}

fn read_json(path: &std::path::Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("artifact written");
    serde_json::from_str(&raw).expect("artifact is json")
}

fn write_manifest(paths: &ArtifactPaths) {
    let parent = paths.manifest.parent().expect("manifest has a parent");
    std::fs::create_dir_all(parent).expect("create public dir");
    std::fs::write(
        &paths.manifest,
        r##"{
  "name": "Old Name",
  "short_name": "Old",
  "start_url": "/",
  "theme_color": "#0b3d91",
  "description": "Old description"
}"##,
    )
    .expect("write manifest");
}

#[tokio::test]
async fn empty_store_writes_defaults_everywhere() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    write_manifest(&paths);
    let generator = ArtifactGenerator::new(Arc::new(InMemoryContentStore::new()), paths.clone());

    let report = generator.run().await.expect("store readable");

    assert!(report.is_success());
    assert_eq!(report.resolved, 0);
    assert!(report.missing_keys.contains(&"company_name"));

    let mobile = read_json(&paths.mobile_config);
    let constants = std::fs::read_to_string(&paths.constants).expect("constants written");
    for group in allowlist::GROUPS {
        for field in group.fields {
            assert!(report.missing_keys.contains(&field.key), "{} not reported", field.key);
            if group.mobile {
                assert_eq!(
                    mobile[group.name][field.property], field.default,
                    "{}.{}",
                    group.name, field.property
                );
            }
            let literal = serde_json::to_string(field.default).expect("encode default");
            let line = format!("export const {} = {literal};", field.constant);
            assert!(constants.contains(&line), "missing `{line}`");
        }
    }
    assert!(constants.contains("export const HERO_VIDEO_TITLE = \"Welcome aboard\";"));

    let snapshot = read_json(&paths.snapshot);
    assert_eq!(snapshot["version"], 1);
    assert_eq!(snapshot["content"], json!({}));

    // Nothing to patch from: prior manifest values survive.
    let manifest = read_json(&paths.manifest);
    assert_eq!(manifest["name"], "Old Name");
    assert_eq!(manifest["theme_color"], "#0b3d91");
}

#[tokio::test]
async fn store_values_flow_into_every_target() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    write_manifest(&paths);

    let store = InMemoryContentStore::new();
    store.upsert(entry("company_name", "Coral Coast Expeditions"));
    store.upsert(entry("company_description", "Small-boat island tours"));
    store.upsert(entry("hero_video_title", "Set sail"));
    store.upsert(entry("not_allow_listed", "ignored"));
    let generator = ArtifactGenerator::new(Arc::new(store), paths.clone());

    let report = generator.run().await.expect("store readable");
    assert_eq!(report.resolved, 3);

    let mobile = read_json(&paths.mobile_config);
    assert_eq!(mobile["company"]["name"], "Coral Coast Expeditions");
    assert_eq!(mobile["company"]["shortName"], "Blue Horizon");

    let manifest = read_json(&paths.manifest);
    assert_eq!(manifest["name"], "Coral Coast Expeditions");
    assert_eq!(manifest["short_name"], "Coral Coast");
    assert_eq!(manifest["description"], "Small-boat island tours");
    assert_eq!(manifest["start_url"], "/");

    let snapshot = read_json(&paths.snapshot);
    assert_eq!(snapshot["content"]["hero_video_title"]["value"], "Set sail");
    assert!(snapshot["content"].get("not_allow_listed").is_none());

    let constants = std::fs::read_to_string(&paths.constants).expect("constants written");
    assert!(constants.contains("export const HERO_VIDEO_TITLE = \"Set sail\";"));
}

#[tokio::test]
async fn reruns_differ_only_in_snapshot_timestamp() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    write_manifest(&paths);

    let store = InMemoryContentStore::new();
    store.upsert(entry("company_name", "Coral Coast Expeditions"));
    let generator = ArtifactGenerator::new(Arc::new(store), paths.clone());

    generator
        .run_at(datetime!(2026-03-01 08:00 UTC))
        .await
        .expect("first run");
    let first_mobile = std::fs::read(&paths.mobile_config).expect("mobile");
    let first_manifest = std::fs::read(&paths.manifest).expect("manifest");
    let first_constants = std::fs::read(&paths.constants).expect("constants");
    let mut first_snapshot = read_json(&paths.snapshot);

    generator
        .run_at(datetime!(2026-03-02 08:00 UTC))
        .await
        .expect("second run");
    let mut second_snapshot = read_json(&paths.snapshot);

    assert_eq!(std::fs::read(&paths.mobile_config).expect("mobile"), first_mobile);
    assert_eq!(std::fs::read(&paths.manifest).expect("manifest"), first_manifest);
    assert_eq!(std::fs::read(&paths.constants).expect("constants"), first_constants);

    assert_eq!(first_snapshot["lastUpdated"], "2026-03-01T08:00:00Z");
    assert_eq!(second_snapshot["lastUpdated"], "2026-03-02T08:00:00Z");
    first_snapshot["lastUpdated"] = Value::Null;
    second_snapshot["lastUpdated"] = Value::Null;
    assert_eq!(first_snapshot, second_snapshot);
}

#[tokio::test]
async fn missing_manifest_is_skipped_and_others_are_written() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    let generator = ArtifactGenerator::new(Arc::new(InMemoryContentStore::new()), paths.clone());

    let report = generator.run().await.expect("store readable");

    assert!(report.is_success());
    assert!(matches!(
        report.outcome(ArtifactTarget::Manifest),
        Some(TargetOutcome::Skipped { .. })
    ));
    assert!(!paths.manifest.exists());
    assert!(paths.mobile_config.exists());
    assert!(paths.snapshot.exists());
    assert!(paths.constants.exists());
}

#[tokio::test]
async fn unwritable_target_fails_alone() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    write_manifest(&paths);
    // A directory where the constants file should go.
    std::fs::create_dir_all(&paths.constants).expect("block constants path");
    let generator = ArtifactGenerator::new(Arc::new(InMemoryContentStore::new()), paths.clone());

    let report = generator.run().await.expect("store readable");

    assert!(!report.is_success());
    assert!(matches!(
        report.outcome(ArtifactTarget::Constants),
        Some(TargetOutcome::Failed { .. })
    ));
    assert!(matches!(
        report.outcome(ArtifactTarget::MobileConfig),
        Some(TargetOutcome::Written { .. })
    ));
    assert!(paths.snapshot.exists());
}

#[tokio::test]
async fn unavailable_store_aborts_before_writing() {
    let dir = TempDir::new().expect("tempdir");
    let paths = ArtifactPaths::under(dir.path());
    let store = InMemoryContentStore::new();
    store.set_unavailable(true);
    let generator = ArtifactGenerator::new(Arc::new(store), paths.clone());

    let err = generator.run().await.expect_err("store down");

    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(!paths.mobile_config.exists());
    assert!(!paths.snapshot.exists());
}
