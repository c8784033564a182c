//! Artifact generator run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::application::repos::{ContentStore, StoreError};

use super::allowlist;
use super::constants::render_constants;
use super::manifest::{DEFAULT_SHORT_NAME_LIMIT, patch_manifest};
use super::mobile::render_mobile_config;
use super::projection::ContentMap;
use super::snapshot::render_snapshot;
use super::{ArtifactError, ArtifactTarget, write_artifact};

const METRIC_ARTIFACT_FAILURE: &str = "tidecast_artifact_failure_total";

/// Output locations of the four targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub mobile_config: PathBuf,
    pub manifest: PathBuf,
    pub snapshot: PathBuf,
    pub constants: PathBuf,
}

impl ArtifactPaths {
    /// Conventional layout below `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            mobile_config: root.join("mobile/app-config.json"),
            manifest: root.join("public/manifest.json"),
            snapshot: root.join("public/content-snapshot.json"),
            constants: root.join("src/generated/content-constants.ts"),
        }
    }

    pub fn path(&self, target: ArtifactTarget) -> &Path {
        match target {
            ArtifactTarget::MobileConfig => &self.mobile_config,
            ArtifactTarget::Manifest => &self.manifest,
            ArtifactTarget::Snapshot => &self.snapshot,
            ArtifactTarget::Constants => &self.constants,
        }
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Written { path: PathBuf },
    Skipped { reason: String },
    Failed { reason: String },
}

/// Summary of a generator run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Allow-listed keys that resolved to a value.
    pub resolved: usize,
    /// Allow-listed keys that fell back to their default.
    pub missing_keys: Vec<&'static str>,
    pub targets: Vec<(ArtifactTarget, TargetOutcome)>,
}

impl GenerationReport {
    pub fn outcome(&self, target: ArtifactTarget) -> Option<&TargetOutcome> {
        self.targets
            .iter()
            .find(|(candidate, _)| *candidate == target)
            .map(|(_, outcome)| outcome)
    }

    /// True when no target failed; a skipped manifest still counts.
    pub fn is_success(&self) -> bool {
        !self
            .targets
            .iter()
            .any(|(_, outcome)| matches!(outcome, TargetOutcome::Failed { .. }))
    }
}

/// Reads the allow-listed keys once and writes every target independently.
pub struct ArtifactGenerator {
    store: Arc<dyn ContentStore>,
    paths: ArtifactPaths,
    short_name_limit: usize,
}

impl ArtifactGenerator {
    pub fn new(store: Arc<dyn ContentStore>, paths: ArtifactPaths) -> Self {
        Self {
            store,
            paths,
            short_name_limit: DEFAULT_SHORT_NAME_LIMIT,
        }
    }

    pub fn with_short_name_limit(mut self, limit: usize) -> Self {
        self.short_name_limit = limit;
        self
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub async fn run(&self) -> Result<GenerationReport, StoreError> {
        self.run_at(OffsetDateTime::now_utc()).await
    }

    /// Run with an explicit generation timestamp.
    ///
    /// A store failure aborts the run before anything is written. Target
    /// failures are logged and reported; earlier writes are not rolled back.
    #[instrument(skip(self))]
    pub async fn run_at(
        &self,
        generated_at: OffsetDateTime,
    ) -> Result<GenerationReport, StoreError> {
        let keys = allowlist::keys();
        let entries = self.store.fetch_by_keys(&keys).await.inspect_err(|err| {
            error!(error = %err, "Artifact generation aborted: content store read failed");
        })?;
        let map = ContentMap::from_entries(&entries);

        let missing_keys: Vec<&'static str> = keys
            .iter()
            .copied()
            .filter(|key| !map.contains_key(key))
            .collect();
        if !missing_keys.is_empty() {
            info!(
                missing = ?missing_keys,
                "Allow-listed keys absent from the store; using defaults"
            );
        }

        let mut targets = Vec::with_capacity(ArtifactTarget::ALL.len());
        for target in ArtifactTarget::ALL {
            let outcome = match self.build(target, &map, generated_at).await {
                Ok(path) => {
                    info!(target = %target, path = %path.display(), "Artifact written");
                    TargetOutcome::Written { path }
                }
                Err(ArtifactError::ManifestUnavailable { path, reason }) => {
                    warn!(path = %path.display(), %reason, "Manifest unavailable; skipping patch");
                    TargetOutcome::Skipped { reason }
                }
                Err(err) => {
                    error!(target = %target, error = %err, "Artifact target failed");
                    counter!(METRIC_ARTIFACT_FAILURE, "target" => target.as_str()).increment(1);
                    TargetOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            targets.push((target, outcome));
        }

        Ok(GenerationReport {
            generated_at,
            resolved: keys.len() - missing_keys.len(),
            missing_keys,
            targets,
        })
    }

    async fn build(
        &self,
        target: ArtifactTarget,
        map: &ContentMap,
        generated_at: OffsetDateTime,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.paths.path(target);
        let rendered = match target {
            ArtifactTarget::MobileConfig => render_mobile_config(map)?,
            ArtifactTarget::Manifest => patch_manifest(path, map, self.short_name_limit).await?,
            ArtifactTarget::Snapshot => render_snapshot(map, generated_at)?,
            ArtifactTarget::Constants => render_constants(map)?,
        };
        write_artifact(target, path, rendered.as_bytes()).await?;
        Ok(path.to_path_buf())
    }
}
