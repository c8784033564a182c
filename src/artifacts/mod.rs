//! Derived platform artifacts.
//!
//! A generator run reads the allow-listed keys once, projects them into a
//! [`ContentMap`] and hands that map to four independent targets.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub mod allowlist;
mod constants;
mod generator;
mod manifest;
mod mobile;
mod projection;
mod snapshot;

pub use constants::{ConstantsModule, render_constants};
pub use generator::{ArtifactGenerator, ArtifactPaths, GenerationReport, TargetOutcome};
pub use manifest::{DEFAULT_SHORT_NAME_LIMIT, patch_manifest};
pub use mobile::render_mobile_config;
pub use projection::{ContentMap, ProjectedValue};
pub use snapshot::{SNAPSHOT_VERSION, render_snapshot};

/// The four output files of a generator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactTarget {
    MobileConfig,
    Manifest,
    Snapshot,
    Constants,
}

impl ArtifactTarget {
    pub const ALL: [ArtifactTarget; 4] = [
        ArtifactTarget::MobileConfig,
        ArtifactTarget::Manifest,
        ArtifactTarget::Snapshot,
        ArtifactTarget::Constants,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactTarget::MobileConfig => "mobile_config",
            ArtifactTarget::Manifest => "manifest",
            ArtifactTarget::Snapshot => "snapshot",
            ArtifactTarget::Constants => "constants",
        }
    }
}

impl fmt::Display for ArtifactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write {target} artifact to `{path}`: {source}")]
    Write {
        target: ArtifactTarget,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {target} artifact: {reason}")]
    Encode {
        target: ArtifactTarget,
        reason: String,
    },
    #[error("manifest unavailable at `{path}`: {reason}")]
    ManifestUnavailable { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn encode(target: ArtifactTarget, reason: impl fmt::Display) -> Self {
        Self::Encode {
            target,
            reason: reason.to_string(),
        }
    }

    pub fn target(&self) -> ArtifactTarget {
        match self {
            ArtifactError::Write { target, .. } | ArtifactError::Encode { target, .. } => *target,
            ArtifactError::ManifestUnavailable { .. } => ArtifactTarget::Manifest,
        }
    }
}

/// Write `bytes` to `path`, creating parent directories first.
pub(crate) async fn write_artifact(
    target: ArtifactTarget,
    path: &Path,
    bytes: &[u8],
) -> Result<(), ArtifactError> {
    let wrap = |source: io::Error| ArtifactError::Write {
        target,
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, bytes).await.map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_artifact_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.json");

        write_artifact(ArtifactTarget::Snapshot, &path, b"{}")
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn manifest_errors_belong_to_manifest_target() {
        let err = ArtifactError::ManifestUnavailable {
            path: PathBuf::from("public/manifest.json"),
            reason: "missing".to_string(),
        };
        assert_eq!(err.target(), ArtifactTarget::Manifest);
        assert_eq!(
            err.to_string(),
            "manifest unavailable at `public/manifest.json`: missing"
        );
    }
}
