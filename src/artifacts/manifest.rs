//! Installed-web-app manifest patch.

use std::path::Path;

use serde_json::Value;

use super::projection::ContentMap;
use super::{ArtifactError, ArtifactTarget};

/// Upper bound on `short_name`, in characters.
pub const DEFAULT_SHORT_NAME_LIMIT: usize = 12;

const NAME_KEY: &str = "company_name";
const SHORT_NAME_KEY: &str = "company_short_name";
const DESCRIPTION_KEY: &str = "company_description";

/// Read the manifest at `path` and return it with `name`, `short_name` and
/// `description` replaced from the map. Fields the map lacks keep the
/// manifest's prior values; everything else, key order included, is kept.
pub async fn patch_manifest(
    path: &Path,
    map: &ContentMap,
    short_name_limit: usize,
) -> Result<String, ArtifactError> {
    let unavailable = |reason: String| ArtifactError::ManifestUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| unavailable(err.to_string()))?;
    let mut manifest: Value =
        serde_json::from_str(&raw).map_err(|err| unavailable(err.to_string()))?;
    let fields = manifest
        .as_object_mut()
        .ok_or_else(|| unavailable("manifest root is not an object".to_string()))?;

    if let Some(name) = map.value(NAME_KEY) {
        fields.insert("name".to_string(), Value::String(name.to_string()));
    }
    if let Some(short_name) = map.value(SHORT_NAME_KEY).or_else(|| map.value(NAME_KEY)) {
        fields.insert(
            "short_name".to_string(),
            Value::String(truncate(short_name, short_name_limit)),
        );
    }
    if let Some(description) = map.value(DESCRIPTION_KEY) {
        fields.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }

    let mut rendered = serde_json::to_string_pretty(&manifest)
        .map_err(|err| ArtifactError::encode(ArtifactTarget::Manifest, err))?;
    rendered.push('\n');
    Ok(rendered)
}

fn truncate(value: &str, limit: usize) -> String {
    value
        .chars()
        .take(limit)
        .collect::<String>()
        .trim_end()
        .to_string()
}
