use serde_json::{Map, Value};

use super::allowlist::GROUPS;
use super::projection::ContentMap;
use super::{ArtifactError, ArtifactTarget};

/// Pretty-printed mobile configuration: one object per mobile group, every
/// field present (map value or hardcoded default).
pub fn render_mobile_config(map: &ContentMap) -> Result<String, ArtifactError> {
    let mut root = Map::new();

    for group in GROUPS.iter().filter(|group| group.mobile) {
        let fields: Map<String, Value> = group
            .fields
            .iter()
            .map(|field| {
                (
                    field.property.to_string(),
                    Value::String(map.value_or_default(field).to_string()),
                )
            })
            .collect();
        root.insert(group.name.to_string(), Value::Object(fields));
    }

    let mut rendered = serde_json::to_string_pretty(&Value::Object(root))
        .map_err(|err| ArtifactError::encode(ArtifactTarget::MobileConfig, err))?;
    rendered.push('\n');
    Ok(rendered)
}
