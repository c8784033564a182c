use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::projection::ContentMap;
use super::{ArtifactError, ArtifactTarget};

/// Schema version of the raw snapshot file.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot<'a> {
    version: u32,
    last_updated: String,
    content: &'a ContentMap,
}

/// Raw snapshot polled by native clients: the whole projected map plus a
/// schema version and the generation time.
pub fn render_snapshot(
    map: &ContentMap,
    generated_at: OffsetDateTime,
) -> Result<String, ArtifactError> {
    let last_updated = generated_at
        .format(&Rfc3339)
        .map_err(|err| ArtifactError::encode(ArtifactTarget::Snapshot, err))?;
    let snapshot = RawSnapshot {
        version: SNAPSHOT_VERSION,
        last_updated,
        content: map,
    };

    let mut rendered = serde_json::to_string_pretty(&snapshot)
        .map_err(|err| ArtifactError::encode(ArtifactTarget::Snapshot, err))?;
    rendered.push('\n');
    Ok(rendered)
}
