//! Persistence bridge: ships the pending edit overlay to the tile-update
//! service as a single batch.
//!
//! The overlay is only ever read here. A successful save leaves it populated so
//! the painted cells stay visible until the caller decides otherwise.

use scene::EditOverlayStore;
use tracing::{info, warn};

use crate::client::Backend;
use crate::error::ApiError;
use crate::protocol::{EditedFeature, TileUpdateRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to send; no request was made.
    NothingToSave,
    Saved {
        changeset_id: Option<String>,
        features: usize,
    },
    /// The service answered 2xx but reported `success: false`.
    Rejected,
}

pub fn build_payload(field_name: &str, overlay: &EditOverlayStore) -> TileUpdateRequest {
    TileUpdateRequest {
        field_name: field_name.to_string(),
        edited_features: overlay.entries().map(EditedFeature::from).collect(),
    }
}

pub async fn save(
    backend: &dyn Backend,
    field_name: &str,
    overlay: &EditOverlayStore,
) -> Result<SaveOutcome, ApiError> {
    if overlay.is_empty() {
        return Ok(SaveOutcome::NothingToSave);
    }
    let payload = build_payload(field_name, overlay);
    let features = payload.edited_features.len();
    match backend.update_tiles(payload).await {
        Ok(resp) if resp.success => {
            info!(
                field = field_name,
                features,
                changeset = resp.changeset_id.as_deref().unwrap_or("-"),
                "edits saved"
            );
            Ok(SaveOutcome::Saved {
                changeset_id: resp.changeset_id,
                features,
            })
        }
        Ok(_) => {
            warn!(field = field_name, features, "tile update rejected");
            Ok(SaveOutcome::Rejected)
        }
        Err(err) => {
            warn!(field = field_name, features, error = %err, "tile update failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build_payload;
    use pretty_assertions::assert_eq;
    use scene::{Attribute, CellFeature, EditOverlayStore, Geometry, Properties};

    fn cell(id: &str) -> CellFeature {
        let mut props = Properties::new();
        props.set_text("h3_index", id);
        props.set_attribute(Attribute::YieldTarget, 150.0);
        CellFeature::new(
            Geometry::polygon(vec![[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.0]]),
            props,
        )
    }

    #[test]
    fn payload_carries_one_entry_per_record() {
        let mut overlay = EditOverlayStore::new(Attribute::YieldTarget);
        overlay.upsert(&cell("b"), 200.0);
        overlay.upsert(&cell("a"), 180.0);
        overlay.upsert(&cell("a"), 190.0);

        let payload = build_payload("North of Road", &overlay);
        assert_eq!(payload.field_name, "North of Road");
        let ids: Vec<&str> = payload.edited_features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(payload.edited_features[0].overridden_value, 190.0);
        assert_eq!(
            payload.edited_features[0]
                .properties
                .attribute(Attribute::YieldTarget),
            Some(190.0)
        );
    }

    #[test]
    fn payload_serializes_with_wire_keys() {
        let mut overlay = EditOverlayStore::new(Attribute::YieldTarget);
        overlay.upsert(&cell("a"), 180.0);
        let v = serde_json::to_value(build_payload("F", &overlay)).unwrap();
        let edited = &v["editedFeatures"][0];
        assert_eq!(edited["id"], "a");
        assert_eq!(edited["overriddenValue"], 180.0);
        assert_eq!(edited["geometry"]["type"], "Polygon");
        assert_eq!(edited["properties"]["yield_target"], 180.0);
    }
}
