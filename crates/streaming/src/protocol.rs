//! Wire types for the dashboard's backend collaborators.
//!
//! - Query: natural-language question in, classified answer out.
//! - Prescription: per-nutrient zone maps for one field.
//! - Tile update: batch of painted overrides for one field.
//!
//! Responses are decoded leniently: absent or `null` collections become empty
//! and unknown keys are ignored, so older backends stay readable.

use scene::{EditRecord, FeatureCollection, FeatureError, Geometry, Nutrient, Properties};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A result row as returned by the query service. Key order is preserved.
pub type Row = Map<String, Value>;

/// Intent tag the query service uses for prescription requests.
pub const PRESCRIPTION_INTENT: &str = "prescription_map";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// How a query answer should be presented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
    Map,
    Table,
    Chart,
}

impl AnswerKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "map" => Some(AnswerKind::Map),
            "table" => Some(AnswerKind::Table),
            "chart" => Some(AnswerKind::Chart),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerKind::Map => "map",
            AnswerKind::Table => "table",
            AnswerKind::Chart => "chart",
        }
    }
}

/// One named numeric series of a chart answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScatterPlotData {
    #[serde(default, deserialize_with = "nullable")]
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub question: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<Row>,
    #[serde(default, alias = "cellIds", deserialize_with = "nullable")]
    pub hex_ids: Vec<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default, alias = "answerKind")]
    pub view_type: Option<String>,
    /// column -> `{label, unit, ...}`
    #[serde(default)]
    pub column_metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub scatter_plot_data: Option<ScatterPlotData>,
}

impl QueryResponse {
    /// Presentation kind, or `None` for a summary-only answer. Unrecognized
    /// kinds are treated as summary-only.
    pub fn answer_kind(&self) -> Option<AnswerKind> {
        self.view_type.as_deref().and_then(AnswerKind::parse)
    }

    pub fn wants_prescription(&self) -> bool {
        self.intent
            .as_deref()
            .is_some_and(|i| i.eq_ignore_ascii_case(PRESCRIPTION_INTENT))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionMap {
    pub pass: String,
    pub geojson: Value,
}

impl PrescriptionMap {
    pub fn nutrient(&self) -> Option<Nutrient> {
        Nutrient::from_pass_name(&self.pass)
    }

    pub fn zones(&self) -> Result<FeatureCollection, FeatureError> {
        FeatureCollection::from_value(self.geojson.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionSummary {
    #[serde(default)]
    pub total_passes: u32,
    #[serde(default)]
    pub field_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub prescription_maps: Vec<PrescriptionMap>,
    #[serde(default)]
    pub summary: PrescriptionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedFeature {
    pub id: String,
    pub overridden_value: f64,
    pub geometry: Geometry,
    pub properties: Properties,
}

impl From<&EditRecord> for EditedFeature {
    fn from(record: &EditRecord) -> Self {
        Self {
            id: record.feature_id.clone(),
            overridden_value: record.overridden_value,
            geometry: record.geometry.clone(),
            properties: record.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileUpdateRequest {
    pub field_name: String,
    pub edited_features: Vec<EditedFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub changeset_id: Option<String>,
}

/// Error body shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Value,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{AnswerKind, PrescriptionResponse, QueryResponse, TileUpdateRequest};
    use pretty_assertions::assert_eq;
    use scene::Nutrient;
    use serde_json::json;

    #[test]
    fn decodes_map_answer() {
        let body = json!({
            "question": "which hexes have low phosphorus?",
            "intent": "query",
            "field_name": "North of Road",
            "sql": "SELECT h3_index FROM agricultural_hexes WHERE P_in_soil < 20",
            "results": [{"h3_index": "a"}, {"h3_index": "b"}],
            "hex_ids": ["a", "b"],
            "count": 2,
            "summary": "Found 2 hexes.",
            "view_type": "map"
        });
        let r: QueryResponse = serde_json::from_value(body).unwrap();
        assert_eq!(r.answer_kind(), Some(AnswerKind::Map));
        assert_eq!(r.hex_ids, vec!["a".to_string(), "b".to_string()]);
        assert!(!r.wants_prescription());
    }

    #[test]
    fn accepts_camel_case_aliases_and_nulls() {
        let body = json!({
            "summary": null,
            "results": null,
            "cellIds": ["x"],
            "answerKind": "Table"
        });
        let r: QueryResponse = serde_json::from_value(body).unwrap();
        assert_eq!(r.hex_ids, vec!["x".to_string()]);
        assert_eq!(r.answer_kind(), Some(AnswerKind::Table));
        assert!(r.results.is_empty());
        assert_eq!(r.summary, "");
    }

    #[test]
    fn unknown_view_type_is_summary_only() {
        let r: QueryResponse = serde_json::from_value(json!({"view_type": "text"})).unwrap();
        assert_eq!(r.answer_kind(), None);
    }

    #[test]
    fn result_rows_keep_column_order() {
        let text = r#"{"results": [{"zeta": 1, "alpha": 2, "mid": 3}]}"#;
        let r: QueryResponse = serde_json::from_str(text).unwrap();
        let keys: Vec<&str> = r.results[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn prescription_intent_is_case_insensitive() {
        let r: QueryResponse =
            serde_json::from_value(json!({"intent": "Prescription_Map"})).unwrap();
        assert!(r.wants_prescription());
    }

    #[test]
    fn decodes_prescription_maps() {
        let body = json!({
            "success": true,
            "prescription_maps": [{
                "pass": "nitrogen pass",
                "geojson": {
                    "type": "FeatureCollection",
                    "features": [{
                        "type": "Feature",
                        "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]},
                        "properties": {"pass": "nitrogen pass", "zone_number": 1, "rate": 120.0, "unit": "lbs/acre"}
                    }]
                }
            }],
            "summary": {"total_passes": 1, "field_name": "North of Road"}
        });
        let r: PrescriptionResponse = serde_json::from_value(body).unwrap();
        let map = &r.prescription_maps[0];
        assert_eq!(map.nutrient(), Some(Nutrient::Nitrogen));
        let zones = map.zones().unwrap();
        assert_eq!(zones.features[0].properties.number("rate"), Some(120.0));
        assert_eq!(r.summary.total_passes, 1);
    }

    #[test]
    fn tile_update_uses_camel_case_keys() {
        let req = TileUpdateRequest {
            field_name: "North of Road".into(),
            edited_features: vec![],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"fieldName": "North of Road", "editedFeatures": []})
        );
    }
}
