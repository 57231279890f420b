use std::collections::BTreeMap;

use crate::attribute::Attribute;
use crate::feature::{CellFeature, Geometry, Properties};
use crate::identity::identity_for;

/// A user-painted override of one cell's editable attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub feature_id: String,
    /// Copied from the source feature on first insertion only.
    pub geometry: Geometry,
    /// Source properties with the overridden attribute applied.
    pub properties: Properties,
    pub overridden_value: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Pending edits for the field currently in view.
///
/// Records are keyed by resolved feature identity, so repeated strokes over a
/// cell update its record instead of adding another. Every mutation bumps
/// `revision`; consumers that cache derived output compare revisions rather
/// than contents.
#[derive(Debug, Clone)]
pub struct EditOverlayStore {
    attribute: Attribute,
    field: Option<String>,
    records: BTreeMap<String, EditRecord>,
    revision: u64,
}

impl EditOverlayStore {
    pub fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            field: None,
            records: BTreeMap::new(),
            revision: 0,
        }
    }

    /// The attribute this store overrides.
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Field the current records belong to.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Binds the store to `field`. Switching to a different field discards
    /// all records. Returns the number of records discarded.
    pub fn bind_field(&mut self, field: &str) -> usize {
        if self.field.as_deref() == Some(field) {
            return 0;
        }
        let dropped = self.records.len();
        self.records.clear();
        self.field = Some(field.to_string());
        self.revision += 1;
        dropped
    }

    pub fn upsert(&mut self, feature: &CellFeature, value: f64) -> Upsert {
        self.upsert_with(feature, value, |_| {})
    }

    /// Like [`upsert`](Self::upsert), running `derive` on the new property bag
    /// after the override is applied.
    pub fn upsert_with<F>(&mut self, feature: &CellFeature, value: f64, derive: F) -> Upsert
    where
        F: FnOnce(&mut Properties),
    {
        let feature_id = identity_for(feature);
        let mut properties = feature.properties.clone();
        properties.set_attribute(self.attribute, value);
        derive(&mut properties);

        self.revision += 1;
        match self.records.get_mut(&feature_id) {
            Some(existing) => {
                existing.properties = properties;
                existing.overridden_value = value;
                Upsert::Updated
            }
            None => {
                self.records.insert(
                    feature_id.clone(),
                    EditRecord {
                        feature_id,
                        geometry: feature.geometry.clone(),
                        properties,
                        overridden_value: value,
                    },
                );
                Upsert::Inserted
            }
        }
    }

    pub fn clear(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.records.clear();
        self.revision += 1;
    }

    pub fn get(&self, feature_id: &str) -> Option<&EditRecord> {
        self.records.get(feature_id)
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.records.contains_key(feature_id)
    }

    /// Records in ascending identity order.
    pub fn entries(&self) -> impl Iterator<Item = &EditRecord> + '_ {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::{EditOverlayStore, Upsert};
    use crate::attribute::Attribute;
    use crate::feature::{CellFeature, Geometry, Properties};
    use pretty_assertions::assert_eq;

    fn cell(id: &str, lon: f64, yield_target: f64) -> CellFeature {
        let mut props = Properties::new();
        props.set_text("h3_index", id);
        props.set_text("field_name", "North of Road");
        props.set_attribute(Attribute::YieldTarget, yield_target);
        let ring = vec![[lon, 42.0], [lon + 0.0001, 42.0], [lon + 0.0001, 42.0001], [lon, 42.0]];
        CellFeature::new(Geometry::polygon(ring), props)
    }

    #[test]
    fn second_upsert_updates_value_only() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        let a = cell("a", -93.0, 150.0);

        assert_eq!(store.upsert(&a, 180.0), Upsert::Inserted);
        assert_eq!(store.upsert(&a, 210.0), Upsert::Updated);
        assert_eq!(store.len(), 1);

        let rec = store.get("a").unwrap();
        assert_eq!(rec.overridden_value, 210.0);
        assert_eq!(rec.properties.attribute(Attribute::YieldTarget), Some(210.0));
        assert_eq!(rec.properties.field_name(), Some("North of Road"));
    }

    #[test]
    fn geometry_is_not_recopied_on_update() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        let original = cell("a", -93.0, 150.0);
        store.upsert(&original, 180.0);

        // Same identity, slightly shifted geometry from another render pass.
        let drifted = cell("a", -93.00000001, 150.0);
        store.upsert(&drifted, 190.0);

        assert_eq!(store.get("a").unwrap().geometry, original.geometry);
    }

    #[test]
    fn derive_hook_sees_override() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        store.upsert_with(&cell("a", -93.0, 150.0), 200.0, |props| {
            let y = props.attribute(Attribute::YieldTarget).unwrap_or(0.0);
            props.set_attribute(Attribute::NitrogenRate, y * 1.2);
        });
        let rec = store.get("a").unwrap();
        assert_eq!(rec.properties.attribute(Attribute::NitrogenRate), Some(240.0));
    }

    #[test]
    fn switching_field_discards_records() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        assert_eq!(store.bind_field("North of Road"), 0);
        store.upsert(&cell("a", -93.0, 150.0), 180.0);
        store.upsert(&cell("b", -92.0, 150.0), 180.0);

        assert_eq!(store.bind_field("North of Road"), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.bind_field("South Pivot"), 2);
        assert!(store.is_empty());
        assert_eq!(store.field(), Some("South Pivot"));
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        let r0 = store.revision();
        store.upsert(&cell("a", -93.0, 150.0), 180.0);
        store.upsert(&cell("a", -93.0, 150.0), 181.0);
        assert_eq!(store.revision(), r0 + 2);

        store.clear();
        assert_eq!(store.revision(), r0 + 3);
        // Clearing an empty store is not a change.
        store.clear();
        assert_eq!(store.revision(), r0 + 3);
    }

    #[test]
    fn entries_are_sorted_by_identity() {
        let mut store = EditOverlayStore::new(Attribute::YieldTarget);
        store.upsert(&cell("c", -91.0, 1.0), 1.0);
        store.upsert(&cell("a", -93.0, 1.0), 1.0);
        store.upsert(&cell("b", -92.0, 1.0), 1.0);
        let ids: Vec<&str> = store.entries().map(|r| r.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
