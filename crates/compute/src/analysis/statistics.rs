use std::collections::BTreeMap;

use scene::{CellFeature, EditOverlayStore, Geometry, identity_for};

/// Live totals for the field in view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStatistics {
    pub total_acres: f64,
    /// Sum of `acres × value` over cells that carry a value.
    pub total_projected_yield: f64,
    pub cell_count: usize,
    pub edited_cells: usize,
    /// Area-weighted mean of the attribute over cells that carry a value.
    pub mean_value: Option<f64>,
    pub value_range: Option<(f64, f64)>,
}

struct WorkingCell<'a> {
    geometry: &'a Geometry,
    value: Option<f64>,
    edited: bool,
}

/// Aggregates base cells with the overlay applied on top.
///
/// Cells are keyed by resolved identity; an edited cell replaces its base
/// entry so it is counted once, at its overridden value. The attribute summed
/// is the one the overlay edits.
pub fn aggregate(base: &[CellFeature], overlay: &EditOverlayStore) -> FieldStatistics {
    let attribute = overlay.attribute();
    let mut working: BTreeMap<String, WorkingCell<'_>> = BTreeMap::new();

    for feature in base {
        working.insert(
            identity_for(feature),
            WorkingCell {
                geometry: &feature.geometry,
                value: feature.value(attribute),
                edited: false,
            },
        );
    }
    for record in overlay.entries() {
        working.insert(
            record.feature_id.clone(),
            WorkingCell {
                geometry: &record.geometry,
                value: Some(record.overridden_value),
                edited: true,
            },
        );
    }

    let mut stats = FieldStatistics {
        cell_count: working.len(),
        ..FieldStatistics::default()
    };
    let mut valued_acres = 0.0;

    for cell in working.values() {
        let acres = cell.geometry.acres();
        stats.total_acres += acres;
        if cell.edited {
            stats.edited_cells += 1;
        }
        if let Some(v) = cell.value {
            stats.total_projected_yield += acres * v;
            valued_acres += acres;
            stats.value_range = Some(match stats.value_range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
    }

    if valued_acres > 0.0 {
        stats.mean_value = Some(stats.total_projected_yield / valued_acres);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::aggregate;
    use foundation::math::{METERS_PER_DEGREE, SQUARE_METERS_PER_ACRE};
    use scene::{Attribute, CellFeature, EditOverlayStore, Geometry, Properties};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    /// One-acre square cell centered at (lon, 45.0).
    fn acre_cell(id: &str, lon: f64, yield_target: f64) -> CellFeature {
        let lat: f64 = 45.0;
        let side_m = SQUARE_METERS_PER_ACRE.sqrt();
        let half_lat = side_m / METERS_PER_DEGREE / 2.0;
        let half_lon = side_m / (METERS_PER_DEGREE * lat.to_radians().cos()) / 2.0;
        let ring = vec![
            [lon - half_lon, lat - half_lat],
            [lon + half_lon, lat - half_lat],
            [lon + half_lon, lat + half_lat],
            [lon - half_lon, lat + half_lat],
            [lon - half_lon, lat - half_lat],
        ];
        let mut props = Properties::new();
        props.set_text("h3_index", id);
        props.set_attribute(Attribute::YieldTarget, yield_target);
        CellFeature::new(Geometry::polygon(ring), props)
    }

    fn field() -> Vec<CellFeature> {
        vec![
            acre_cell("a", -93.000, 50.0),
            acre_cell("b", -93.001, 50.0),
            acre_cell("c", -93.002, 50.0),
        ]
    }

    #[test]
    fn base_only_totals() {
        let overlay = EditOverlayStore::new(Attribute::YieldTarget);
        let stats = aggregate(&field(), &overlay);
        assert_eq!(stats.cell_count, 3);
        assert_eq!(stats.edited_cells, 0);
        assert_close(stats.total_acres, 3.0, 1e-3);
        assert_close(stats.total_projected_yield, 150.0, 0.1);
    }

    #[test]
    fn edited_cell_counted_once_at_new_value() {
        let base = field();
        let mut overlay = EditOverlayStore::new(Attribute::YieldTarget);
        overlay.upsert(&base[1], 100.0);

        let stats = aggregate(&base, &overlay);
        assert_eq!(stats.cell_count, 3);
        assert_eq!(stats.edited_cells, 1);
        assert_close(stats.total_acres, 3.0, 1e-3);
        assert_close(stats.total_projected_yield, 200.0, 0.1);
        assert_eq!(stats.value_range, Some((50.0, 100.0)));
        assert_close(stats.mean_value.unwrap(), 200.0 / 3.0, 1e-3);
    }

    #[test]
    fn cells_without_value_add_area_only() {
        let mut base = field();
        base[0].properties = Properties::new();
        base[0].properties.set_text("h3_index", "a");
        let overlay = EditOverlayStore::new(Attribute::YieldTarget);
        let stats = aggregate(&base, &overlay);
        assert_close(stats.total_acres, 3.0, 1e-3);
        assert_close(stats.total_projected_yield, 100.0, 0.1);
    }

    #[test]
    fn empty_field_is_all_zero() {
        let overlay = EditOverlayStore::new(Attribute::YieldTarget);
        let stats = aggregate(&[], &overlay);
        assert_eq!(stats.total_acres, 0.0);
        assert_eq!(stats.mean_value, None);
        assert_eq!(stats.value_range, None);
    }
}
