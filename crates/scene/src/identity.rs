//! Stable identities for cell features.
//!
//! Resolution order: native feature id, then the cell's spatial index, then a
//! content hash of the geometry. The hash covers every coordinate of every ring
//! rounded to 1e-7 degrees (about 1 cm), so re-rendered copies of the same cell
//! resolve to the same key even when float formatting differs between passes.

use std::fmt::Write as _;

use crate::feature::{CellFeature, Geometry};

/// Prefix marking identities derived from geometry.
pub const DERIVED_PREFIX: &str = "geom:";
/// Hex digits kept from the geometry hash (64 bits).
pub const DERIVED_HEX_LEN: usize = 16;

const COORD_SCALE: f64 = 1e7;

pub fn identity_for(feature: &CellFeature) -> String {
    if let Some(id) = feature.id.as_deref().filter(|id| !id.trim().is_empty()) {
        return id.to_string();
    }
    if let Some(cell) = feature.cell_id() {
        return cell.to_string();
    }
    geometry_identity(&feature.geometry)
}

pub fn geometry_identity(geometry: &Geometry) -> String {
    let canonical = canonical_coordinates(geometry);
    let hash = blake3::hash(canonical.as_bytes());
    let hex = hash.to_hex();
    format!("{DERIVED_PREFIX}{}", &hex.as_str()[..DERIVED_HEX_LEN])
}

fn canonical_coordinates(geometry: &Geometry) -> String {
    let mut out = String::new();
    for (pi, rings) in geometry.polygons().into_iter().enumerate() {
        if pi > 0 {
            out.push('#');
        }
        for (ri, ring) in rings.iter().enumerate() {
            if ri > 0 {
                out.push('|');
            }
            for p in ring {
                let lon = quantize(p[0]);
                let lat = quantize(p[1]);
                let _ = write!(out, "{lon},{lat};");
            }
        }
    }
    out
}

fn quantize(v: f64) -> i64 {
    // -0.0 and 0.0 must agree.
    let q = (v * COORD_SCALE).round() as i64;
    if q == 0 { 0 } else { q }
}
