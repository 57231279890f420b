//! Planar area estimation for field-sized parcels.
//!
//! Coordinates are `[lon, lat]` in degrees. The ring is projected onto a local
//! equirectangular plane using the mean latitude of its vertices, so results
//! drift for parcels that span many kilometers north-south or sit close to the
//! poles. Cells and fields are a few hectares at most, where the error stays
//! well under a percent.

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;
/// Square meters in one international acre.
pub const SQUARE_METERS_PER_ACRE: f64 = 4_046.856_422_4;

/// Estimated area of `ring` in acres.
///
/// The ring may or may not repeat its first vertex at the end. Rings with fewer
/// than three distinct vertices have no area and return `0.0`.
pub fn estimate_acres(ring: &[[f64; 2]]) -> f64 {
    estimate_square_meters(ring) / SQUARE_METERS_PER_ACRE
}

/// Estimated area of `ring` in square meters.
pub fn estimate_square_meters(ring: &[[f64; 2]]) -> f64 {
    let points = open_ring(ring);
    if distinct_vertices(points) < 3 {
        return 0.0;
    }

    let mean_lat = points.iter().map(|p| p[1]).sum::<f64>() / points.len() as f64;
    let lon_scale = mean_lat.to_radians().cos();

    let degree_area = shoelace(points).abs();
    degree_area * METERS_PER_DEGREE * (METERS_PER_DEGREE * lon_scale)
}

/// Signed shoelace area in squared degrees. Counter-clockwise rings are positive.
pub fn shoelace(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a[0] * b[1] - b[0] * a[1];
    }
    twice * 0.5
}

// Slice without the closing duplicate, if present.
fn open_ring(ring: &[[f64; 2]]) -> &[[f64; 2]] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() >= 2 && same_point(*first, *last) => {
            &ring[..ring.len() - 1]
        }
        _ => ring,
    }
}

fn distinct_vertices(points: &[[f64; 2]]) -> usize {
    let mut seen: Vec<[f64; 2]> = Vec::with_capacity(points.len());
    for p in points {
        if !seen.iter().any(|q| same_point(*q, *p)) {
            seen.push(*p);
            if seen.len() >= 3 {
                break;
            }
        }
    }
    seen.len()
}

fn same_point(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12
}
