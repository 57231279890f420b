//! Piecewise-linear color ramps and the per-attribute legends built on them.

use foundation::Rgba;
use scene::Attribute;

/// Fill alpha for base cells.
pub const BASE_ALPHA: f32 = 0.8;
/// Fill alpha for highlighted cells and painted edits.
pub const EMPHASIS_ALPHA: f32 = 1.0;
/// Fill alpha for prescription zones drawn over the base cells.
pub const PRESCRIPTION_ALPHA: f32 = 0.6;

pub const HOVER_COLOR: Rgba = Rgba::new(1.0, 0.92, 0.23, 1.0);
pub const NO_DATA_COLOR: Rgba = Rgba::new(0.6, 0.6, 0.6, 0.4);
pub const BACKDROP_COLOR: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.55);

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleError {
    TooFewStops { found: usize },
    LengthMismatch { stops: usize, colors: usize },
    NotIncreasing { index: usize, previous: f64, value: f64 },
    NonFinite { index: usize },
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::TooFewStops { found } => {
                write!(f, "color table needs at least 2 stops, found {found}")
            }
            ScaleError::LengthMismatch { stops, colors } => {
                write!(f, "color table has {stops} stops but {colors} colors")
            }
            ScaleError::NotIncreasing {
                index,
                previous,
                value,
            } => write!(
                f,
                "color table stops must increase: stop {index} ({value}) follows {previous}"
            ),
            ScaleError::NonFinite { index } => write!(f, "color table stop {index} is not finite"),
        }
    }
}

impl std::error::Error for ScaleError {}

/// Validated color ramp. Construction is the only place a table can fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    stops: Vec<f64>,
    colors: Vec<Rgba>,
}

impl ColorTable {
    pub fn new(stops: Vec<f64>, colors: Vec<Rgba>) -> Result<Self, ScaleError> {
        if stops.len() < 2 {
            return Err(ScaleError::TooFewStops { found: stops.len() });
        }
        if stops.len() != colors.len() {
            return Err(ScaleError::LengthMismatch {
                stops: stops.len(),
                colors: colors.len(),
            });
        }
        for (i, s) in stops.iter().enumerate() {
            if !s.is_finite() {
                return Err(ScaleError::NonFinite { index: i });
            }
        }
        for i in 1..stops.len() {
            if stops[i] <= stops[i - 1] {
                return Err(ScaleError::NotIncreasing {
                    index: i,
                    previous: stops[i - 1],
                    value: stops[i],
                });
            }
        }
        Ok(Self { stops, colors })
    }

    pub fn from_pairs(pairs: &[(f64, Rgba)]) -> Result<Self, ScaleError> {
        Self::new(
            pairs.iter().map(|(s, _)| *s).collect(),
            pairs.iter().map(|(_, c)| *c).collect(),
        )
    }

    pub fn stops(&self) -> &[f64] {
        &self.stops
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// `(min, max)` of the domain.
    pub fn domain(&self) -> (f64, f64) {
        (self.stops[0], self.stops[self.stops.len() - 1])
    }
}

/// Color for `value` on `table`, clamped to the table's domain.
///
/// Alpha comes from the lower color of the bracketing segment; callers set the
/// alpha their layer needs with [`Rgba::with_alpha`].
pub fn color_for(value: f64, table: &ColorTable) -> Rgba {
    let stops = table.stops();
    let colors = table.colors();
    let last = stops.len() - 1;

    // NaN lands here too.
    if !(value > stops[0]) {
        return colors[0];
    }
    if value >= stops[last] {
        return colors[last];
    }

    // First stop strictly greater than value; value > stops[0] so upper >= 1.
    let upper = stops.partition_point(|s| *s <= value);
    let lower = upper - 1;
    let t = (value - stops[lower]) / (stops[upper] - stops[lower]);
    colors[lower].lerp_rgb(colors[upper], t as f32)
}

const YIELD_RAMP: [(f64, Rgba); 3] = [
    (120.0, Rgba::from_rgb8(215, 48, 39)),
    (180.0, Rgba::from_rgb8(254, 224, 139)),
    (240.0, Rgba::from_rgb8(26, 152, 80)),
];
const SOIL_N_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(247, 252, 185)),
    (40.0, Rgba::from_rgb8(0, 104, 55)),
];
const SOIL_P_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(255, 247, 236)),
    (100.0, Rgba::from_rgb8(179, 0, 0)),
];
const SOIL_K_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(252, 251, 253)),
    (300.0, Rgba::from_rgb8(84, 39, 143)),
];
const N_RATE_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(247, 251, 255)),
    (300.0, Rgba::from_rgb8(8, 48, 107)),
];
const P_RATE_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(255, 245, 235)),
    (180.0, Rgba::from_rgb8(166, 54, 3)),
];
const K_RATE_RAMP: [(f64, Rgba); 2] = [
    (0.0, Rgba::from_rgb8(252, 251, 253)),
    (200.0, Rgba::from_rgb8(63, 0, 125)),
];

fn ramp(attribute: Attribute) -> &'static [(f64, Rgba)] {
    match attribute {
        Attribute::YieldTarget => &YIELD_RAMP,
        Attribute::SoilNitrogen => &SOIL_N_RAMP,
        Attribute::SoilPhosphorus => &SOIL_P_RAMP,
        Attribute::SoilPotassium => &SOIL_K_RAMP,
        Attribute::NitrogenRate => &N_RATE_RAMP,
        Attribute::PhosphorusRate => &P_RATE_RAMP,
        Attribute::PotassiumRate => &K_RATE_RAMP,
    }
}

/// The legend color table for `attribute`.
pub fn legend_for(attribute: Attribute) -> Result<ColorTable, ScaleError> {
    ColorTable::from_pairs(ramp(attribute))
}

#[cfg(test)]
mod tests {
    use super::{ColorTable, ScaleError, color_for, legend_for};
    use foundation::Rgba;
    use scene::Attribute;

    const RED: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);
    const YELLOW: Rgba = Rgba::new(1.0, 1.0, 0.0, 1.0);
    const GREEN: Rgba = Rgba::new(0.0, 1.0, 0.0, 1.0);

    fn three_stop() -> ColorTable {
        ColorTable::new(vec![100.0, 150.0, 200.0], vec![RED, YELLOW, GREEN]).unwrap()
    }

    #[test]
    fn clamps_below_and_above_domain() {
        let t = three_stop();
        for v in [-1e9, 0.0, 99.999, 100.0] {
            assert_eq!(color_for(v, &t), RED, "value {v}");
        }
        for v in [200.0, 200.001, 1e9, f64::INFINITY] {
            assert_eq!(color_for(v, &t), GREEN, "value {v}");
        }
    }

    #[test]
    fn nan_maps_to_first_color() {
        assert_eq!(color_for(f64::NAN, &three_stop()), RED);
    }

    #[test]
    fn interpolates_within_each_segment() {
        let t = three_stop();
        assert_eq!(color_for(125.0, &t), Rgba::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(color_for(150.0, &t), YELLOW);
        assert_eq!(color_for(175.0, &t), Rgba::new(0.5, 1.0, 0.0, 1.0));
    }

    #[test]
    fn two_stop_tables_share_the_code_path() {
        let t = ColorTable::new(vec![0.0, 10.0], vec![Rgba::BLACK, Rgba::WHITE]).unwrap();
        assert_eq!(color_for(5.0, &t), Rgba::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_eq!(
            ColorTable::new(vec![1.0], vec![RED]),
            Err(ScaleError::TooFewStops { found: 1 })
        );
        assert_eq!(
            ColorTable::new(vec![1.0, 2.0], vec![RED]),
            Err(ScaleError::LengthMismatch { stops: 2, colors: 1 })
        );
        assert!(matches!(
            ColorTable::new(vec![1.0, 1.0], vec![RED, GREEN]),
            Err(ScaleError::NotIncreasing { index: 1, .. })
        ));
        assert!(matches!(
            ColorTable::new(vec![3.0, 2.0, 4.0], vec![RED, GREEN, YELLOW]),
            Err(ScaleError::NotIncreasing { index: 1, .. })
        ));
        assert_eq!(
            ColorTable::new(vec![0.0, f64::NAN], vec![RED, GREEN]),
            Err(ScaleError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn every_attribute_has_a_valid_legend() {
        for attribute in Attribute::ALL {
            let t = legend_for(attribute).unwrap();
            let (min, max) = t.domain();
            assert!(min < max, "{attribute}");
        }
        assert_eq!(legend_for(Attribute::YieldTarget).unwrap().stops().len(), 3);
    }
}
