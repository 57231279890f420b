//! Application-rate recommendations derived from a cell's yield target.
//!
//! Removal factors are pounds of nutrient per bushel of corn. Nitrogen is not
//! floored at zero; phosphorus and potassium are, since surplus soil P/K is not
//! credited back.

use scene::{Attribute, Nutrient, Properties};

pub const fn removal_per_bushel(nutrient: Nutrient) -> f64 {
    match nutrient {
        Nutrient::Nitrogen => 1.2,
        Nutrient::Phosphorus => 0.76,
        Nutrient::Potassium => 0.84,
    }
}

pub fn needed(nutrient: Nutrient, yield_target: f64) -> f64 {
    yield_target * removal_per_bushel(nutrient)
}

pub fn to_apply(nutrient: Nutrient, yield_target: f64, in_soil: f64) -> f64 {
    let rate = needed(nutrient, yield_target) - in_soil;
    match nutrient {
        Nutrient::Nitrogen => rate,
        Nutrient::Phosphorus | Nutrient::Potassium => rate.max(0.0),
    }
}

/// Rewrites the three application rates in `props` from its yield target.
/// Missing soil levels count as zero. Without a yield target nothing changes.
pub fn apply_recommendations(props: &mut Properties) {
    let Some(yield_target) = props.attribute(Attribute::YieldTarget) else {
        return;
    };
    for nutrient in Nutrient::ALL {
        let in_soil = props.attribute(nutrient.in_soil()).unwrap_or(0.0);
        props.set_attribute(
            nutrient.application(),
            to_apply(nutrient, yield_target, in_soil),
        );
    }
}
