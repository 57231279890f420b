/// Numeric cell attributes carried in the property bag of every cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    /// Yield target, bushels per acre. The only attribute that can be painted.
    YieldTarget,
    SoilNitrogen,
    SoilPhosphorus,
    SoilPotassium,
    NitrogenRate,
    PhosphorusRate,
    PotassiumRate,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::YieldTarget,
        Attribute::SoilNitrogen,
        Attribute::SoilPhosphorus,
        Attribute::SoilPotassium,
        Attribute::NitrogenRate,
        Attribute::PhosphorusRate,
        Attribute::PotassiumRate,
    ];

    /// Property key in the source tiles.
    pub const fn column(self) -> &'static str {
        match self {
            Attribute::YieldTarget => "yield_target",
            Attribute::SoilNitrogen => "N_in_soil",
            Attribute::SoilPhosphorus => "P_in_soil",
            Attribute::SoilPotassium => "K_in_soil",
            Attribute::NitrogenRate => "N_to_apply",
            Attribute::PhosphorusRate => "P_to_apply",
            Attribute::PotassiumRate => "K_to_apply",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Attribute::YieldTarget => "bu/ac",
            Attribute::SoilNitrogen | Attribute::SoilPhosphorus | Attribute::SoilPotassium => {
                "ppm"
            }
            Attribute::NitrogenRate | Attribute::PhosphorusRate | Attribute::PotassiumRate => {
                "lbs/acre"
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Attribute::YieldTarget => "Yield target",
            Attribute::SoilNitrogen => "Soil nitrogen",
            Attribute::SoilPhosphorus => "Soil phosphorus",
            Attribute::SoilPotassium => "Soil potassium",
            Attribute::NitrogenRate => "Nitrogen to apply",
            Attribute::PhosphorusRate => "Phosphorus to apply",
            Attribute::PotassiumRate => "Potassium to apply",
        }
    }

    pub fn from_column(column: &str) -> Option<Attribute> {
        Self::ALL.into_iter().find(|a| a.column() == column)
    }

    pub const fn is_editable(self) -> bool {
        matches!(self, Attribute::YieldTarget)
    }

    /// The nutrient whose application rate this attribute is, if any.
    pub const fn application_nutrient(self) -> Option<Nutrient> {
        match self {
            Attribute::NitrogenRate => Some(Nutrient::Nitrogen),
            Attribute::PhosphorusRate => Some(Nutrient::Phosphorus),
            Attribute::PotassiumRate => Some(Nutrient::Potassium),
            _ => None,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Nutrient::Nitrogen, Nutrient::Phosphorus, Nutrient::Potassium];

    pub const fn in_soil(self) -> Attribute {
        match self {
            Nutrient::Nitrogen => Attribute::SoilNitrogen,
            Nutrient::Phosphorus => Attribute::SoilPhosphorus,
            Nutrient::Potassium => Attribute::SoilPotassium,
        }
    }

    pub const fn application(self) -> Attribute {
        match self {
            Nutrient::Nitrogen => Attribute::NitrogenRate,
            Nutrient::Phosphorus => Attribute::PhosphorusRate,
            Nutrient::Potassium => Attribute::PotassiumRate,
        }
    }

    /// Name of the prescription pass generated for this nutrient.
    pub const fn pass_name(self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "nitrogen pass",
            Nutrient::Phosphorus => "phosphorus pass",
            Nutrient::Potassium => "potassium pass",
        }
    }

    pub fn from_pass_name(name: &str) -> Option<Nutrient> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.pass_name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{Attribute, Nutrient};

    #[test]
    fn columns_resolve_back_to_attributes() {
        for attribute in Attribute::ALL {
            assert_eq!(Attribute::from_column(attribute.column()), Some(attribute));
        }
        assert_eq!(Attribute::from_column("h3_index"), None);
    }

    #[test]
    fn only_yield_target_is_editable() {
        let editable: Vec<_> = Attribute::ALL.into_iter().filter(|a| a.is_editable()).collect();
        assert_eq!(editable, vec![Attribute::YieldTarget]);
    }

    #[test]
    fn pass_names_are_case_insensitive() {
        assert_eq!(Nutrient::from_pass_name("Nitrogen Pass"), Some(Nutrient::Nitrogen));
        assert_eq!(Nutrient::from_pass_name(" potassium pass"), Some(Nutrient::Potassium));
        assert_eq!(Nutrient::from_pass_name("lime pass"), None);
    }
}
