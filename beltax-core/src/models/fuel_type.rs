use serde::{Deserialize, Serialize};

/// Fuel / energy type of a vehicle.
///
/// The codes returned by [`FuelType::code`] are stored verbatim in exemption
/// condition keys (`"fuel_" + code`), so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    /// GPL (liquefied petroleum gas).
    Lpg,
    /// GNC (compressed natural gas).
    Cng,
    HybridPetrol,
    HybridDiesel,
    PlugInHybridPetrol,
    PlugInHybridDiesel,
    Electric,
    Hydrogen,
}

impl FuelType {
    pub const ALL: [FuelType; 10] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Lpg,
        FuelType::Cng,
        FuelType::HybridPetrol,
        FuelType::HybridDiesel,
        FuelType::PlugInHybridPetrol,
        FuelType::PlugInHybridDiesel,
        FuelType::Electric,
        FuelType::Hydrogen,
    ];

    /// Stable lowercase code, matching the values stored in rule rows and
    /// exemption condition keys.
    pub fn code(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Lpg => "lpg",
            FuelType::Cng => "cng",
            FuelType::HybridPetrol => "hybrid_petrol",
            FuelType::HybridDiesel => "hybrid_diesel",
            FuelType::PlugInHybridPetrol => "plug_in_hybrid_petrol",
            FuelType::PlugInHybridDiesel => "plug_in_hybrid_diesel",
            FuelType::Electric => "electric",
            FuelType::Hydrogen => "hydrogen",
        }
    }

    pub fn parse(code: &str) -> Option<FuelType> {
        FuelType::ALL.into_iter().find(|fuel| fuel.code() == code)
    }

    /// Electric and hydrogen vehicles, eligible for zero-emission treatment.
    pub fn is_zero_emission(&self) -> bool {
        matches!(self, FuelType::Electric | FuelType::Hydrogen)
    }

    /// Any hybrid drivetrain, plug-in or not.
    pub fn is_hybrid(&self) -> bool {
        matches!(
            self,
            FuelType::HybridPetrol
                | FuelType::HybridDiesel
                | FuelType::PlugInHybridPetrol
                | FuelType::PlugInHybridDiesel
        )
    }

    /// Fuels taxed on the diesel air-quality tables in Flanders.
    pub fn is_diesel_family(&self) -> bool {
        matches!(
            self,
            FuelType::Diesel | FuelType::HybridDiesel | FuelType::PlugInHybridDiesel
        )
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_roundtrips_every_code() {
        for fuel in FuelType::ALL {
            assert_eq!(FuelType::parse(fuel.code()), Some(fuel));
        }
    }

    #[test]
    fn zero_emission_covers_electric_and_hydrogen_only() {
        let zero: Vec<_> = FuelType::ALL
            .into_iter()
            .filter(FuelType::is_zero_emission)
            .collect();
        assert_eq!(zero, vec![FuelType::Electric, FuelType::Hydrogen]);
    }

    #[test]
    fn hybrid_covers_all_four_hybrid_variants() {
        let hybrids: Vec<_> = FuelType::ALL.into_iter().filter(FuelType::is_hybrid).collect();
        assert_eq!(
            hybrids,
            vec![
                FuelType::HybridPetrol,
                FuelType::HybridDiesel,
                FuelType::PlugInHybridPetrol,
                FuelType::PlugInHybridDiesel,
            ]
        );
    }

    #[test]
    fn diesel_family_includes_plug_in_hybrid_diesel() {
        assert!(FuelType::PlugInHybridDiesel.is_diesel_family());
        assert!(!FuelType::PlugInHybridPetrol.is_diesel_family());
    }
}
