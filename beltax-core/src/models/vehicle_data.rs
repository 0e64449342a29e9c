use serde::{Deserialize, Serialize};

use super::{EuroNorm, FuelType};

/// Normalized vehicle characteristics consumed by the calculation engine.
///
/// Produced upstream from a catalog variant or a free-form submission; the
/// engine is indifferent to the origin. `power_kw` and `fiscal_hp` default to
/// 0 when the source did not provide them, the optional fields stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleData {
    /// Engine power in kW.
    pub power_kw: i32,
    /// Belgian fiscal horsepower, derived from displacement.
    pub fiscal_hp: i32,
    pub fuel: FuelType,
    pub euro_norm: Option<EuroNorm>,
    /// WLTP-cycle CO2 emissions in g/km.
    pub co2_wltp: Option<i32>,
    /// NEDC-cycle CO2 emissions in g/km (pre-2021 registrations).
    pub co2_nedc: Option<i32>,
    /// Maximum authorized mass in kg.
    pub mma_kg: Option<i32>,
}

impl VehicleData {
    pub fn new(power_kw: i32, fiscal_hp: i32, fuel: FuelType) -> Self {
        Self {
            power_kw,
            fiscal_hp,
            fuel,
            euro_norm: None,
            co2_wltp: None,
            co2_nedc: None,
            mma_kg: None,
        }
    }

    /// WLTP CO2 if present and positive.
    pub fn positive_co2_wltp(&self) -> Option<i32> {
        self.co2_wltp.filter(|co2| *co2 > 0)
    }

    /// NEDC CO2 if present and positive.
    pub fn positive_co2_nedc(&self) -> Option<i32> {
        self.co2_nedc.filter(|co2| *co2 > 0)
    }
}
