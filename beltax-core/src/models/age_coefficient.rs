use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Region, TaxType};

/// Degressive multiplier applied to the TMC as a vehicle ages.
///
/// A new vehicle (0 years) pays the full amount (coefficient 1.0000); the
/// coefficient steps down each year until 15+ years, where 0.0000 means the
/// vehicle is exempt. Ages above 15 are clamped to 15 before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeCoefficient {
    pub id: i64,
    pub region: Region,
    pub tax_type: TaxType,
    /// Vehicle age in whole years (0 = new), 0..=15.
    pub vehicle_age_years: i32,
    /// Multiplier in [0, 1], scale 4.
    pub coefficient: Decimal,
    pub valid_from: NaiveDate,
    /// Last day of validity, inclusive. `None` means currently active.
    pub valid_to: Option<NaiveDate>,
}

impl AgeCoefficient {
    pub fn is_valid_at(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Insert form of [`AgeCoefficient`] (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgeCoefficient {
    pub region: Region,
    pub tax_type: TaxType,
    pub vehicle_age_years: i32,
    pub coefficient: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}
