use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Region, TaxType};

/// A single named scalar used inside a tax formula.
///
/// Unlike [`super::TaxBracket`] rows, parameters carry one value rather than
/// a band. Examples: `co2_reference_wltp` = 136, `mma_reference` = 1838,
/// `min_amount` = 50.00, `lpg_reduction` = 298.00, `energy_hybrid` = 0.8.
///
/// Scale 4, so the same column holds amounts (50.00) and coefficients
/// (0.0030). Unique per (region, tax_type, param_key, valid_from); versioned
/// append-only like every rule kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxParameter {
    pub id: i64,
    pub region: Region,
    pub tax_type: TaxType,
    pub param_key: String,
    pub value: Decimal,
    pub valid_from: NaiveDate,
    /// Last day of validity, inclusive. `None` means currently active.
    pub valid_to: Option<NaiveDate>,
}

impl TaxParameter {
    pub fn is_valid_at(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Insert form of [`TaxParameter`] (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxParameter {
    pub region: Region,
    pub tax_type: TaxType,
    pub param_key: String,
    pub value: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}
