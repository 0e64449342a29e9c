use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Region, TaxType};

/// A full-exemption condition.
///
/// The presence of a matching, date-valid row means "exempt"; absence means
/// "not exempt". No amount is stored. Condition keys follow the
/// `"criterion_value"` format, e.g. `"fuel_electric"`, `"fuel_hydrogen"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxExemption {
    pub id: i64,
    pub region: Region,
    pub tax_type: TaxType,
    pub condition_key: String,
    pub valid_from: NaiveDate,
    /// Last day of validity, inclusive. `None` means currently active.
    pub valid_to: Option<NaiveDate>,
}

impl TaxExemption {
    pub fn is_valid_at(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Insert form of [`TaxExemption`] (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxExemption {
    pub region: Region,
    pub tax_type: TaxType,
    pub condition_key: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}
