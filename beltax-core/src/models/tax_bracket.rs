use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Region, TaxType};

/// A range-keyed rule row mapping a numeric input band to an amount.
///
/// Example: for the Wallonia TMC, a power of 0..=70 kW maps to a base amount
/// of 61.50 EUR. Brackets are identified by:
///   - `region` + `tax_type`: which tax they feed;
///   - `bracket_key`: the kind of band (`"power_kw"`, `"fiscal_hp"`,
///     `"energy_electric_kw"`, `"luchtcomponent_diesel"`, ...);
///   - `min_value`/`max_value`: the inclusive value band;
///   - `valid_from`/`valid_to`: the validity window — rates change over time
///     and history must stay queryable.
///
/// Rule rows are append-only: a row is closed by setting `valid_to` exactly
/// once, and replacement rates are inserted as new rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub id: i64,
    pub region: Region,
    pub tax_type: TaxType,
    pub bracket_key: String,
    /// Lower bound of the band, inclusive.
    pub min_value: i32,
    /// Upper bound of the band, inclusive. `None` means unbounded.
    pub max_value: Option<i32>,
    /// Amount (or coefficient) for this band, scale 2.
    pub amount: Decimal,
    pub valid_from: NaiveDate,
    /// Last day of validity, inclusive. `None` means currently active.
    pub valid_to: Option<NaiveDate>,
}

impl TaxBracket {
    /// Whether `value` falls inside this band.
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min_value && self.max_value.is_none_or(|max| value <= max)
    }

    /// Whether this row is the active version on `date`.
    pub fn is_valid_at(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Insert form of [`TaxBracket`] (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxBracket {
    pub region: Region,
    pub tax_type: TaxType,
    pub bracket_key: String,
    pub min_value: i32,
    pub max_value: Option<i32>,
    pub amount: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}
