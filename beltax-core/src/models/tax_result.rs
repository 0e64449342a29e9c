use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Breakdown, Region, TaxType};

/// Outcome of a single tax calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub region: Region,
    pub tax_type: TaxType,
    /// Final amount owed, scale 2 (HALF_UP).
    pub amount: Decimal,
    pub is_exempt: bool,
    pub exemption_reason: Option<String>,
    /// Named intermediate values, in formula order.
    pub breakdown: Breakdown,
}

impl TaxAssessment {
    /// A full exemption: zero amount, no breakdown.
    pub fn exempt(region: Region, tax_type: TaxType, reason: String) -> Self {
        Self {
            region,
            tax_type,
            amount: Decimal::ZERO,
            is_exempt: true,
            exemption_reason: Some(reason),
            breakdown: Breakdown::new(),
        }
    }
}

/// Both taxes for one vehicle and region, computed against the same
/// rule-version date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedAssessment {
    pub tmc: TaxAssessment,
    pub annual: TaxAssessment,
}
