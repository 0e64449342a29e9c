use serde::{Deserialize, Serialize};

/// The two Belgian vehicle taxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    /// Taxe de Mise en Circulation — one-time registration tax
    /// (named BIV in the Flemish legislation).
    Tmc,
    /// Recurring annual circulation tax.
    Annual,
}

impl TaxType {
    pub const ALL: [TaxType; 2] = [TaxType::Tmc, TaxType::Annual];

    /// Stable lowercase code, matching the values stored in rule rows.
    pub fn code(&self) -> &'static str {
        match self {
            TaxType::Tmc => "tmc",
            TaxType::Annual => "annual",
        }
    }

    pub fn parse(code: &str) -> Option<TaxType> {
        match code {
            "tmc" => Some(TaxType::Tmc),
            "annual" => Some(TaxType::Annual),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
