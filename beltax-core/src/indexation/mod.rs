//! Bulk, date-effective uprating of monetary rule rows.
//!
//! An indexation closes every matching active bracket/parameter on the day
//! before the effective date and inserts replacement rows carrying the old
//! value multiplied by the indexation rate. Closed rows become permanent
//! history, so past taxes stay recomputable under the rules of their day.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RuleCache;
use crate::db::repository::{RepositoryError, RuleRepository};
use crate::models::{Region, TaxType};

/// Parameter keys holding references, ratios or coefficients rather than
/// money. These are copied unchanged by an indexation; only monetary values
/// are multiplied by the rate.
const NON_MONETARY_PARAMETER_KEYS: [&str; 7] = [
    "co2_reference_wltp",
    "mma_reference",
    "co2_correction_factor",
    "co2_correction_base",
    "energy_thermal",
    "energy_hybrid",
    "energy_plugin_hybrid",
];

/// Whether an indexation multiplies this parameter by the rate.
pub fn is_indexable_parameter(param_key: &str) -> bool {
    !NON_MONETARY_PARAMETER_KEYS.contains(&param_key)
}

/// New amount for an indexed bracket: `amount × rate`, scale 2, HALF_UP.
pub fn indexed_bracket_amount(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// New value for an indexed parameter: `value × rate`, scale 4, HALF_UP.
pub fn indexed_parameter_value(value: Decimal, rate: Decimal) -> Decimal {
    (value * rate).round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// One bulk indexation order.
///
/// `region`/`tax_type` left as `None` mean "all". A rate of 1.02 uprates by
/// +2%. When neither `include_brackets` nor `include_parameters` is set the
/// request covers both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexationRequest {
    pub region: Option<Region>,
    pub tax_type: Option<TaxType>,
    /// Multiplier applied to monetary values, e.g. 1.02 for +2%.
    pub rate: Decimal,
    /// First day on which the new rows apply.
    pub effective_date: NaiveDate,
    pub include_brackets: bool,
    pub include_parameters: bool,
}

impl IndexationRequest {
    /// Request covering every region, both tax types, brackets and
    /// parameters alike.
    pub fn new(rate: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            region: None,
            tax_type: None,
            rate,
            effective_date,
            include_brackets: true,
            include_parameters: true,
        }
    }

    /// Whether brackets are in scope, applying the both-by-default rule.
    pub fn brackets_in_scope(&self) -> bool {
        self.include_brackets || !self.include_parameters
    }

    /// Whether parameters are in scope, applying the both-by-default rule.
    pub fn parameters_in_scope(&self) -> bool {
        self.include_parameters || !self.include_brackets
    }

    /// Last day of validity stamped on the rows being closed.
    pub fn previous_day(&self) -> Result<NaiveDate, RepositoryError> {
        self.effective_date.pred_opt().ok_or_else(|| {
            RepositoryError::Database("effective date has no previous day".to_string())
        })
    }
}

/// Counts of rows created by one indexation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexationOutcome {
    pub brackets_created: u32,
    pub parameters_created: u32,
}

/// Applies indexations and keeps the lookup cache coherent.
///
/// The repository performs the close+insert batch in a single transaction;
/// the cache is invalidated only after that transaction has committed, so no
/// reader ever observes a half-committed rule set.
pub struct IndexationService {
    repository: Arc<dyn RuleRepository>,
    cache: Arc<RuleCache>,
}

impl IndexationService {
    pub fn new(repository: Arc<dyn RuleRepository>, cache: Arc<RuleCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn apply(
        &self,
        request: &IndexationRequest,
    ) -> Result<IndexationOutcome, RepositoryError> {
        info!(
            rate = %request.rate,
            effective_date = %request.effective_date,
            region = ?request.region,
            tax_type = ?request.tax_type,
            "applying indexation"
        );

        let outcome = self.repository.apply_indexation(request).await?;

        // Commit first, invalidate after.
        self.cache.invalidate_all();

        info!(
            brackets_created = outcome.brackets_created,
            parameters_created = outcome.parameters_created,
            "indexation applied"
        );
        Ok(outcome)
    }
}
