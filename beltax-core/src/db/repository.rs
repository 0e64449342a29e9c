use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::indexation::{IndexationOutcome, IndexationRequest};
use crate::models::{
    AgeCoefficient, NewAgeCoefficient, NewTaxBracket, NewTaxExemption, NewTaxParameter, Region,
    TaxBracket, TaxExemption, TaxParameter, TaxType,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Optional region/tax-type filter for bulk queries. `None` matches all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub region: Option<Region>,
    pub tax_type: Option<TaxType>,
}

impl RuleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn scoped(region: Option<Region>, tax_type: Option<TaxType>) -> Self {
        Self { region, tax_type }
    }
}

/// Storage of the four versioned rule kinds, queryable "as of" a date.
///
/// All rule rows are append-only: new versions are inserted, old versions are
/// closed by setting `valid_to` exactly once. Nothing is ever updated in
/// place, so a tax can be recomputed exactly as it was defined on any past
/// date.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    // ── brackets ─────────────────────────────────────────────────────────

    /// The bracket whose value band contains `value` and whose validity
    /// window contains `date`.
    ///
    /// Active bands for one (region, tax_type, bracket_key) are expected not
    /// to overlap; that invariant is administrative, not enforced here, and
    /// which row wins when it is violated is unspecified. Backends should at
    /// least order deterministically.
    async fn find_matching_bracket(
        &self,
        region: Region,
        tax_type: TaxType,
        bracket_key: &str,
        value: i32,
        date: NaiveDate,
    ) -> Result<Option<TaxBracket>, RepositoryError>;

    async fn insert_bracket(&self, bracket: NewTaxBracket) -> Result<TaxBracket, RepositoryError>;

    async fn list_brackets(&self, filter: RuleFilter) -> Result<Vec<TaxBracket>, RepositoryError>;

    /// Close a bracket version by setting `valid_to`. Fails with `NotFound`
    /// if the row does not exist or was already closed.
    async fn close_bracket(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError>;

    async fn delete_bracket(&self, id: i64) -> Result<(), RepositoryError>;

    // ── parameters ───────────────────────────────────────────────────────

    /// The parameter version active on `date`, if any.
    async fn find_parameter(
        &self,
        region: Region,
        tax_type: TaxType,
        param_key: &str,
        date: NaiveDate,
    ) -> Result<Option<TaxParameter>, RepositoryError>;

    async fn insert_parameter(
        &self,
        parameter: NewTaxParameter,
    ) -> Result<TaxParameter, RepositoryError>;

    async fn list_parameters(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxParameter>, RepositoryError>;

    /// Close a parameter version by setting `valid_to`. Fails with `NotFound`
    /// if the row does not exist or was already closed.
    async fn close_parameter(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError>;

    async fn delete_parameter(&self, id: i64) -> Result<(), RepositoryError>;

    // ── age coefficients ─────────────────────────────────────────────────

    /// The coefficient for `vehicle_age_years` active on `date`, if any.
    /// Callers clamp the age before lookup; the repository matches exactly.
    async fn find_age_coefficient(
        &self,
        region: Region,
        tax_type: TaxType,
        vehicle_age_years: i32,
        date: NaiveDate,
    ) -> Result<Option<AgeCoefficient>, RepositoryError>;

    async fn insert_age_coefficient(
        &self,
        coefficient: NewAgeCoefficient,
    ) -> Result<AgeCoefficient, RepositoryError>;

    async fn list_age_coefficients(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<AgeCoefficient>, RepositoryError>;

    /// Close a coefficient version by setting `valid_to`. Fails with
    /// `NotFound` if the row does not exist or was already closed.
    async fn close_age_coefficient(
        &self,
        id: i64,
        valid_to: NaiveDate,
    ) -> Result<(), RepositoryError>;

    async fn delete_age_coefficient(&self, id: i64) -> Result<(), RepositoryError>;

    // ── exemptions ───────────────────────────────────────────────────────

    /// Whether an exemption row with `condition_key` is valid on `date`.
    async fn exemption_exists(
        &self,
        region: Region,
        tax_type: TaxType,
        condition_key: &str,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError>;

    async fn insert_exemption(
        &self,
        exemption: NewTaxExemption,
    ) -> Result<TaxExemption, RepositoryError>;

    async fn list_exemptions(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxExemption>, RepositoryError>;

    /// Close an exemption by setting `valid_to`. Fails with `NotFound` if the
    /// row does not exist or was already closed.
    async fn close_exemption(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError>;

    async fn delete_exemption(&self, id: i64) -> Result<(), RepositoryError>;

    // ── indexation ───────────────────────────────────────────────────────

    /// Close every matching active bracket/parameter on the day before the
    /// request's effective date and insert rate-adjusted replacements, all
    /// inside one transaction. Partial failure must roll back completely so
    /// no date is ever left without a covering rule row.
    async fn apply_indexation(
        &self,
        request: &IndexationRequest,
    ) -> Result<IndexationOutcome, RepositoryError>;
}
