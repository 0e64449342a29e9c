use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use super::cache::{CachedValue, LookupKey};
use super::RuleCache;
use crate::db::repository::{RepositoryError, RuleRepository};
use crate::models::{FuelType, Region, TaxBracket, TaxType};

/// Vehicle ages above this are all taxed on the same (terminal) coefficient.
const MAX_COEFFICIENT_AGE: i32 = 15;

/// Read-through façade over the rule store.
///
/// Every operation takes a `date` meaning "the rule version active on this
/// date" and memoizes its result in the shared [`RuleCache`] keyed by the
/// full argument tuple. Writers invalidate the cache after committing, so a
/// lookup never observes a half-committed rule set.
pub struct RuleResolver {
    repository: Arc<dyn RuleRepository>,
    cache: Arc<RuleCache>,
}

impl RuleResolver {
    pub fn new(repository: Arc<dyn RuleRepository>, cache: Arc<RuleCache>) -> Self {
        Self { repository, cache }
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// The bracket whose band contains `value`, as of `date`.
    pub async fn find_bracket(
        &self,
        region: Region,
        tax_type: TaxType,
        bracket_key: &str,
        value: i32,
        date: NaiveDate,
    ) -> Result<Option<TaxBracket>, RepositoryError> {
        let key = LookupKey::Bracket {
            region,
            tax_type,
            bracket_key: bracket_key.to_string(),
            value,
            date,
        };
        if let Some(CachedValue::Bracket(bracket)) = self.cache.get(&key) {
            return Ok(bracket);
        }

        let bracket = self
            .repository
            .find_matching_bracket(region, tax_type, bracket_key, value, date)
            .await?;
        debug!(%region, %tax_type, bracket_key, value, %date, found = bracket.is_some(), "bracket lookup");
        self.cache.put(key, CachedValue::Bracket(bracket.clone()));
        Ok(bracket)
    }

    /// Amount of the matching bracket, or `default` when no band covers
    /// `value` on `date`.
    pub async fn bracket_amount_or(
        &self,
        region: Region,
        tax_type: TaxType,
        bracket_key: &str,
        value: i32,
        date: NaiveDate,
        default: Decimal,
    ) -> Result<Decimal, RepositoryError> {
        Ok(self
            .find_bracket(region, tax_type, bracket_key, value, date)
            .await?
            .map(|bracket| bracket.amount)
            .unwrap_or(default))
    }

    /// The scalar parameter active on `date`, if any.
    pub async fn parameter(
        &self,
        region: Region,
        tax_type: TaxType,
        param_key: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let key = LookupKey::Parameter {
            region,
            tax_type,
            param_key: param_key.to_string(),
            date,
        };
        if let Some(CachedValue::Scalar(value)) = self.cache.get(&key) {
            return Ok(value);
        }

        let value = self
            .repository
            .find_parameter(region, tax_type, param_key, date)
            .await?
            .map(|parameter| parameter.value);
        debug!(%region, %tax_type, param_key, %date, found = value.is_some(), "parameter lookup");
        self.cache.put(key, CachedValue::Scalar(value));
        Ok(value)
    }

    /// The scalar parameter active on `date`, or `default` when absent.
    pub async fn parameter_or(
        &self,
        region: Region,
        tax_type: TaxType,
        param_key: &str,
        date: NaiveDate,
        default: Decimal,
    ) -> Result<Decimal, RepositoryError> {
        Ok(self
            .parameter(region, tax_type, param_key, date)
            .await?
            .unwrap_or(default))
    }

    /// Age coefficient for a vehicle of `vehicle_age_years`, as of `date`.
    /// Ages above 15 share the terminal coefficient.
    pub async fn age_coefficient(
        &self,
        region: Region,
        tax_type: TaxType,
        vehicle_age_years: i32,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let age_years = vehicle_age_years.min(MAX_COEFFICIENT_AGE);
        let key = LookupKey::AgeCoefficient {
            region,
            tax_type,
            age_years,
            date,
        };
        if let Some(CachedValue::Scalar(value)) = self.cache.get(&key) {
            return Ok(value);
        }

        let value = self
            .repository
            .find_age_coefficient(region, tax_type, age_years, date)
            .await?
            .map(|coefficient| coefficient.coefficient);
        self.cache.put(key, CachedValue::Scalar(value));
        Ok(value)
    }

    /// Age coefficient with a caller-supplied default for missing rows.
    pub async fn age_coefficient_or(
        &self,
        region: Region,
        tax_type: TaxType,
        vehicle_age_years: i32,
        date: NaiveDate,
        default: Decimal,
    ) -> Result<Decimal, RepositoryError> {
        Ok(self
            .age_coefficient(region, tax_type, vehicle_age_years, date)
            .await?
            .unwrap_or(default))
    }

    /// Whether a `"fuel_<code>"` exemption row is valid on `date`.
    pub async fn is_exempt(
        &self,
        region: Region,
        tax_type: TaxType,
        fuel: FuelType,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let condition_key = format!("fuel_{}", fuel.code());
        let key = LookupKey::Exemption {
            region,
            tax_type,
            condition_key: condition_key.clone(),
            date,
        };
        if let Some(CachedValue::Flag(exempt)) = self.cache.get(&key) {
            return Ok(exempt);
        }

        let exempt = self
            .repository
            .exemption_exists(region, tax_type, &condition_key, date)
            .await?;
        self.cache.put(key, CachedValue::Flag(exempt));
        Ok(exempt)
    }

    /// Exemption check restricted to zero-emission fuels. Any other fuel is
    /// "not exempt" without touching the store.
    pub async fn is_zero_emission_exempt(
        &self,
        region: Region,
        tax_type: TaxType,
        fuel: FuelType,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        if !fuel.is_zero_emission() {
            return Ok(false);
        }
        self.is_exempt(region, tax_type, fuel, date).await
    }

    /// Floor for the final amount. Zero when no `min_amount` row is active.
    pub async fn min_amount(
        &self,
        region: Region,
        tax_type: TaxType,
        date: NaiveDate,
    ) -> Result<Decimal, RepositoryError> {
        self.parameter_or(region, tax_type, "min_amount", date, Decimal::ZERO)
            .await
    }

    /// Ceiling for the final amount. Absence means unbounded.
    pub async fn max_amount(
        &self,
        region: Region,
        tax_type: TaxType,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RepositoryError> {
        self.parameter(region, tax_type, "max_amount", date).await
    }

    /// Fiscal horsepower for an engine displacement, via the annual-tax
    /// `"displacement_cc"` bracket table. The bracket amount is truncated to
    /// a whole HP figure.
    pub async fn fiscal_hp_from_displacement(
        &self,
        region: Region,
        displacement_cc: i32,
        date: NaiveDate,
    ) -> Result<Option<i32>, RepositoryError> {
        Ok(self
            .find_bracket(region, TaxType::Annual, "displacement_cc", displacement_cc, date)
            .await?
            .and_then(|bracket| bracket.amount.trunc().to_i32()))
    }
}
