//! In-memory [`RuleRepository`] for unit tests.
//!
//! Holds rule rows in plain vectors, counts lookups so caching behaviour can
//! be asserted, and can be armed to fail its next write to exercise error
//! paths. Test-only; the real backends live in the database crates.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::db::repository::{RepositoryError, RuleFilter, RuleRepository};
use crate::indexation::{
    IndexationOutcome, IndexationRequest, indexed_bracket_amount, indexed_parameter_value,
    is_indexable_parameter,
};
use crate::models::{
    AgeCoefficient, NewAgeCoefficient, NewTaxBracket, NewTaxExemption, NewTaxParameter, Region,
    TaxBracket, TaxExemption, TaxParameter, TaxType,
};

#[derive(Debug, Default)]
struct Store {
    brackets: Vec<TaxBracket>,
    parameters: Vec<TaxParameter>,
    age_coefficients: Vec<AgeCoefficient>,
    exemptions: Vec<TaxExemption>,
    next_id: i64,
    fail_next_write: Option<String>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryRuleRepository {
    store: Mutex<Store>,
    parameter_lookups: AtomicUsize,
    exemption_lookups: AtomicUsize,
}

impl MemoryRuleRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seed_bracket(&self, bracket: TaxBracket) {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        store.brackets.push(TaxBracket { id, ..bracket });
    }

    pub(crate) fn seed_parameter(&self, parameter: TaxParameter) {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        store.parameters.push(TaxParameter { id, ..parameter });
    }

    pub(crate) fn seed_age_coefficient(&self, coefficient: AgeCoefficient) {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        store.age_coefficients.push(AgeCoefficient { id, ..coefficient });
    }

    pub(crate) fn seed_exemption(&self, exemption: TaxExemption) {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        store.exemptions.push(TaxExemption { id, ..exemption });
    }

    /// Swap the value of every parameter with `param_key`, bypassing the
    /// append-only discipline. Exists to test cache invalidation.
    pub(crate) fn replace_parameter_value(&self, param_key: &str, value: Decimal) {
        let mut store = self.store.lock().unwrap();
        for parameter in store.parameters.iter_mut() {
            if parameter.param_key == param_key {
                parameter.value = value;
            }
        }
    }

    /// Make the next write operation fail with a `Database` error.
    pub(crate) fn fail_next_write(&self, message: &str) {
        self.store.lock().unwrap().fail_next_write = Some(message.to_string());
    }

    pub(crate) fn parameter_lookups(&self) -> usize {
        self.parameter_lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn exemption_lookups(&self) -> usize {
        self.exemption_lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn brackets(&self) -> Vec<TaxBracket> {
        self.store.lock().unwrap().brackets.clone()
    }

    pub(crate) fn parameters(&self) -> Vec<TaxParameter> {
        self.store.lock().unwrap().parameters.clone()
    }

    fn take_write_failure(store: &mut Store) -> Result<(), RepositoryError> {
        match store.fail_next_write.take() {
            Some(message) => Err(RepositoryError::Database(message)),
            None => Ok(()),
        }
    }
}

fn matches_filter(region: Region, tax_type: TaxType, filter: RuleFilter) -> bool {
    filter.region.is_none_or(|r| r == region) && filter.tax_type.is_none_or(|t| t == tax_type)
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
    async fn find_matching_bracket(
        &self,
        region: Region,
        tax_type: TaxType,
        bracket_key: &str,
        value: i32,
        date: NaiveDate,
    ) -> Result<Option<TaxBracket>, RepositoryError> {
        let store = self.store.lock().unwrap();
        let mut candidates: Vec<_> = store
            .brackets
            .iter()
            .filter(|b| {
                b.region == region
                    && b.tax_type == tax_type
                    && b.bracket_key == bracket_key
                    && b.contains(value)
                    && b.is_valid_at(date)
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(a.id.cmp(&b.id)));
        Ok(candidates.into_iter().next())
    }

    async fn insert_bracket(&self, bracket: NewTaxBracket) -> Result<TaxBracket, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let id = store.next_id();
        let bracket = TaxBracket {
            id,
            region: bracket.region,
            tax_type: bracket.tax_type,
            bracket_key: bracket.bracket_key,
            min_value: bracket.min_value,
            max_value: bracket.max_value,
            amount: bracket.amount,
            valid_from: bracket.valid_from,
            valid_to: bracket.valid_to,
        };
        store.brackets.push(bracket.clone());
        Ok(bracket)
    }

    async fn list_brackets(&self, filter: RuleFilter) -> Result<Vec<TaxBracket>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .brackets
            .iter()
            .filter(|b| matches_filter(b.region, b.tax_type, filter))
            .cloned()
            .collect())
    }

    async fn close_bracket(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let bracket = store
            .brackets
            .iter_mut()
            .find(|b| b.id == id && b.valid_to.is_none())
            .ok_or(RepositoryError::NotFound)?;
        bracket.valid_to = Some(valid_to);
        Ok(())
    }

    async fn delete_bracket(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let before = store.brackets.len();
        store.brackets.retain(|b| b.id != id);
        if store.brackets.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_parameter(
        &self,
        region: Region,
        tax_type: TaxType,
        param_key: &str,
        date: NaiveDate,
    ) -> Result<Option<TaxParameter>, RepositoryError> {
        self.parameter_lookups.fetch_add(1, Ordering::SeqCst);
        let store = self.store.lock().unwrap();
        let mut candidates: Vec<_> = store
            .parameters
            .iter()
            .filter(|p| {
                p.region == region
                    && p.tax_type == tax_type
                    && p.param_key == param_key
                    && p.is_valid_at(date)
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(a.id.cmp(&b.id)));
        Ok(candidates.into_iter().next())
    }

    async fn insert_parameter(
        &self,
        parameter: NewTaxParameter,
    ) -> Result<TaxParameter, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let id = store.next_id();
        let parameter = TaxParameter {
            id,
            region: parameter.region,
            tax_type: parameter.tax_type,
            param_key: parameter.param_key,
            value: parameter.value,
            valid_from: parameter.valid_from,
            valid_to: parameter.valid_to,
        };
        store.parameters.push(parameter.clone());
        Ok(parameter)
    }

    async fn list_parameters(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxParameter>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .parameters
            .iter()
            .filter(|p| matches_filter(p.region, p.tax_type, filter))
            .cloned()
            .collect())
    }

    async fn close_parameter(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let parameter = store
            .parameters
            .iter_mut()
            .find(|p| p.id == id && p.valid_to.is_none())
            .ok_or(RepositoryError::NotFound)?;
        parameter.valid_to = Some(valid_to);
        Ok(())
    }

    async fn delete_parameter(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let before = store.parameters.len();
        store.parameters.retain(|p| p.id != id);
        if store.parameters.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_age_coefficient(
        &self,
        region: Region,
        tax_type: TaxType,
        vehicle_age_years: i32,
        date: NaiveDate,
    ) -> Result<Option<AgeCoefficient>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .age_coefficients
            .iter()
            .find(|c| {
                c.region == region
                    && c.tax_type == tax_type
                    && c.vehicle_age_years == vehicle_age_years
                    && c.is_valid_at(date)
            })
            .cloned())
    }

    async fn insert_age_coefficient(
        &self,
        coefficient: NewAgeCoefficient,
    ) -> Result<AgeCoefficient, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let id = store.next_id();
        let coefficient = AgeCoefficient {
            id,
            region: coefficient.region,
            tax_type: coefficient.tax_type,
            vehicle_age_years: coefficient.vehicle_age_years,
            coefficient: coefficient.coefficient,
            valid_from: coefficient.valid_from,
            valid_to: coefficient.valid_to,
        };
        store.age_coefficients.push(coefficient.clone());
        Ok(coefficient)
    }

    async fn list_age_coefficients(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<AgeCoefficient>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .age_coefficients
            .iter()
            .filter(|c| matches_filter(c.region, c.tax_type, filter))
            .cloned()
            .collect())
    }

    async fn close_age_coefficient(
        &self,
        id: i64,
        valid_to: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let coefficient = store
            .age_coefficients
            .iter_mut()
            .find(|c| c.id == id && c.valid_to.is_none())
            .ok_or(RepositoryError::NotFound)?;
        coefficient.valid_to = Some(valid_to);
        Ok(())
    }

    async fn delete_age_coefficient(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let before = store.age_coefficients.len();
        store.age_coefficients.retain(|c| c.id != id);
        if store.age_coefficients.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn exemption_exists(
        &self,
        region: Region,
        tax_type: TaxType,
        condition_key: &str,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        self.exemption_lookups.fetch_add(1, Ordering::SeqCst);
        let store = self.store.lock().unwrap();
        Ok(store.exemptions.iter().any(|e| {
            e.region == region
                && e.tax_type == tax_type
                && e.condition_key == condition_key
                && e.is_valid_at(date)
        }))
    }

    async fn insert_exemption(
        &self,
        exemption: NewTaxExemption,
    ) -> Result<TaxExemption, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let id = store.next_id();
        let exemption = TaxExemption {
            id,
            region: exemption.region,
            tax_type: exemption.tax_type,
            condition_key: exemption.condition_key,
            valid_from: exemption.valid_from,
            valid_to: exemption.valid_to,
        };
        store.exemptions.push(exemption.clone());
        Ok(exemption)
    }

    async fn list_exemptions(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxExemption>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .exemptions
            .iter()
            .filter(|e| matches_filter(e.region, e.tax_type, filter))
            .cloned()
            .collect())
    }

    async fn close_exemption(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let exemption = store
            .exemptions
            .iter_mut()
            .find(|e| e.id == id && e.valid_to.is_none())
            .ok_or(RepositoryError::NotFound)?;
        exemption.valid_to = Some(valid_to);
        Ok(())
    }

    async fn delete_exemption(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;
        let before = store.exemptions.len();
        store.exemptions.retain(|e| e.id != id);
        if store.exemptions.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn apply_indexation(
        &self,
        request: &IndexationRequest,
    ) -> Result<IndexationOutcome, RepositoryError> {
        let previous_day = request.previous_day()?;
        let filter = RuleFilter::scoped(request.region, request.tax_type);
        let mut store = self.store.lock().unwrap();
        Self::take_write_failure(&mut store)?;

        let mut outcome = IndexationOutcome::default();

        if request.brackets_in_scope() {
            let mut created = Vec::new();
            for bracket in store.brackets.iter_mut() {
                if !matches_filter(bracket.region, bracket.tax_type, filter)
                    || !bracket.is_valid_at(previous_day)
                {
                    continue;
                }
                let mut replacement = bracket.clone();
                bracket.valid_to = Some(previous_day);
                replacement.amount = indexed_bracket_amount(replacement.amount, request.rate);
                replacement.valid_from = request.effective_date;
                replacement.valid_to = None;
                created.push(replacement);
            }
            for mut bracket in created {
                bracket.id = store.next_id();
                store.brackets.push(bracket);
                outcome.brackets_created += 1;
            }
        }

        if request.parameters_in_scope() {
            let mut created = Vec::new();
            for parameter in store.parameters.iter_mut() {
                if !matches_filter(parameter.region, parameter.tax_type, filter)
                    || !parameter.is_valid_at(previous_day)
                {
                    continue;
                }
                let mut replacement = parameter.clone();
                parameter.valid_to = Some(previous_day);
                if is_indexable_parameter(&replacement.param_key) {
                    replacement.value = indexed_parameter_value(replacement.value, request.rate);
                }
                replacement.valid_from = request.effective_date;
                replacement.valid_to = None;
                created.push(replacement);
            }
            for mut parameter in created {
                parameter.id = store.next_id();
                store.parameters.push(parameter);
                outcome.parameters_created += 1;
            }
        }

        Ok(outcome)
    }
}

// ── row constructors ─────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub(crate) fn bracket(
    region: Region,
    tax_type: TaxType,
    bracket_key: &str,
    min_value: i32,
    max_value: Option<i32>,
    amount: Decimal,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
) -> TaxBracket {
    TaxBracket {
        id: 0,
        region,
        tax_type,
        bracket_key: bracket_key.to_string(),
        min_value,
        max_value,
        amount,
        valid_from,
        valid_to,
    }
}

pub(crate) fn parameter(
    region: Region,
    tax_type: TaxType,
    param_key: &str,
    value: Decimal,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
) -> TaxParameter {
    TaxParameter {
        id: 0,
        region,
        tax_type,
        param_key: param_key.to_string(),
        value,
        valid_from,
        valid_to,
    }
}

pub(crate) fn age_coefficient(
    region: Region,
    tax_type: TaxType,
    vehicle_age_years: i32,
    coefficient: Decimal,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
) -> AgeCoefficient {
    AgeCoefficient {
        id: 0,
        region,
        tax_type,
        vehicle_age_years,
        coefficient,
        valid_from,
        valid_to,
    }
}

pub(crate) fn exemption(
    region: Region,
    tax_type: TaxType,
    condition_key: &str,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
) -> TaxExemption {
    TaxExemption {
        id: 0,
        region,
        tax_type,
        condition_key: condition_key.to_string(),
        valid_from,
        valid_to,
    }
}
