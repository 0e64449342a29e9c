use std::io::Read;

use beltax_core::{
    NewAgeCoefficient, NewTaxBracket, NewTaxExemption, NewTaxParameter, Region, RepositoryError,
    RuleRepository, TaxType,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading rule data.
#[derive(Debug, Error)]
pub enum RuleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown region '{0}'")]
    UnknownRegion(String),

    #[error("Unknown tax type '{0}'")]
    UnknownTaxType(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for RuleLoaderError {
    fn from(err: csv::Error) -> Self {
        RuleLoaderError::CsvParse(err.to_string())
    }
}

fn parse_region(code: &str) -> Result<Region, RuleLoaderError> {
    Region::parse(code.trim()).ok_or_else(|| RuleLoaderError::UnknownRegion(code.to_string()))
}

fn parse_tax_type(code: &str) -> Result<TaxType, RuleLoaderError> {
    TaxType::parse(code.trim()).ok_or_else(|| RuleLoaderError::UnknownTaxType(code.to_string()))
}

/// A bracket row from a CSV file.
///
/// Columns: `region`, `tax_type`, `bracket_key`, `min_value`, `max_value`
/// (empty for unbounded), `amount`, `valid_from`, `valid_to` (empty for
/// currently active). Dates are ISO-8601.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub region: String,
    pub tax_type: String,
    pub bracket_key: String,
    pub min_value: i32,
    #[serde(deserialize_with = "deserialize_optional_int")]
    pub max_value: Option<i32>,
    pub amount: Decimal,
    pub valid_from: NaiveDate,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub valid_to: Option<NaiveDate>,
}

/// A parameter row from a CSV file.
///
/// Columns: `region`, `tax_type`, `param_key`, `value`, `valid_from`,
/// `valid_to`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParameterRecord {
    pub region: String,
    pub tax_type: String,
    pub param_key: String,
    pub value: Decimal,
    pub valid_from: NaiveDate,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub valid_to: Option<NaiveDate>,
}

/// An age-coefficient row from a CSV file.
///
/// Columns: `region`, `tax_type`, `vehicle_age_years`, `coefficient`,
/// `valid_from`, `valid_to`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgeCoefficientRecord {
    pub region: String,
    pub tax_type: String,
    pub vehicle_age_years: i32,
    pub coefficient: Decimal,
    pub valid_from: NaiveDate,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub valid_to: Option<NaiveDate>,
}

/// An exemption row from a CSV file.
///
/// Columns: `region`, `tax_type`, `condition_key`, `valid_from`, `valid_to`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExemptionRecord {
    pub region: String,
    pub tax_type: String,
    pub condition_key: String,
    pub valid_from: NaiveDate,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub valid_to: Option<NaiveDate>,
}

fn deserialize_optional_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for rule data from CSV files.
///
/// Parsing and loading are split so callers can validate a file without a
/// database, and load pre-built records in tests. Loading goes through the
/// `RuleRepository` trait and works with any backend.
pub struct RuleDataLoader;

impl RuleDataLoader {
    pub fn parse_brackets<R: Read>(reader: R) -> Result<Vec<BracketRecord>, RuleLoaderError> {
        Self::parse(reader)
    }

    pub fn parse_parameters<R: Read>(reader: R) -> Result<Vec<ParameterRecord>, RuleLoaderError> {
        Self::parse(reader)
    }

    pub fn parse_age_coefficients<R: Read>(
        reader: R,
    ) -> Result<Vec<AgeCoefficientRecord>, RuleLoaderError> {
        Self::parse(reader)
    }

    pub fn parse_exemptions<R: Read>(reader: R) -> Result<Vec<ExemptionRecord>, RuleLoaderError> {
        Self::parse(reader)
    }

    fn parse<R: Read, T: serde::de::DeserializeOwned>(
        reader: R,
    ) -> Result<Vec<T>, RuleLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }

    /// Insert bracket records, returning how many were created.
    pub async fn load_brackets(
        repository: &dyn RuleRepository,
        records: Vec<BracketRecord>,
    ) -> Result<usize, RuleLoaderError> {
        let mut created = 0;
        for record in records {
            repository
                .insert_bracket(NewTaxBracket {
                    region: parse_region(&record.region)?,
                    tax_type: parse_tax_type(&record.tax_type)?,
                    bracket_key: record.bracket_key,
                    min_value: record.min_value,
                    max_value: record.max_value,
                    amount: record.amount,
                    valid_from: record.valid_from,
                    valid_to: record.valid_to,
                })
                .await?;
            created += 1;
        }
        Ok(created)
    }

    /// Insert parameter records, returning how many were created.
    pub async fn load_parameters(
        repository: &dyn RuleRepository,
        records: Vec<ParameterRecord>,
    ) -> Result<usize, RuleLoaderError> {
        let mut created = 0;
        for record in records {
            repository
                .insert_parameter(NewTaxParameter {
                    region: parse_region(&record.region)?,
                    tax_type: parse_tax_type(&record.tax_type)?,
                    param_key: record.param_key,
                    value: record.value,
                    valid_from: record.valid_from,
                    valid_to: record.valid_to,
                })
                .await?;
            created += 1;
        }
        Ok(created)
    }

    /// Insert age-coefficient records, returning how many were created.
    pub async fn load_age_coefficients(
        repository: &dyn RuleRepository,
        records: Vec<AgeCoefficientRecord>,
    ) -> Result<usize, RuleLoaderError> {
        let mut created = 0;
        for record in records {
            repository
                .insert_age_coefficient(NewAgeCoefficient {
                    region: parse_region(&record.region)?,
                    tax_type: parse_tax_type(&record.tax_type)?,
                    vehicle_age_years: record.vehicle_age_years,
                    coefficient: record.coefficient,
                    valid_from: record.valid_from,
                    valid_to: record.valid_to,
                })
                .await?;
            created += 1;
        }
        Ok(created)
    }

    /// Insert exemption records, returning how many were created.
    pub async fn load_exemptions(
        repository: &dyn RuleRepository,
        records: Vec<ExemptionRecord>,
    ) -> Result<usize, RuleLoaderError> {
        let mut created = 0;
        for record in records {
            repository
                .insert_exemption(NewTaxExemption {
                    region: parse_region(&record.region)?,
                    tax_type: parse_tax_type(&record.tax_type)?,
                    condition_key: record.condition_key,
                    valid_from: record.valid_from,
                    valid_to: record.valid_to,
                })
                .await?;
            created += 1;
        }
        Ok(created)
    }
}
