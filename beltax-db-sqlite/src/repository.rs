use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use beltax_core::{
    AgeCoefficient, IndexationOutcome, IndexationRequest, NewAgeCoefficient, NewTaxBracket,
    NewTaxExemption, NewTaxParameter, Region, RepositoryError, RuleFilter, RuleRepository,
    TaxBracket, TaxExemption, TaxParameter, TaxType,
    indexation::{indexed_bracket_amount, indexed_parameter_value, is_indexable_parameter},
};
use chrono::NaiveDate;
use sqlx::{Row, sqlite::SqlitePool};
use tracing::debug;

use crate::decimal::{decimal_to_db, get_decimal};

const BRACKET_COLUMNS: &str =
    "id, region, tax_type, bracket_key, min_value, max_value, amount, valid_from, valid_to";
const PARAMETER_COLUMNS: &str =
    "id, region, tax_type, param_key, param_value, valid_from, valid_to";
const COEFFICIENT_COLUMNS: &str =
    "id, region, tax_type, vehicle_age_years, coefficient, valid_from, valid_to";
const EXEMPTION_COLUMNS: &str = "id, region, tax_type, condition_key, valid_from, valid_to";

pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn bracket_by_id(&self, id: i64) -> Result<TaxBracket, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM tax_brackets WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_bracket(&row)
    }

    async fn parameter_by_id(&self, id: i64) -> Result<TaxParameter, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PARAMETER_COLUMNS} FROM tax_parameters WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_parameter(&row)
    }

    async fn coefficient_by_id(&self, id: i64) -> Result<AgeCoefficient, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {COEFFICIENT_COLUMNS} FROM age_coefficients WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_coefficient(&row)
    }

    async fn exemption_by_id(&self, id: i64) -> Result<TaxExemption, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EXEMPTION_COLUMNS} FROM tax_exemptions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_exemption(&row)
    }
}

fn parse_region(code: &str) -> Result<Region, RepositoryError> {
    Region::parse(code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid region code: {}", code)))
}

fn parse_tax_type(code: &str) -> Result<TaxType, RepositoryError> {
    TaxType::parse(code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid tax type code: {}", code)))
}

fn row_to_bracket(row: &sqlx::sqlite::SqliteRow) -> Result<TaxBracket, RepositoryError> {
    let region: String = row
        .try_get("region")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let tax_type: String = row
        .try_get("tax_type")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    Ok(TaxBracket {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        region: parse_region(&region)?,
        tax_type: parse_tax_type(&tax_type)?,
        bracket_key: row
            .try_get("bracket_key")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        min_value: row
            .try_get("min_value")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        max_value: row
            .try_get("max_value")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        amount: get_decimal(row, "amount")?,
        valid_from: row
            .try_get::<NaiveDate, _>("valid_from")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        valid_to: row
            .try_get::<Option<NaiveDate>, _>("valid_to")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_parameter(row: &sqlx::sqlite::SqliteRow) -> Result<TaxParameter, RepositoryError> {
    let region: String = row
        .try_get("region")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let tax_type: String = row
        .try_get("tax_type")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    Ok(TaxParameter {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        region: parse_region(&region)?,
        tax_type: parse_tax_type(&tax_type)?,
        param_key: row
            .try_get("param_key")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        value: get_decimal(row, "param_value")?,
        valid_from: row
            .try_get::<NaiveDate, _>("valid_from")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        valid_to: row
            .try_get::<Option<NaiveDate>, _>("valid_to")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_coefficient(row: &sqlx::sqlite::SqliteRow) -> Result<AgeCoefficient, RepositoryError> {
    let region: String = row
        .try_get("region")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let tax_type: String = row
        .try_get("tax_type")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    Ok(AgeCoefficient {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        region: parse_region(&region)?,
        tax_type: parse_tax_type(&tax_type)?,
        vehicle_age_years: row
            .try_get("vehicle_age_years")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        coefficient: get_decimal(row, "coefficient")?,
        valid_from: row
            .try_get::<NaiveDate, _>("valid_from")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        valid_to: row
            .try_get::<Option<NaiveDate>, _>("valid_to")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_exemption(row: &sqlx::sqlite::SqliteRow) -> Result<TaxExemption, RepositoryError> {
    let region: String = row
        .try_get("region")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let tax_type: String = row
        .try_get("tax_type")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    Ok(TaxExemption {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        region: parse_region(&region)?,
        tax_type: parse_tax_type(&tax_type)?,
        condition_key: row
            .try_get("condition_key")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        valid_from: row
            .try_get::<NaiveDate, _>("valid_from")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        valid_to: row
            .try_get::<Option<NaiveDate>, _>("valid_to")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

#[async_trait]
impl RuleRepository for SqliteRuleRepository {
    async fn find_matching_bracket(
        &self,
        region: Region,
        tax_type: TaxType,
        bracket_key: &str,
        value: i32,
        date: NaiveDate,
    ) -> Result<Option<TaxBracket>, RepositoryError> {
        // Active bands should not overlap; ordering makes the pick
        // deterministic when that data invariant is violated anyway.
        let row = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM tax_brackets
             WHERE region = ? AND tax_type = ? AND bracket_key = ?
               AND min_value <= ? AND (max_value IS NULL OR max_value >= ?)
               AND valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)
             ORDER BY valid_from DESC, id
             LIMIT 1"
        ))
        .bind(region.code())
        .bind(tax_type.code())
        .bind(bracket_key)
        .bind(value)
        .bind(value)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(row_to_bracket).transpose()
    }

    async fn insert_bracket(&self, bracket: NewTaxBracket) -> Result<TaxBracket, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tax_brackets
                (region, tax_type, bracket_key, min_value, max_value, amount, valid_from, valid_to)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bracket.region.code())
        .bind(bracket.tax_type.code())
        .bind(&bracket.bracket_key)
        .bind(bracket.min_value)
        .bind(bracket.max_value)
        .bind(decimal_to_db(bracket.amount))
        .bind(bracket.valid_from)
        .bind(bracket.valid_to)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.bracket_by_id(result.last_insert_rowid()).await
    }

    async fn list_brackets(&self, filter: RuleFilter) -> Result<Vec<TaxBracket>, RepositoryError> {
        let region = filter.region.map(|r| r.code());
        let tax_type = filter.tax_type.map(|t| t.code());
        let rows = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM tax_brackets
             WHERE (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)
             ORDER BY region, tax_type, bracket_key, valid_from, min_value"
        ))
        .bind(region)
        .bind(region)
        .bind(tax_type)
        .bind(tax_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_bracket).collect()
    }

    async fn close_bracket(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        // Closed rows are permanent history; valid_to is only ever set once.
        let result = sqlx::query(
            "UPDATE tax_brackets SET valid_to = ? WHERE id = ? AND valid_to IS NULL",
        )
        .bind(valid_to)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_bracket(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_brackets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
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
        let row = sqlx::query(&format!(
            "SELECT {PARAMETER_COLUMNS} FROM tax_parameters
             WHERE region = ? AND tax_type = ? AND param_key = ?
               AND valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)
             ORDER BY valid_from DESC, id
             LIMIT 1"
        ))
        .bind(region.code())
        .bind(tax_type.code())
        .bind(param_key)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(row_to_parameter).transpose()
    }

    async fn insert_parameter(
        &self,
        parameter: NewTaxParameter,
    ) -> Result<TaxParameter, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tax_parameters
                (region, tax_type, param_key, param_value, valid_from, valid_to)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(parameter.region.code())
        .bind(parameter.tax_type.code())
        .bind(&parameter.param_key)
        .bind(decimal_to_db(parameter.value))
        .bind(parameter.valid_from)
        .bind(parameter.valid_to)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.parameter_by_id(result.last_insert_rowid()).await
    }

    async fn list_parameters(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxParameter>, RepositoryError> {
        let region = filter.region.map(|r| r.code());
        let tax_type = filter.tax_type.map(|t| t.code());
        let rows = sqlx::query(&format!(
            "SELECT {PARAMETER_COLUMNS} FROM tax_parameters
             WHERE (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)
             ORDER BY region, tax_type, param_key, valid_from"
        ))
        .bind(region)
        .bind(region)
        .bind(tax_type)
        .bind(tax_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_parameter).collect()
    }

    async fn close_parameter(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_parameters SET valid_to = ? WHERE id = ? AND valid_to IS NULL",
        )
        .bind(valid_to)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_parameter(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_parameters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
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
        let row = sqlx::query(&format!(
            "SELECT {COEFFICIENT_COLUMNS} FROM age_coefficients
             WHERE region = ? AND tax_type = ? AND vehicle_age_years = ?
               AND valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)
             ORDER BY valid_from DESC, id
             LIMIT 1"
        ))
        .bind(region.code())
        .bind(tax_type.code())
        .bind(vehicle_age_years)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(row_to_coefficient).transpose()
    }

    async fn insert_age_coefficient(
        &self,
        coefficient: NewAgeCoefficient,
    ) -> Result<AgeCoefficient, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO age_coefficients
                (region, tax_type, vehicle_age_years, coefficient, valid_from, valid_to)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(coefficient.region.code())
        .bind(coefficient.tax_type.code())
        .bind(coefficient.vehicle_age_years)
        .bind(decimal_to_db(coefficient.coefficient))
        .bind(coefficient.valid_from)
        .bind(coefficient.valid_to)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.coefficient_by_id(result.last_insert_rowid()).await
    }

    async fn list_age_coefficients(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<AgeCoefficient>, RepositoryError> {
        let region = filter.region.map(|r| r.code());
        let tax_type = filter.tax_type.map(|t| t.code());
        let rows = sqlx::query(&format!(
            "SELECT {COEFFICIENT_COLUMNS} FROM age_coefficients
             WHERE (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)
             ORDER BY region, tax_type, vehicle_age_years, valid_from"
        ))
        .bind(region)
        .bind(region)
        .bind(tax_type)
        .bind(tax_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_coefficient).collect()
    }

    async fn close_age_coefficient(
        &self,
        id: i64,
        valid_to: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE age_coefficients SET valid_to = ? WHERE id = ? AND valid_to IS NULL",
        )
        .bind(valid_to)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_age_coefficient(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM age_coefficients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
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
        let row = sqlx::query(
            "SELECT COUNT(*) AS matching FROM tax_exemptions
             WHERE region = ? AND tax_type = ? AND condition_key = ?
               AND valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)",
        )
        .bind(region.code())
        .bind(tax_type.code())
        .bind(condition_key)
        .bind(date)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let matching: i64 = row
            .try_get("matching")
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(matching > 0)
    }

    async fn insert_exemption(
        &self,
        exemption: NewTaxExemption,
    ) -> Result<TaxExemption, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tax_exemptions (region, tax_type, condition_key, valid_from, valid_to)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(exemption.region.code())
        .bind(exemption.tax_type.code())
        .bind(&exemption.condition_key)
        .bind(exemption.valid_from)
        .bind(exemption.valid_to)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.exemption_by_id(result.last_insert_rowid()).await
    }

    async fn list_exemptions(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<TaxExemption>, RepositoryError> {
        let region = filter.region.map(|r| r.code());
        let tax_type = filter.tax_type.map(|t| t.code());
        let rows = sqlx::query(&format!(
            "SELECT {EXEMPTION_COLUMNS} FROM tax_exemptions
             WHERE (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)
             ORDER BY region, tax_type, condition_key, valid_from"
        ))
        .bind(region)
        .bind(region)
        .bind(tax_type)
        .bind(tax_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_exemption).collect()
    }

    async fn close_exemption(&self, id: i64, valid_to: NaiveDate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_exemptions SET valid_to = ? WHERE id = ? AND valid_to IS NULL",
        )
        .bind(valid_to)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_exemption(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_exemptions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn apply_indexation(
        &self,
        request: &IndexationRequest,
    ) -> Result<IndexationOutcome, RepositoryError> {
        let previous_day = request.previous_day()?;
        let region = request.region.map(|r| r.code());
        let tax_type = request.tax_type.map(|t| t.code());

        // One transaction for the whole batch: a partial indexation would
        // leave dates without a covering rule row.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut outcome = IndexationOutcome::default();

        if request.brackets_in_scope() {
            let rows = sqlx::query(&format!(
                "SELECT {BRACKET_COLUMNS} FROM tax_brackets
                 WHERE valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)
                   AND (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)",
            ))
            .bind(previous_day)
            .bind(previous_day)
            .bind(region)
            .bind(region)
            .bind(tax_type)
            .bind(tax_type)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

            for row in &rows {
                let bracket = row_to_bracket(row)?;

                sqlx::query("UPDATE tax_brackets SET valid_to = ? WHERE id = ?")
                    .bind(previous_day)
                    .bind(bracket.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| RepositoryError::Database(e.to_string()))?;

                let indexed = indexed_bracket_amount(bracket.amount, request.rate);
                sqlx::query(
                    "INSERT INTO tax_brackets
                        (region, tax_type, bracket_key, min_value, max_value, amount, valid_from, valid_to)
                     VALUES (?, ?, ?, ?, ?, ?, ?, NULL)",
                )
                .bind(bracket.region.code())
                .bind(bracket.tax_type.code())
                .bind(&bracket.bracket_key)
                .bind(bracket.min_value)
                .bind(bracket.max_value)
                .bind(decimal_to_db(indexed))
                .bind(request.effective_date)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

                outcome.brackets_created += 1;
            }
        }

        if request.parameters_in_scope() {
            let rows = sqlx::query(&format!(
                "SELECT {PARAMETER_COLUMNS} FROM tax_parameters
                 WHERE valid_from <= ? AND (valid_to IS NULL OR valid_to >= ?)
                   AND (? IS NULL OR region = ?) AND (? IS NULL OR tax_type = ?)",
            ))
            .bind(previous_day)
            .bind(previous_day)
            .bind(region)
            .bind(region)
            .bind(tax_type)
            .bind(tax_type)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

            for row in &rows {
                let parameter = row_to_parameter(row)?;

                sqlx::query("UPDATE tax_parameters SET valid_to = ? WHERE id = ?")
                    .bind(previous_day)
                    .bind(parameter.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| RepositoryError::Database(e.to_string()))?;

                // References and ratios carry over unchanged.
                let value = if is_indexable_parameter(&parameter.param_key) {
                    indexed_parameter_value(parameter.value, request.rate)
                } else {
                    parameter.value
                };
                sqlx::query(
                    "INSERT INTO tax_parameters
                        (region, tax_type, param_key, param_value, valid_from, valid_to)
                     VALUES (?, ?, ?, ?, ?, NULL)",
                )
                .bind(parameter.region.code())
                .bind(parameter.tax_type.code())
                .bind(&parameter.param_key)
                .bind(decimal_to_db(value))
                .bind(request.effective_date)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

                outcome.parameters_created += 1;
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(
            brackets_created = outcome.brackets_created,
            parameters_created = outcome.parameters_created,
            effective_date = %request.effective_date,
            "indexation transaction committed"
        );
        Ok(outcome)
    }
}
