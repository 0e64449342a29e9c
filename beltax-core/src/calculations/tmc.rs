//! Per-region TMC dispatch.
//!
//! Each region computes a base amount in its own module; the age coefficient
//! is applied here so the degressive scale and its 15-year exemption work
//! identically everywhere. The `match` keeps the region set closed — adding
//! a region without a formula is a compile error.

mod brussels;
mod flanders;
mod wallonia;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{Breakdown, Region, TaxType, VehicleData};

pub(super) async fn calculate(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    region: Region,
    rate_date: NaiveDate,
    vehicle_age_years: i32,
    registration_date: NaiveDate,
    breakdown: &mut Breakdown,
) -> Result<Decimal, RepositoryError> {
    let age_coefficient = rules
        .age_coefficient_or(region, TaxType::Tmc, vehicle_age_years, rate_date, Decimal::ONE)
        .await?;
    breakdown.push("ageCoefficient", age_coefficient);

    let base_amount = match region {
        Region::Wallonia => wallonia::base_amount(rules, vehicle, rate_date, breakdown).await?,
        Region::Brussels => brussels::base_amount(rules, vehicle, rate_date, breakdown).await?,
        Region::Flanders => {
            flanders::base_amount(rules, vehicle, rate_date, registration_date, breakdown).await?
        }
    };
    breakdown.push("baseAmount", base_amount);

    // Fixed-rate electric tariffs ignore the degressive scale, except that a
    // zero coefficient (15+ years) still zeroes the tax.
    let electric_fixed = breakdown.flag("isElectricReduced");
    let final_amount = if electric_fixed && age_coefficient > Decimal::ZERO {
        breakdown.push("electricFixedNoAgeCoef", true);
        base_amount
    } else {
        base_amount * age_coefficient
    };
    breakdown.push("afterAgeCoefficient", final_amount);

    Ok(final_amount)
}
