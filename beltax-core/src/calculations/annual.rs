//! Annual circulation tax — one formula shared by all three regions.
//!
//! Base amount from the fiscal-HP bracket table, plus a per-HP supplement
//! for LPG, plus (Flanders only) a CO2 correction proportional to the
//! distance from the regional reference emission.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calculations::common::max;
use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{Breakdown, FuelType, Region, TaxType, VehicleData};

fn lpg_supplement_default() -> Decimal {
    Decimal::new(9916, 2)
}

fn co2_reference_default() -> Decimal {
    Decimal::from(149)
}

fn co2_correction_percent_default() -> Decimal {
    Decimal::new(3, 3)
}

pub(super) async fn calculate(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    region: Region,
    rate_date: NaiveDate,
    breakdown: &mut Breakdown,
) -> Result<Decimal, RepositoryError> {
    let mut base = rules
        .bracket_amount_or(
            region,
            TaxType::Annual,
            "fiscal_hp",
            vehicle.fiscal_hp,
            rate_date,
            Decimal::ZERO,
        )
        .await?;
    breakdown.push("baseAmount", base);
    breakdown.push("fiscalHp", vehicle.fiscal_hp);

    if vehicle.fuel == FuelType::Lpg {
        let lpg_supplement = rules
            .parameter_or(
                region,
                TaxType::Annual,
                "lpg_supplement_per_hp",
                rate_date,
                lpg_supplement_default(),
            )
            .await?
            * Decimal::from(vehicle.fiscal_hp);
        base += lpg_supplement;
        breakdown.push("lpgSupplement", lpg_supplement);
    }

    // Flanders applies a CO2 bonus/malus around the reference emission.
    if region == Region::Flanders {
        if let Some(co2) = vehicle.positive_co2_wltp() {
            let co2_reference = rules
                .parameter_or(
                    Region::Flanders,
                    TaxType::Annual,
                    "co2_reference_wltp",
                    rate_date,
                    co2_reference_default(),
                )
                .await?;
            let correction_percent = rules
                .parameter_or(
                    Region::Flanders,
                    TaxType::Annual,
                    "co2_correction_percent",
                    rate_date,
                    co2_correction_percent_default(),
                )
                .await?;
            let co2_adjustment = base * (Decimal::from(co2) - co2_reference) * correction_percent;
            base += co2_adjustment;
            breakdown.push("co2Adjustment", co2_adjustment);
        }
    }

    Ok(max(base, Decimal::ZERO))
}
