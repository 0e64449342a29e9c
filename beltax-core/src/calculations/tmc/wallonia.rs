//! Wallonia TMC (2025 reform).
//!
//! Official formula: `TMC = MB × (CO2/X) × (MMA/Y) × C × age coefficient`
//! where MB is the base amount from the kW bracket table, X the CO2
//! reference (136 g/km WLTP), Y the mass reference (1838 kg) and C the
//! energy coefficient. The age coefficient is applied by the dispatcher.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calculations::common::round_factor;
use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{Breakdown, Region, TaxType, VehicleData};

fn co2_reference_default() -> Decimal {
    Decimal::from(136)
}

fn mma_reference_default() -> Decimal {
    Decimal::from(1838)
}

fn electric_coefficient_default() -> Decimal {
    // 0.01, the floor of the kW-banded electric coefficient table.
    Decimal::new(1, 2)
}

fn hybrid_coefficient_default() -> Decimal {
    Decimal::new(8, 1)
}

pub(super) async fn base_amount(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    rate_date: NaiveDate,
    breakdown: &mut Breakdown,
) -> Result<Decimal, RepositoryError> {
    // Base amount (MB) from the power band.
    let base = rules
        .bracket_amount_or(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            vehicle.power_kw,
            rate_date,
            Decimal::ZERO,
        )
        .await?;
    breakdown.push("powerKw", vehicle.power_kw);
    breakdown.push("baseAmount", base);

    // Energy coefficient (C), keyed on the drivetrain.
    let energy_coefficient = energy_coefficient(rules, vehicle, rate_date).await?;
    breakdown.push("energyCoefficient", energy_coefficient);

    // CO2 factor = CO2 / X, thermal vehicles only.
    let mut co2_factor = Decimal::ONE;
    if !vehicle.fuel.is_zero_emission() {
        if let Some(co2) = vehicle.positive_co2_wltp() {
            let co2_reference = rules
                .parameter_or(
                    Region::Wallonia,
                    TaxType::Tmc,
                    "co2_reference_wltp",
                    rate_date,
                    co2_reference_default(),
                )
                .await?;
            co2_factor = round_factor(Decimal::from(co2) / co2_reference);
            breakdown.push("co2Wltp", co2);
            breakdown.push("co2Reference", co2_reference);
            breakdown.push("co2Factor", co2_factor);
        }
    }

    // Mass factor = MMA / Y.
    let mut mma_factor = Decimal::ONE;
    if let Some(mma) = vehicle.mma_kg.filter(|mma| *mma > 0) {
        let mma_reference = rules
            .parameter_or(
                Region::Wallonia,
                TaxType::Tmc,
                "mma_reference",
                rate_date,
                mma_reference_default(),
            )
            .await?;
        mma_factor = round_factor(Decimal::from(mma) / mma_reference);
        breakdown.push("mmaKg", mma);
        breakdown.push("mmaReference", mma_reference);
        breakdown.push("mmaFactor", mma_factor);
    }

    Ok(base * co2_factor * mma_factor * energy_coefficient)
}

/// Energy coefficient (C):
/// - electric/hydrogen: banded by power, 0.01 at the low end;
/// - hybrids: flat 0.8;
/// - thermal fuels (petrol, diesel, LPG, CNG, ...): 1.0.
async fn energy_coefficient(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    rate_date: NaiveDate,
) -> Result<Decimal, RepositoryError> {
    if vehicle.fuel.is_zero_emission() {
        return rules
            .bracket_amount_or(
                Region::Wallonia,
                TaxType::Tmc,
                "energy_electric_kw",
                vehicle.power_kw,
                rate_date,
                electric_coefficient_default(),
            )
            .await;
    }

    if vehicle.fuel.is_hybrid() {
        return rules
            .parameter_or(
                Region::Wallonia,
                TaxType::Tmc,
                "energy_hybrid",
                rate_date,
                hybrid_coefficient_default(),
            )
            .await;
    }

    rules
        .parameter_or(
            Region::Wallonia,
            TaxType::Tmc,
            "energy_thermal",
            rate_date,
            Decimal::ONE,
        )
        .await
}
