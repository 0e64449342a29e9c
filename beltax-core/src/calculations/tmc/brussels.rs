//! Brussels TMC.
//!
//! Formula: `max(amount by fiscal HP, amount by kW) − LPG reduction`, floored
//! at zero. The two bracket *amounts* are compared, not the input values.
//! Electric and hydrogen vehicles pay a fixed reduced rate instead; CNG
//! vehicles pay nothing and also escape the minimum-amount clamp.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calculations::common::max;
use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{Breakdown, FuelType, Region, TaxType, VehicleData};

fn electric_amount_default() -> Decimal {
    Decimal::new(7429, 2)
}

fn lpg_reduction_default() -> Decimal {
    Decimal::from(298)
}

pub(super) async fn base_amount(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    rate_date: NaiveDate,
    breakdown: &mut Breakdown,
) -> Result<Decimal, RepositoryError> {
    // Electric/hydrogen: fixed reduced rate, not an exemption. The flag also
    // tells the dispatcher to skip the age multiplication.
    if vehicle.fuel.is_zero_emission() {
        let amount = rules
            .parameter_or(
                Region::Brussels,
                TaxType::Tmc,
                "electric_min_amount",
                rate_date,
                electric_amount_default(),
            )
            .await?;
        breakdown.push("electricFixedAmount", amount);
        breakdown.push("isElectricReduced", true);
        return Ok(amount);
    }

    let amount_by_fiscal_hp = rules
        .bracket_amount_or(
            Region::Brussels,
            TaxType::Tmc,
            "fiscal_hp",
            vehicle.fiscal_hp,
            rate_date,
            Decimal::ZERO,
        )
        .await?;
    breakdown.push("fiscalHp", vehicle.fiscal_hp);
    breakdown.push("amountByFiscalHp", amount_by_fiscal_hp);

    let amount_by_power_kw = rules
        .bracket_amount_or(
            Region::Brussels,
            TaxType::Tmc,
            "power_kw",
            vehicle.power_kw,
            rate_date,
            Decimal::ZERO,
        )
        .await?;
    breakdown.push("powerKw", vehicle.power_kw);
    breakdown.push("amountByPowerKw", amount_by_power_kw);

    let mut base = max(amount_by_fiscal_hp, amount_by_power_kw);
    breakdown.push("baseAmount", base);
    breakdown.push(
        "usedCriteria",
        if amount_by_fiscal_hp >= amount_by_power_kw {
            "fiscal_hp"
        } else {
            "power_kw"
        },
    );

    if vehicle.fuel == FuelType::Lpg {
        let lpg_reduction = rules
            .parameter_or(
                Region::Brussels,
                TaxType::Tmc,
                "lpg_reduction",
                rate_date,
                lpg_reduction_default(),
            )
            .await?;
        base -= lpg_reduction;
        breakdown.push("lpgReduction", lpg_reduction);
    }

    // CNG pays nothing, and the flag exempts it from the minimum clamp.
    if vehicle.fuel == FuelType::Cng {
        breakdown.push("cngExempt", true);
        return Ok(Decimal::ZERO);
    }

    Ok(max(base, Decimal::ZERO))
}
