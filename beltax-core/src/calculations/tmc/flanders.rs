//! Flanders TMC (BIV).
//!
//! Two formulas, selected by the first-registration date:
//! - pre-2021 (NEDC):  `BIV = ((CO2 × f + x) / 246)^6 × 4500 + c`
//! - 2021+ (WLTP):     `BIV = ((CO2 × f × q) / 246)^6 × 4500 + c`
//!
//! where `f` is the fuel factor (LPG 0.88, CNG 0.93, others 1.0), `x` the
//! additive NEDC correction, `q` the multiplicative WLTP factor, and `c` the
//! luchtcomponent from the euro-norm bracket tables. The age coefficient is
//! applied by the dispatcher.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{Breakdown, FuelType, Region, TaxType, VehicleData};

/// Registrations from this year on are taxed on the WLTP formula.
const WLTP_START_YEAR: i32 = 2021;

/// Euro norm assumed when the vehicle data does not carry one.
const EURO_NORM_FALLBACK: i32 = 6;

fn divisor_default() -> Decimal {
    Decimal::from(246)
}

fn constant_default() -> Decimal {
    Decimal::from(4500)
}

fn wltp_q_default() -> Decimal {
    Decimal::new(1245, 3)
}

fn co2_correction_x_default() -> Decimal {
    Decimal::from(63)
}

fn lpg_fuel_factor_default() -> Decimal {
    Decimal::new(88, 2)
}

fn cng_fuel_factor_default() -> Decimal {
    Decimal::new(93, 2)
}

fn luchtcomponent_default() -> Decimal {
    Decimal::from(500)
}

pub(super) async fn base_amount(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    rate_date: NaiveDate,
    registration_date: NaiveDate,
    breakdown: &mut Breakdown,
) -> Result<Decimal, RepositoryError> {
    // Electric/hydrogen: a fixed amount once one is configured (2026 regime).
    // Before that the zero-emission exemption short-circuits upstream, so a
    // missing parameter simply yields zero here.
    if vehicle.fuel.is_zero_emission() {
        if let Some(fixed) = rules
            .parameter(Region::Flanders, TaxType::Tmc, "electric_fixed_amount", rate_date)
            .await?
        {
            breakdown.push("electricFixedAmount", fixed);
            breakdown.push("isElectricReduced", true);
            return Ok(fixed);
        }
        return Ok(Decimal::ZERO);
    }

    let is_wltp = registration_date.year() >= WLTP_START_YEAR;
    breakdown.push("formulaType", if is_wltp { "WLTP" } else { "NEDC" });

    // CO2: WLTP registrations use the WLTP figure; older ones prefer the
    // NEDC figure, falling back to WLTP. Without either, estimate from the
    // drivetrain and power.
    let co2 = if is_wltp {
        let co2 = vehicle
            .positive_co2_wltp()
            .unwrap_or_else(|| estimated_co2(vehicle));
        breakdown.push("co2Wltp", co2);
        co2
    } else {
        let co2 = vehicle
            .positive_co2_nedc()
            .or_else(|| vehicle.positive_co2_wltp())
            .unwrap_or_else(|| estimated_co2(vehicle));
        breakdown.push("co2Nedc", co2);
        co2
    };

    let f = fuel_factor(rules, vehicle.fuel, rate_date).await?;
    breakdown.push("fuelFactor_f", f);

    let divisor = rules
        .parameter_or(
            Region::Flanders,
            TaxType::Tmc,
            "formula_divisor",
            rate_date,
            divisor_default(),
        )
        .await?;
    let constant = rules
        .parameter_or(
            Region::Flanders,
            TaxType::Tmc,
            "formula_constant",
            rate_date,
            constant_default(),
        )
        .await?;

    let c = luchtcomponent(rules, vehicle, rate_date).await?;
    breakdown.push("luchtcomponent_c", c);
    if let Some(norm) = vehicle.euro_norm {
        breakdown.push("euroNorm", norm.code());
    }

    let step1 = if is_wltp {
        let q = rules
            .parameter_or(
                Region::Flanders,
                TaxType::Tmc,
                "wltp_q_factor",
                rate_date,
                wltp_q_default(),
            )
            .await?;
        breakdown.push("wltp_q_factor", q);
        let step1 = Decimal::from(co2) * f * q;
        breakdown.push("step1_co2_f_q", step1);
        step1
    } else {
        let x = rules
            .parameter_or(
                Region::Flanders,
                TaxType::Tmc,
                "co2_correction_x",
                rate_date,
                co2_correction_x_default(),
            )
            .await?;
        breakdown.push("co2Correction_x", x);
        let step1 = Decimal::from(co2) * f + x;
        breakdown.push("step1_co2_f_x", step1);
        step1
    };

    // The legal text fixes the division at ten decimals before the power.
    let step2 = (step1 / divisor).round_dp_with_strategy(10, RoundingStrategy::MidpointAwayFromZero);
    breakdown.push("step2_divided", step2);

    let squared = step2 * step2;
    let step3 = squared * squared * squared;
    breakdown.push("step3_power6", step3);

    let step4 = step3 * constant;
    breakdown.push("step4_times4500", step4);

    let result = step4 + c;
    breakdown.push("step5_plus_luchtcomponent", result);

    Ok(result)
}

/// Fuel factor (f) of the BIV formula.
async fn fuel_factor(
    rules: &RuleResolver,
    fuel: FuelType,
    rate_date: NaiveDate,
) -> Result<Decimal, RepositoryError> {
    match fuel {
        FuelType::Lpg => {
            rules
                .parameter_or(
                    Region::Flanders,
                    TaxType::Tmc,
                    "fuel_factor_lpg",
                    rate_date,
                    lpg_fuel_factor_default(),
                )
                .await
        }
        FuelType::Cng => {
            rules
                .parameter_or(
                    Region::Flanders,
                    TaxType::Tmc,
                    "fuel_factor_cng",
                    rate_date,
                    cng_fuel_factor_default(),
                )
                .await
        }
        _ => {
            rules
                .parameter_or(
                    Region::Flanders,
                    TaxType::Tmc,
                    "fuel_factor_default",
                    rate_date,
                    Decimal::ONE,
                )
                .await
        }
    }
}

/// Luchtcomponent (c): banded by the numeric euro norm, with separate tables
/// for diesel-family and petrol-family drivetrains.
async fn luchtcomponent(
    rules: &RuleResolver,
    vehicle: &VehicleData,
    rate_date: NaiveDate,
) -> Result<Decimal, RepositoryError> {
    let euro_value = vehicle
        .euro_norm
        .map(|norm| norm.numeric_value())
        .unwrap_or(EURO_NORM_FALLBACK);

    let bracket_key = if vehicle.fuel.is_diesel_family() {
        "luchtcomponent_diesel"
    } else {
        "luchtcomponent_petrol"
    };

    rules
        .bracket_amount_or(
            Region::Flanders,
            TaxType::Tmc,
            bracket_key,
            euro_value,
            rate_date,
            luchtcomponent_default(),
        )
        .await
}

/// Market-average CO2 estimate for vehicles without a measured figure.
fn estimated_co2(vehicle: &VehicleData) -> i32 {
    if matches!(vehicle.fuel, FuelType::Diesel | FuelType::HybridDiesel) {
        120 + vehicle.power_kw / 2
    } else {
        130 + vehicle.power_kw / 2
    }
}
