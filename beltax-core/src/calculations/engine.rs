//! Calculation entry point.
//!
//! `calculate_tax` resolves rule versions against today's date and applies
//! the regional formula, the degressive age scale, the exemption
//! short-circuit and the min/max clamps. Two dates flow through every call
//! and must never be conflated:
//!
//! - `rate_date` — selects which *rule version* applies (today, for a live
//!   calculation);
//! - `registration_date` — measures vehicle age and selects the Flanders
//!   NEDC/WLTP branch.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::common::round_half_up;
use super::{annual, tmc};
use crate::config::RuleResolver;
use crate::db::repository::RepositoryError;
use crate::models::{
    Breakdown, CombinedAssessment, Region, TaxAssessment, TaxType, VehicleData,
};

pub struct TaxCalculator {
    rules: Arc<RuleResolver>,
}

impl TaxCalculator {
    pub fn new(rules: Arc<RuleResolver>) -> Self {
        Self { rules }
    }

    /// Compute one tax using today's rule versions.
    pub async fn calculate_tax(
        &self,
        vehicle: &VehicleData,
        region: Region,
        tax_type: TaxType,
        registration_date: NaiveDate,
    ) -> Result<TaxAssessment, RepositoryError> {
        let rate_date = Utc::now().date_naive();
        self.calculate_tax_at(vehicle, region, tax_type, registration_date, rate_date)
            .await
    }

    /// Compute both taxes using today's rule versions.
    pub async fn calculate_both(
        &self,
        vehicle: &VehicleData,
        region: Region,
        registration_date: NaiveDate,
    ) -> Result<CombinedAssessment, RepositoryError> {
        let rate_date = Utc::now().date_naive();
        self.calculate_both_at(vehicle, region, registration_date, rate_date)
            .await
    }

    /// Compute both taxes against an explicit rule-version date.
    pub async fn calculate_both_at(
        &self,
        vehicle: &VehicleData,
        region: Region,
        registration_date: NaiveDate,
        rate_date: NaiveDate,
    ) -> Result<CombinedAssessment, RepositoryError> {
        let tmc = self
            .calculate_tax_at(vehicle, region, TaxType::Tmc, registration_date, rate_date)
            .await?;
        let annual = self
            .calculate_tax_at(vehicle, region, TaxType::Annual, registration_date, rate_date)
            .await?;
        Ok(CombinedAssessment { tmc, annual })
    }

    /// Compute one tax against an explicit rule-version date.
    pub async fn calculate_tax_at(
        &self,
        vehicle: &VehicleData,
        region: Region,
        tax_type: TaxType,
        registration_date: NaiveDate,
        rate_date: NaiveDate,
    ) -> Result<TaxAssessment, RepositoryError> {
        debug!(%region, %tax_type, fuel = %vehicle.fuel, %registration_date, %rate_date, "calculating tax");

        if self
            .rules
            .is_zero_emission_exempt(region, tax_type, vehicle.fuel, rate_date)
            .await?
        {
            return Ok(TaxAssessment::exempt(
                region,
                tax_type,
                format!("Zero emission vehicle ({})", vehicle.fuel.code()),
            ));
        }

        let mut breakdown = Breakdown::new();
        let vehicle_age_years = vehicle_age_years(registration_date, rate_date);
        breakdown.push("vehicleAgeYears", vehicle_age_years);

        let mut amount = match tax_type {
            TaxType::Tmc => {
                tmc::calculate(
                    &self.rules,
                    vehicle,
                    region,
                    rate_date,
                    vehicle_age_years,
                    registration_date,
                    &mut breakdown,
                )
                .await?
            }
            TaxType::Annual => {
                annual::calculate(&self.rules, vehicle, region, rate_date, &mut breakdown).await?
            }
        };

        // The minimum does not apply to vehicles the age scale has zeroed
        // out, nor to the Brussels CNG exemption.
        let age_exempt = breakdown
            .amount("ageCoefficient")
            .is_some_and(|coefficient| coefficient.is_zero());
        let cng_exempt = breakdown.flag("cngExempt");

        if !age_exempt && !cng_exempt {
            let min_amount = self.rules.min_amount(region, tax_type, rate_date).await?;
            if amount < min_amount {
                amount = min_amount;
                breakdown.push("minAmountApplied", true);
            }
        }

        if let Some(max_amount) = self.rules.max_amount(region, tax_type, rate_date).await? {
            if amount > max_amount {
                breakdown.push("maxAmountApplied", true);
                breakdown.push("originalAmount", amount);
                amount = max_amount;
            }
        }

        let amount = round_half_up(amount);
        debug!(%region, %tax_type, %amount, "tax calculated");

        Ok(TaxAssessment {
            region,
            tax_type,
            amount,
            is_exempt: false,
            exemption_reason: None,
            breakdown,
        })
    }
}

/// Whole years between registration and the reference date, floored at zero
/// so future-dated registrations count as new.
fn vehicle_age_years(registration_date: NaiveDate, rate_date: NaiveDate) -> i32 {
    let mut years = rate_date.year() - registration_date.year();
    if (rate_date.month(), rate_date.day()) < (registration_date.month(), registration_date.day())
    {
        years -= 1;
    }
    years.max(0)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::config::RuleCache;
    use crate::models::{EuroNorm, FuelType};
    use crate::test_support::{
        MemoryRuleRepository, age_coefficient, bracket, exemption, parameter,
    };

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Rule-version date used by every test.
    fn rate_date() -> NaiveDate {
        date(2025, 7, 1)
    }

    fn valid_from() -> NaiveDate {
        date(2025, 1, 1)
    }

    fn calculator(repo: Arc<MemoryRuleRepository>) -> TaxCalculator {
        TaxCalculator::new(Arc::new(RuleResolver::new(repo, Arc::new(RuleCache::new()))))
    }

    // ── vehicle age ──────────────────────────────────────────────────────

    #[test]
    fn age_counts_whole_years_only() {
        assert_eq!(vehicle_age_years(date(2022, 7, 2), date(2025, 7, 1)), 2);
        assert_eq!(vehicle_age_years(date(2022, 7, 1), date(2025, 7, 1)), 3);
        assert_eq!(vehicle_age_years(date(2022, 6, 30), date(2025, 7, 1)), 3);
    }

    #[test]
    fn age_is_never_negative() {
        assert_eq!(vehicle_age_years(date(2026, 1, 1), date(2025, 7, 1)), 0);
    }

    // ── zero-emission exemption ──────────────────────────────────────────

    #[tokio::test]
    async fn exempt_electric_vehicle_pays_nothing() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_exemption(exemption(
            Region::Wallonia,
            TaxType::Tmc,
            "fuel_electric",
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(150, 8, FuelType::Electric);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 3, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, Decimal::ZERO);
        assert!(assessment.is_exempt);
        assert_eq!(
            assessment.exemption_reason.as_deref(),
            Some("Zero emission vehicle (electric)")
        );
        assert!(assessment.breakdown.is_empty());
    }

    #[tokio::test]
    async fn exemption_window_is_checked_against_the_rate_date() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_exemption(exemption(
            Region::Flanders,
            TaxType::Tmc,
            "fuel_electric",
            date(2020, 1, 1),
            Some(date(2024, 12, 31)),
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(150, 8, FuelType::Electric);

        // The window closed before the rate date, so no exemption applies
        // and the Flanders electric branch returns zero instead.
        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2025, 3, 1), rate_date())
            .await
            .unwrap();

        assert!(!assessment.is_exempt);
        assert_eq!(assessment.amount, Decimal::ZERO);
    }

    // ── Wallonia TMC ─────────────────────────────────────────────────────

    /// Worked example from the 2025 reform text: 110 kW petrol, 140 g CO2,
    /// 1800 kg, new vehicle.
    #[tokio::test]
    async fn wallonia_tmc_matches_worked_example() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        repo.seed_age_coefficient(age_coefficient(
            Region::Wallonia,
            TaxType::Tmc,
            0,
            dec!(1.0000),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(140),
            mma_kg: Some(1800),
            ..VehicleData::new(110, 10, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        // 500.00 × 1.0294 × 0.9793 × 1 = 504.0457…
        assert_eq!(assessment.amount, dec!(504.05));
        assert_eq!(assessment.breakdown.amount("co2Factor"), Some(dec!(1.0294)));
        assert_eq!(assessment.breakdown.amount("mmaFactor"), Some(dec!(0.9793)));
        assert_eq!(
            assessment.breakdown.amount("energyCoefficient"),
            Some(dec!(1))
        );
        assert_eq!(
            assessment.breakdown.amount("ageCoefficient"),
            Some(dec!(1.0000))
        );
    }

    #[tokio::test]
    async fn wallonia_tmc_skips_co2_factor_without_emissions() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            mma_kg: Some(1838),
            ..VehicleData::new(110, 10, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        // mmaFactor = 1838/1838 = 1, no co2Factor entry at all.
        assert_eq!(assessment.amount, dec!(500.00));
        assert!(!assessment.breakdown.contains_key("co2Factor"));
        assert_eq!(assessment.breakdown.amount("mmaFactor"), Some(dec!(1.0000)));
    }

    #[tokio::test]
    async fn wallonia_hybrid_gets_the_reduced_energy_coefficient() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(110, 10, FuelType::HybridPetrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        // 500.00 × 0.8 (default hybrid coefficient), no CO2/MMA data.
        assert_eq!(assessment.amount, dec!(400.00));
        assert_eq!(
            assessment.breakdown.amount("energyCoefficient"),
            Some(dec!(0.8))
        );
    }

    #[tokio::test]
    async fn wallonia_non_exempt_electric_uses_banded_coefficient() {
        let repo = Arc::new(MemoryRuleRepository::new());
        // No exemption row: electric is taxed, on the banded coefficient.
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            116,
            Some(155),
            dec!(800.00),
            valid_from(),
            None,
        ));
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "energy_electric_kw",
            116,
            Some(155),
            dec!(0.05),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(0),
            mma_kg: Some(2200),
            ..VehicleData::new(150, 8, FuelType::Electric)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        // co2Factor stays 1 for zero-emission fuels; mma 2200/1838 = 1.1970.
        // 800.00 × 1.1970 × 0.05 = 47.88.
        assert_eq!(assessment.amount, dec!(47.88));
        assert!(!assessment.breakdown.contains_key("co2Factor"));
        assert_eq!(assessment.breakdown.amount("mmaFactor"), Some(dec!(1.1970)));
    }

    // ── Brussels TMC ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn brussels_tmc_takes_the_higher_of_both_amounts() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Brussels,
            TaxType::Tmc,
            "fiscal_hp",
            9,
            Some(10),
            dec!(123.95),
            valid_from(),
            None,
        ));
        repo.seed_bracket(bracket(
            Region::Brussels,
            TaxType::Tmc,
            "power_kw",
            71,
            Some(85),
            dec!(495.79),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(80, 10, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(495.79));
        assert_eq!(
            assessment.breakdown.get("usedCriteria"),
            Some(&crate::models::BreakdownValue::Text("power_kw".to_string()))
        );
        assert_eq!(
            assessment.breakdown.amount("amountByFiscalHp"),
            Some(dec!(123.95))
        );
        assert_eq!(
            assessment.breakdown.amount("amountByPowerKw"),
            Some(dec!(495.79))
        );
    }

    #[tokio::test]
    async fn brussels_lpg_reduction_cannot_push_below_zero() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Brussels,
            TaxType::Tmc,
            "fiscal_hp",
            0,
            Some(8),
            dec!(123.95),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(0, 7, FuelType::Lpg);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        // 123.95 − 298 (default reduction) < 0, floored at zero.
        assert_eq!(assessment.amount, Decimal::ZERO);
        assert_eq!(assessment.breakdown.amount("lpgReduction"), Some(dec!(298)));
    }

    /// Scenario: CNG pays zero and the minimum clamp must not re-raise it.
    #[tokio::test]
    async fn brussels_cng_is_zero_and_skips_the_minimum() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Brussels,
            TaxType::Tmc,
            "fiscal_hp",
            9,
            Some(10),
            dec!(123.95),
            valid_from(),
            None,
        ));
        repo.seed_parameter(parameter(
            Region::Brussels,
            TaxType::Tmc,
            "min_amount",
            dec!(74.29),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(80, 10, FuelType::Cng);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, Decimal::ZERO);
        assert!(assessment.breakdown.flag("cngExempt"));
        assert!(!assessment.is_exempt, "CNG is not a zero-emission exemption");
        assert!(!assessment.breakdown.contains_key("minAmountApplied"));
    }

    #[tokio::test]
    async fn brussels_electric_pays_the_fixed_rate_regardless_of_age() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_age_coefficient(age_coefficient(
            Region::Brussels,
            TaxType::Tmc,
            5,
            dec!(0.5000),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(150, 8, FuelType::Electric);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Tmc, date(2020, 6, 1), rate_date())
            .await
            .unwrap();

        // Default fixed rate 74.29, age coefficient 0.5 ignored.
        assert_eq!(assessment.amount, dec!(74.29));
        assert!(assessment.breakdown.flag("isElectricReduced"));
        assert!(assessment.breakdown.flag("electricFixedNoAgeCoef"));
    }

    #[tokio::test]
    async fn brussels_electric_is_still_zeroed_by_the_age_scale_end() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_age_coefficient(age_coefficient(
            Region::Brussels,
            TaxType::Tmc,
            15,
            dec!(0.0000),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(150, 8, FuelType::Electric);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Tmc, date(2005, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, Decimal::ZERO);
        assert!(!assessment.breakdown.contains_key("electricFixedNoAgeCoef"));
    }

    // ── Flanders TMC ─────────────────────────────────────────────────────

    /// NEDC branch with numbers that collapse the sixth power to exactly 1:
    /// 183 × 1.0 + 63 = 246, (246/246)^6 × 4500 = 4500, + 500 default
    /// luchtcomponent = 5000.
    #[tokio::test]
    async fn flanders_nedc_formula_computes_the_closed_form() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_age_coefficient(age_coefficient(
            Region::Flanders,
            TaxType::Tmc,
            6,
            dec!(1.0000),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_nedc: Some(183),
            euro_norm: Some(EuroNorm::Euro6),
            ..VehicleData::new(100, 11, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2019, 3, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(5000.00));
        assert_eq!(
            assessment.breakdown.get("formulaType"),
            Some(&crate::models::BreakdownValue::Text("NEDC".to_string()))
        );
        assert_eq!(assessment.breakdown.amount("step1_co2_f_x"), Some(dec!(246)));
        assert_eq!(
            assessment.breakdown.amount("step2_divided"),
            Some(dec!(1.0000000000))
        );
        assert_eq!(assessment.breakdown.amount("luchtcomponent_c"), Some(dec!(500)));
    }

    /// WLTP branch with a pinned q that collapses the power term:
    /// 123 × 1.0 × 2.0 = 246 → 4500 + 500 = 5000.
    #[tokio::test]
    async fn flanders_wltp_formula_uses_the_q_factor() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_parameter(parameter(
            Region::Flanders,
            TaxType::Tmc,
            "wltp_q_factor",
            dec!(2.0),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(123),
            euro_norm: Some(EuroNorm::Euro6d),
            ..VehicleData::new(100, 11, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2022, 3, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(5000.00));
        assert_eq!(
            assessment.breakdown.get("formulaType"),
            Some(&crate::models::BreakdownValue::Text("WLTP".to_string()))
        );
        assert_eq!(assessment.breakdown.amount("step1_co2_f_q"), Some(dec!(246.0)));
    }

    #[tokio::test]
    async fn flanders_nedc_vehicle_falls_back_to_wltp_co2() {
        let repo = Arc::new(MemoryRuleRepository::new());
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(183),
            euro_norm: Some(EuroNorm::Euro5),
            ..VehicleData::new(100, 11, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2018, 3, 1), rate_date())
            .await
            .unwrap();

        // Same closed form as the NEDC test, via the WLTP fallback.
        assert_eq!(assessment.breakdown.amount("step1_co2_f_x"), Some(dec!(246)));
        assert_eq!(assessment.amount, dec!(5000.00));
    }

    #[tokio::test]
    async fn flanders_diesel_uses_the_diesel_air_table() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Flanders,
            TaxType::Tmc,
            "luchtcomponent_diesel",
            5,
            Some(5),
            dec!(700.00),
            valid_from(),
            None,
        ));
        repo.seed_bracket(bracket(
            Region::Flanders,
            TaxType::Tmc,
            "luchtcomponent_petrol",
            5,
            Some(5),
            dec!(200.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_nedc: Some(183),
            euro_norm: Some(EuroNorm::Euro5),
            ..VehicleData::new(100, 11, FuelType::Diesel)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2015, 3, 1), rate_date())
            .await
            .unwrap();

        // 4500 + 700 (diesel table) = 5200.
        assert_eq!(assessment.breakdown.amount("luchtcomponent_c"), Some(dec!(700.00)));
        assert_eq!(assessment.amount, dec!(5200.00));
    }

    #[tokio::test]
    async fn flanders_electric_pays_the_configured_fixed_amount() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_parameter(parameter(
            Region::Flanders,
            TaxType::Tmc,
            "electric_fixed_amount",
            dec!(61.50),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(150, 8, FuelType::Electric);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2025, 3, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(61.50));
        assert!(assessment.breakdown.flag("isElectricReduced"));
        assert!(!assessment.is_exempt);
    }

    // ── age coefficient ──────────────────────────────────────────────────

    #[tokio::test]
    async fn fifteen_year_old_vehicle_pays_nothing_despite_a_minimum() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        repo.seed_age_coefficient(age_coefficient(
            Region::Wallonia,
            TaxType::Tmc,
            15,
            dec!(0.0000),
            valid_from(),
            None,
        ));
        repo.seed_parameter(parameter(
            Region::Wallonia,
            TaxType::Tmc,
            "min_amount",
            dec!(50.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(110, 10, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2003, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, Decimal::ZERO);
        assert!(!assessment.breakdown.contains_key("minAmountApplied"));
    }

    #[tokio::test]
    async fn age_coefficient_scales_the_base_amount() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        repo.seed_age_coefficient(age_coefficient(
            Region::Wallonia,
            TaxType::Tmc,
            3,
            dec!(0.7000),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(110, 10, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2022, 3, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(350.00));
        assert_eq!(
            assessment.breakdown.amount("afterAgeCoefficient"),
            Some(dec!(350.0000))
        );
    }

    // ── min/max clamps ───────────────────────────────────────────────────

    #[tokio::test]
    async fn minimum_amount_raises_small_results() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            0,
            Some(70),
            dec!(10.00),
            valid_from(),
            None,
        ));
        repo.seed_parameter(parameter(
            Region::Wallonia,
            TaxType::Tmc,
            "min_amount",
            dec!(50.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(50, 5, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(50.00));
        assert!(assessment.breakdown.flag("minAmountApplied"));
    }

    #[tokio::test]
    async fn maximum_amount_caps_large_results() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            116,
            None,
            dec!(12000.00),
            valid_from(),
            None,
        ));
        repo.seed_parameter(parameter(
            Region::Wallonia,
            TaxType::Tmc,
            "max_amount",
            dec!(9000.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(300, 20, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(9000.00));
        assert!(assessment.breakdown.flag("maxAmountApplied"));
        assert_eq!(
            assessment.breakdown.amount("originalAmount"),
            Some(dec!(12000.00))
        );
    }

    // ── annual tax ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn annual_tax_reads_the_fiscal_hp_table() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Brussels,
            TaxType::Annual,
            "fiscal_hp",
            9,
            Some(10),
            dec!(300.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(80, 10, FuelType::Petrol);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Brussels, TaxType::Annual, date(2024, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(assessment.amount, dec!(300.00));
        assert_eq!(
            assessment.breakdown.get("fiscalHp"),
            Some(&crate::models::BreakdownValue::Count(10))
        );
    }

    #[tokio::test]
    async fn annual_lpg_supplement_is_per_horsepower() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Annual,
            "fiscal_hp",
            9,
            Some(10),
            dec!(300.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(80, 10, FuelType::Lpg);

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Annual, date(2024, 6, 1), rate_date())
            .await
            .unwrap();

        // 300.00 + 99.16 × 10 = 1291.60.
        assert_eq!(assessment.amount, dec!(1291.60));
        assert_eq!(assessment.breakdown.amount("lpgSupplement"), Some(dec!(991.60)));
    }

    #[tokio::test]
    async fn annual_flanders_applies_the_co2_correction() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Flanders,
            TaxType::Annual,
            "fiscal_hp",
            9,
            Some(10),
            dec!(300.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(160),
            ..VehicleData::new(80, 10, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Annual, date(2024, 6, 1), rate_date())
            .await
            .unwrap();

        // 300 + 300 × (160 − 149) × 0.003 = 309.90.
        assert_eq!(assessment.amount, dec!(309.90));
        assert_eq!(assessment.breakdown.amount("co2Adjustment"), Some(dec!(9.900)));
    }

    #[tokio::test]
    async fn annual_co2_bonus_cannot_push_below_zero() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Flanders,
            TaxType::Annual,
            "fiscal_hp",
            0,
            Some(4),
            dec!(1.00),
            valid_from(),
            None,
        ));
        repo.seed_parameter(parameter(
            Region::Flanders,
            TaxType::Annual,
            "co2_correction_percent",
            dec!(10.0),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(50),
            ..VehicleData::new(40, 4, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Annual, date(2024, 6, 1), rate_date())
            .await
            .unwrap();

        // 1 + 1 × (50 − 149) × 10 is deeply negative, floored at zero.
        assert_eq!(assessment.amount, Decimal::ZERO);
    }

    // ── calculate_both ───────────────────────────────────────────────────

    #[tokio::test]
    async fn calculate_both_returns_tmc_and_annual() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Annual,
            "fiscal_hp",
            9,
            Some(10),
            dec!(300.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData::new(110, 10, FuelType::Petrol);

        let both = calc
            .calculate_both_at(&vehicle, Region::Wallonia, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        assert_eq!(both.tmc.tax_type, TaxType::Tmc);
        assert_eq!(both.tmc.amount, dec!(500.00));
        assert_eq!(both.annual.tax_type, TaxType::Annual);
        assert_eq!(both.annual.amount, dec!(300.00));
    }

    // ── breakdown contract ───────────────────────────────────────────────

    #[tokio::test]
    async fn wallonia_breakdown_carries_the_contract_keys() {
        let repo = Arc::new(MemoryRuleRepository::new());
        repo.seed_bracket(bracket(
            Region::Wallonia,
            TaxType::Tmc,
            "power_kw",
            86,
            Some(115),
            dec!(500.00),
            valid_from(),
            None,
        ));
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(140),
            mma_kg: Some(1800),
            ..VehicleData::new(110, 10, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Wallonia, TaxType::Tmc, date(2025, 6, 1), rate_date())
            .await
            .unwrap();

        for key in [
            "vehicleAgeYears",
            "ageCoefficient",
            "powerKw",
            "baseAmount",
            "energyCoefficient",
            "co2Factor",
            "mmaFactor",
            "afterAgeCoefficient",
        ] {
            assert!(
                assessment.breakdown.contains_key(key),
                "missing breakdown key {key}"
            );
        }
    }

    #[tokio::test]
    async fn flanders_wltp_breakdown_carries_the_contract_keys() {
        let repo = Arc::new(MemoryRuleRepository::new());
        let calc = calculator(repo);
        let vehicle = VehicleData {
            co2_wltp: Some(140),
            euro_norm: Some(EuroNorm::Euro6d),
            ..VehicleData::new(110, 10, FuelType::Petrol)
        };

        let assessment = calc
            .calculate_tax_at(&vehicle, Region::Flanders, TaxType::Tmc, date(2023, 6, 1), rate_date())
            .await
            .unwrap();

        for key in [
            "formulaType",
            "fuelFactor_f",
            "luchtcomponent_c",
            "wltp_q_factor",
            "step1_co2_f_q",
            "step2_divided",
            "step3_power6",
            "step4_times4500",
            "step5_plus_luchtcomponent",
        ] {
            assert!(
                assessment.breakdown.contains_key(key),
                "missing breakdown key {key}"
            );
        }
    }
}
