//! Shared rounding helpers for tax calculations.
//!
//! The legal formula texts prescribe half-up rounding at fixed scales: final
//! amounts at two decimals, intermediate factors (CO2 ratio, mass ratio) at
//! four. All arithmetic stays in `Decimal`; binary floating point would
//! drift at the cent level on user-facing amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a final amount to two decimal places, half-up.
///
/// Half-up follows the financial convention where values at exactly 0.005
/// round away from zero to 0.01.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use beltax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(504.044)), dec!(504.04));
/// assert_eq!(round_half_up(dec!(504.045)), dec!(504.05));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an intermediate factor to four decimal places, half-up, matching
/// the precision the legal formulas quote for ratios like CO2/reference.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use beltax_core::calculations::common::round_factor;
///
/// assert_eq!(round_factor(dec!(140) / dec!(136)), dec!(1.0294));
/// assert_eq!(round_factor(dec!(1800) / dec!(1838)), dec!(0.9793));
/// ```
pub fn round_factor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the larger of two decimal values.
pub fn max(a: Decimal, b: Decimal) -> Decimal {
    if a > b { a } else { b }
}
