//! Borrower affordability: FOIR and payment-to-income banding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::annuity::principal_for_payment;
use crate::error::LoanEngineError;
use crate::types::{years_to_months, with_metadata, ComputationOutput, Money, Percent, Rate, Years};
use crate::LoanEngineResult;

/// Payment-to-income at or below this is comfortable.
pub const PTI_SAFE_MAX: Rate = dec!(0.40);
/// Payment-to-income at or below this (and above safe) is stretching.
pub const PTI_STRETCHING_MAX: Rate = dec!(0.50);
/// FOIR cap most lenders approve at.
pub const FOIR_ELIGIBLE_MAX: Rate = dec!(0.50);
/// FOIR above the cap but at or below this is borderline.
pub const FOIR_BORDERLINE_MAX: Rate = dec!(0.65);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordabilityBand {
    Safe,
    Stretching,
    Risky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoirBand {
    LikelyEligible,
    Borderline,
    HighRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityInput {
    pub monthly_income: Money,
    pub existing_obligations: Money,
    pub proposed_payment: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    /// (existing obligations + proposed payment) / income
    pub foir_ratio: Rate,
    pub payment_to_income_ratio: Rate,
    pub band: AffordabilityBand,
    pub foir_band: FoirBand,
    /// Largest new instalment that keeps FOIR within the eligibility cap.
    pub max_affordable_payment: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Affordability ratios and bands for a proposed instalment.
///
/// Returns `None` ("unavailable") when income is not positive or the ratios
/// fall outside the `Decimal` range.
pub fn evaluate_eligibility(
    monthly_income: Money,
    existing_obligations: Money,
    proposed_payment: Money,
) -> Option<EligibilityResult> {
    if monthly_income <= Decimal::ZERO {
        warn!(monthly_income = %monthly_income, "Eligibility unavailable for non-positive income");
        return None;
    }

    let Some((foir_ratio, payment_to_income_ratio)) =
        income_ratios(monthly_income, existing_obligations, proposed_payment)
    else {
        warn!(
            monthly_income = %monthly_income,
            proposed_payment = %proposed_payment,
            "Eligibility unavailable; ratios exceed the Decimal range"
        );
        return None;
    };

    Some(EligibilityResult {
        foir_ratio,
        payment_to_income_ratio,
        band: affordability_band(payment_to_income_ratio),
        foir_band: foir_band(foir_ratio),
        max_affordable_payment: max_affordable_payment(monthly_income, existing_obligations),
    })
}

pub fn affordability_band(payment_to_income_ratio: Rate) -> AffordabilityBand {
    if payment_to_income_ratio <= PTI_SAFE_MAX {
        AffordabilityBand::Safe
    } else if payment_to_income_ratio <= PTI_STRETCHING_MAX {
        AffordabilityBand::Stretching
    } else {
        AffordabilityBand::Risky
    }
}

pub fn foir_band(foir_ratio: Rate) -> FoirBand {
    if foir_ratio <= FOIR_ELIGIBLE_MAX {
        FoirBand::LikelyEligible
    } else if foir_ratio <= FOIR_BORDERLINE_MAX {
        FoirBand::Borderline
    } else {
        FoirBand::HighRisk
    }
}

/// `max(0, income × FOIR cap − obligations)`
pub fn max_affordable_payment(monthly_income: Money, existing_obligations: Money) -> Money {
    let cap = monthly_income.max(Decimal::ZERO) * FOIR_ELIGIBLE_MAX;
    (cap - existing_obligations.max(Decimal::ZERO)).max(Decimal::ZERO)
}

/// Largest principal whose instalment fits under the FOIR cap at the given
/// rate and tenure.
pub fn max_eligible_loan(
    monthly_income: Money,
    existing_obligations: Money,
    annual_rate_percent: Percent,
    tenure_years: Years,
) -> Money {
    if monthly_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let payment = max_affordable_payment(monthly_income, existing_obligations);
    principal_for_payment(payment, annual_rate_percent, years_to_months(tenure_years))
}

/// Validated eligibility check wrapped in the standard output envelope.
pub fn analyze_eligibility(
    input: &EligibilityInput,
) -> LoanEngineResult<ComputationOutput<EligibilityResult>> {
    let start = Instant::now();
    validate_eligibility_input(input)?;

    // Income is positive here, so `None` can only mean the ratios overflowed.
    let result = evaluate_eligibility(
        input.monthly_income,
        input.existing_obligations,
        input.proposed_payment,
    )
    .ok_or_else(|| {
        LoanEngineError::FinancialImpossibility(format!(
            "Obligations of {} against income of {} exceed the Decimal range",
            input.existing_obligations + input.proposed_payment,
            input.monthly_income
        ))
    })?;

    let mut warnings = Vec::new();
    if result.foir_ratio > Decimal::ONE {
        warnings.push(format!(
            "Fixed obligations exceed income (FOIR {})",
            result.foir_ratio.round_dp(4)
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FOIR and payment-to-income affordability",
        input,
        warnings,
        elapsed,
        result,
    ))
}

/// `(FOIR, payment-to-income)` for a positive income.
fn income_ratios(
    monthly_income: Money,
    existing_obligations: Money,
    proposed_payment: Money,
) -> Option<(Rate, Rate)> {
    let total_obligations = existing_obligations.checked_add(proposed_payment)?;
    Some((
        total_obligations.checked_div(monthly_income)?,
        proposed_payment.checked_div(monthly_income)?,
    ))
}

fn validate_eligibility_input(input: &EligibilityInput) -> LoanEngineResult<()> {
    if input.monthly_income <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "monthly_income",
            "Monthly income must be positive",
        ));
    }
    if input.existing_obligations < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "existing_obligations",
            "Existing obligations cannot be negative",
        ));
    }
    if input.proposed_payment < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "proposed_payment",
            "Proposed payment cannot be negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::solve_annuity;

    #[test]
    fn test_ratios() {
        let r = evaluate_eligibility(dec!(100_000), dec!(15_000), dec!(30_000)).unwrap();
        assert_eq!(r.foir_ratio, dec!(0.45));
        assert_eq!(r.payment_to_income_ratio, dec!(0.30));
        assert_eq!(r.band, AffordabilityBand::Safe);
        assert_eq!(r.foir_band, FoirBand::LikelyEligible);
        assert_eq!(r.max_affordable_payment, dec!(35_000));
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(affordability_band(dec!(0.40)), AffordabilityBand::Safe);
        assert_eq!(affordability_band(dec!(0.4000001)), AffordabilityBand::Stretching);
        assert_eq!(affordability_band(dec!(0.50)), AffordabilityBand::Stretching);
        assert_eq!(affordability_band(dec!(0.5000001)), AffordabilityBand::Risky);

        assert_eq!(foir_band(dec!(0.50)), FoirBand::LikelyEligible);
        assert_eq!(foir_band(dec!(0.65)), FoirBand::Borderline);
        assert_eq!(foir_band(dec!(0.6500001)), FoirBand::HighRisk);
    }

    #[test]
    fn test_band_edges_from_amounts() {
        let at_forty = evaluate_eligibility(dec!(50_000), Decimal::ZERO, dec!(20_000)).unwrap();
        assert_eq!(at_forty.band, AffordabilityBand::Safe);
        let at_fifty = evaluate_eligibility(dec!(50_000), Decimal::ZERO, dec!(25_000)).unwrap();
        assert_eq!(at_fifty.band, AffordabilityBand::Stretching);
        assert_eq!(at_fifty.foir_band, FoirBand::LikelyEligible);
    }

    #[test]
    fn test_non_positive_income_is_unavailable() {
        assert!(evaluate_eligibility(Decimal::ZERO, dec!(100), dec!(100)).is_none());
        assert!(evaluate_eligibility(dec!(-1), dec!(100), dec!(100)).is_none());
    }

    #[test]
    fn test_obligations_beyond_cap() {
        let r = evaluate_eligibility(dec!(60_000), dec!(40_000), dec!(10_000)).unwrap();
        assert_eq!(r.max_affordable_payment, Decimal::ZERO);
        assert_eq!(r.foir_band, FoirBand::HighRisk);
    }

    #[test]
    fn test_max_eligible_loan_round_trips_through_solver() {
        let loan = max_eligible_loan(dec!(100_000), dec!(10_000), dec!(8.5), dec!(20));
        let plan = solve_annuity(loan, dec!(8.5), dec!(20));
        assert!((plan.monthly_payment - dec!(40_000)).abs() < dec!(0.0001));
        assert_eq!(max_eligible_loan(Decimal::ZERO, dec!(0), dec!(8.5), dec!(20)), Decimal::ZERO);
    }

    #[test]
    fn test_analyze_eligibility() {
        let input = EligibilityInput {
            monthly_income: dec!(40_000),
            existing_obligations: dec!(30_000),
            proposed_payment: dec!(15_000),
        };
        let out = analyze_eligibility(&input).unwrap();
        assert_eq!(out.result.foir_band, FoirBand::HighRisk);
        assert_eq!(out.warnings.len(), 1);

        let bad = EligibilityInput {
            monthly_income: Decimal::ZERO,
            ..input
        };
        assert!(analyze_eligibility(&bad).is_err());
    }

    #[test]
    fn test_tiny_income_is_unavailable_not_a_panic() {
        let tiny_income = Decimal::new(1, 28);
        assert!(evaluate_eligibility(tiny_income, Decimal::ZERO, dec!(1_000_000)).is_none());
        assert!(evaluate_eligibility(dec!(1000), Decimal::MAX, Decimal::MAX).is_none());

        let input = EligibilityInput {
            monthly_income: tiny_income,
            existing_obligations: Decimal::ZERO,
            proposed_payment: dec!(1_000_000),
        };
        assert!(matches!(
            analyze_eligibility(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_max_affordable_payment_ignores_negative_obligations() {
        assert_eq!(max_affordable_payment(dec!(1000), Decimal::MIN), dec!(500));
        assert_eq!(max_affordable_payment(Decimal::MAX, Decimal::ZERO), Decimal::MAX * dec!(0.5));
    }
}
