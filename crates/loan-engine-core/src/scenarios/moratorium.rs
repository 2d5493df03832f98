//! Moratorium interest capitalization.
//!
//! Interest accrued while repayments are deferred is added to the principal
//! before the instalment is solved. Accrual is simple interest on the
//! original principal over the deferral window, while the loan itself
//! compounds monthly once repayments begin.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::annuity::solve_plan;
use crate::error::LoanEngineError;
use crate::types::{
    monthly_rate, with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent,
};
use crate::LoanEngineResult;

/// Longest deferral accepted by [`analyze_moratorium`].
pub const MAX_MORATORIUM_MONTHS: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoratoriumInput {
    pub terms: LoanTerms,
    pub moratorium_months: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoratoriumResult {
    pub accrued_interest: Money,
    pub adjusted_principal: Money,
    /// Pre-moratorium principal, kept for reporting only.
    pub original_principal: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoratoriumOutput {
    pub adjustment: MoratoriumResult,
    /// Plan solved on the adjusted principal.
    pub plan: PaymentPlan,
    /// Plan the loan would have had without the moratorium.
    pub plan_without_moratorium: PaymentPlan,
    pub payment_increase: Money,
}

/// Capitalize `moratorium_months` of simple interest into the principal.
///
/// Capitalizes nothing when the accrual falls outside the `Decimal` range.
pub fn adjust_for_moratorium(
    principal: Money,
    annual_rate_percent: Percent,
    moratorium_months: u32,
) -> MoratoriumResult {
    if principal <= Decimal::ZERO || annual_rate_percent < Decimal::ZERO {
        warn!(
            principal = %principal,
            annual_rate_percent = %annual_rate_percent,
            "Invalid moratorium inputs; no interest capitalized"
        );
        let original = principal.max(Decimal::ZERO);
        return MoratoriumResult {
            accrued_interest: Decimal::ZERO,
            adjusted_principal: original,
            original_principal: original,
        };
    }

    accrue(principal, annual_rate_percent, moratorium_months).unwrap_or_else(|| {
        warn!(
            principal = %principal,
            annual_rate_percent = %annual_rate_percent,
            moratorium_months,
            "Moratorium interest exceeds the Decimal range; no interest capitalized"
        );
        MoratoriumResult {
            accrued_interest: Decimal::ZERO,
            adjusted_principal: principal,
            original_principal: principal,
        }
    })
}

/// Simple-interest accrual, `None` on overflow.
pub(crate) fn accrue(
    principal: Money,
    annual_rate_percent: Percent,
    moratorium_months: u32,
) -> Option<MoratoriumResult> {
    let accrued_interest = principal
        .checked_mul(monthly_rate(annual_rate_percent))?
        .checked_mul(Decimal::from(moratorium_months))?;

    Some(MoratoriumResult {
        accrued_interest,
        adjusted_principal: principal.checked_add(accrued_interest)?,
        original_principal: principal,
    })
}

pub(crate) fn accrual_out_of_range(principal: Money, moratorium_months: u32) -> LoanEngineError {
    LoanEngineError::FinancialImpossibility(format!(
        "Moratorium interest on {} over {} months exceeds the Decimal range",
        principal, moratorium_months
    ))
}

/// Validated moratorium adjustment with the post-moratorium plan.
pub fn analyze_moratorium(
    input: &MoratoriumInput,
) -> LoanEngineResult<ComputationOutput<MoratoriumOutput>> {
    let start = Instant::now();
    input.terms.validate()?;

    validate_moratorium_months(input.moratorium_months)?;

    let months = input.terms.total_months();
    let mut warnings = Vec::new();
    if input.moratorium_months == 0 {
        warnings.push("Moratorium of 0 months; principal unchanged".into());
    }

    let terms = &input.terms;
    let adjustment = accrue(terms.principal, terms.annual_rate_percent, input.moratorium_months)
        .ok_or_else(|| accrual_out_of_range(terms.principal, input.moratorium_months))?;
    let plan = solve_plan(adjustment.adjusted_principal, terms.annual_rate_percent, months)?;
    let plan_without_moratorium = solve_plan(terms.principal, terms.annual_rate_percent, months)?;

    let output = MoratoriumOutput {
        payment_increase: plan.monthly_payment - plan_without_moratorium.monthly_payment,
        adjustment,
        plan,
        plan_without_moratorium,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Simple-interest moratorium capitalization",
        input,
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn validate_moratorium_months(months: u32) -> LoanEngineResult<()> {
    if months > MAX_MORATORIUM_MONTHS {
        return Err(LoanEngineError::invalid(
            "moratorium_months",
            "Moratorium cannot exceed 60 months",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::solve_annuity_months;
    use rust_decimal_macros::dec;

    #[test]
    fn test_twelve_month_moratorium() {
        let out = adjust_for_moratorium(dec!(1_000_000), dec!(8.5), 12);
        assert!((out.accrued_interest - dec!(85_000)).abs() < dec!(0.000001));
        assert_eq!(out.adjusted_principal, dec!(1_000_000) + out.accrued_interest);
        assert_eq!(out.original_principal, dec!(1_000_000));
    }

    #[test]
    fn test_zero_months_accrues_nothing() {
        let out = adjust_for_moratorium(dec!(1_000_000), dec!(8.5), 0);
        assert_eq!(out.accrued_interest, Decimal::ZERO);
        assert_eq!(out.adjusted_principal, dec!(1_000_000));
    }

    #[test]
    fn test_accrual_is_monotonic_in_months() {
        let mut previous = adjust_for_moratorium(dec!(640_000), dec!(9.1), 0);
        for months in 1..=36 {
            let current = adjust_for_moratorium(dec!(640_000), dec!(9.1), months);
            assert!(current.accrued_interest > previous.accrued_interest);
            assert!(current.adjusted_principal > previous.adjusted_principal);
            previous = current;
        }
    }

    #[test]
    fn test_accrual_is_simple_not_compound() {
        // 12% p.a. for 24 months on 100k: simple = 24,000; compound would be ~26,973
        let out = adjust_for_moratorium(dec!(100_000), dec!(12), 24);
        assert_eq!(out.accrued_interest, dec!(24_000));
    }

    #[test]
    fn test_invalid_inputs_capitalize_nothing() {
        let out = adjust_for_moratorium(dec!(-100), dec!(8), 6);
        assert_eq!(out.accrued_interest, Decimal::ZERO);
        assert_eq!(out.adjusted_principal, Decimal::ZERO);

        let out = adjust_for_moratorium(dec!(100), dec!(-8), 6);
        assert_eq!(out.adjusted_principal, dec!(100));
    }

    #[test]
    fn test_analyze_moratorium_uses_adjusted_principal() {
        let input = MoratoriumInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(8.5), dec!(20)),
            moratorium_months: 12,
        };
        let out = analyze_moratorium(&input).unwrap();
        let expected =
            solve_annuity_months(out.result.adjustment.adjusted_principal, dec!(8.5), 240);
        assert_eq!(out.result.plan, expected);
        assert!(out.result.payment_increase > Decimal::ZERO);
    }

    #[test]
    fn test_analyze_moratorium_rejects_overlong_deferral() {
        let input = MoratoriumInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(8.5), dec!(1)),
            moratorium_months: 61,
        };
        assert!(analyze_moratorium(&input).is_err());

        let zero = MoratoriumInput {
            moratorium_months: 0,
            ..input
        };
        let out = analyze_moratorium(&zero).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.payment_increase, Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_accrual_capitalizes_nothing() {
        let out = adjust_for_moratorium(Decimal::MAX, dec!(12), 60);
        assert_eq!(out.accrued_interest, Decimal::ZERO);
        assert_eq!(out.adjusted_principal, Decimal::MAX);
        assert!(accrue(Decimal::MAX, dec!(12), 60).is_none());
    }

    #[test]
    fn test_analyze_moratorium_reports_out_of_range_accrual() {
        let input = MoratoriumInput {
            terms: LoanTerms::new(Decimal::MAX, dec!(12), dec!(20)),
            moratorium_months: 60,
        };
        assert!(matches!(
            analyze_moratorium(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));

        // Accrual fits but the instalment on the adjusted principal does not.
        let input = MoratoriumInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(100_000_000_000_000_000_000), dec!(20)),
            moratorium_months: 1,
        };
        assert!(matches!(
            analyze_moratorium(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));
    }
}
