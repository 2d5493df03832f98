//! Interest-rate shock analysis.
//!
//! Re-solves the annuity at `rate + delta` and reports the change in
//! instalment and lifetime interest. The tenure projection answers the
//! alternative question: keeping today's instalment, how long would the loan
//! run at the shocked rate?

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::annuity::{months_to_repay, solve_annuity_months, solve_plan};
use crate::error::LoanEngineError;
use crate::types::{
    monthly_rate, with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent, Years,
};
use crate::LoanEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateShockInput {
    pub terms: LoanTerms,
    /// Signed change in the annual rate, in percentage points.
    pub delta_percent: Percent,
    /// Also project the tenure needed at the unchanged instalment.
    #[serde(default)]
    pub include_tenure_projection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockImpact {
    pub base_plan: PaymentPlan,
    pub shocked_plan: PaymentPlan,
    /// Additional lifetime interest; never negative.
    pub extra_interest: Money,
    /// Rate actually used for the shocked plan (floored at zero).
    pub shocked_rate_percent: Percent,
}

/// Extend-tenure-instead-of-raise-payment projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureExtension {
    pub fixed_payment: Money,
    pub shocked_rate_percent: Percent,
    pub original_months: u32,
    /// Closed-form `-ln(1 - P·r/EMI) / ln(1 + r)`; fractional.
    pub approximate_months: Option<Decimal>,
    /// Whole months from stepping the schedule forward.
    pub exact_months: Option<u32>,
    /// `exact_months - original_months`; negative when the rate falls.
    pub extra_months: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateShockOutput {
    pub impact: ShockImpact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure_extension: Option<TenureExtension>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compare the plan at the current rate with the plan at `rate + delta`.
///
/// A shocked instalment outside the `Decimal` range comes back as the zero plan.
pub fn compute_rate_shock(
    principal: Money,
    annual_rate_percent: Percent,
    tenure_years: Years,
    delta_percent: Percent,
) -> ShockImpact {
    let terms = LoanTerms::new(principal, annual_rate_percent, tenure_years);
    if !terms.is_valid() {
        return ShockImpact {
            base_plan: PaymentPlan::zero(),
            shocked_plan: PaymentPlan::zero(),
            extra_interest: Decimal::ZERO,
            shocked_rate_percent: shocked_rate(annual_rate_percent, delta_percent),
        };
    }
    let months = terms.total_months();
    let base_plan = solve_annuity_months(principal, annual_rate_percent, months);
    shock_with_plan(&terms, months, &base_plan, delta_percent)
}

/// Rate shock against an already-solved base plan.
pub fn shock_with_plan(
    terms: &LoanTerms,
    months: u32,
    base_plan: &PaymentPlan,
    delta_percent: Percent,
) -> ShockImpact {
    let shocked_rate_percent = shocked_rate(terms.annual_rate_percent, delta_percent);
    let shocked_plan = solve_annuity_months(terms.principal, shocked_rate_percent, months);
    let extra_interest =
        (shocked_plan.total_interest - base_plan.total_interest).max(Decimal::ZERO);

    debug!(
        delta_percent = %delta_percent,
        base_payment = %base_plan.monthly_payment,
        shocked_payment = %shocked_plan.monthly_payment,
        "Computed rate shock"
    );

    ShockImpact {
        base_plan: base_plan.clone(),
        shocked_plan,
        extra_interest,
        shocked_rate_percent,
    }
}

/// Tenure that amortizes the loan at the shocked rate while the instalment
/// stays at the base plan's value.
pub fn project_tenure_extension(
    principal: Money,
    annual_rate_percent: Percent,
    tenure_years: Years,
    delta_percent: Percent,
) -> TenureExtension {
    let terms = LoanTerms::new(principal, annual_rate_percent, tenure_years);
    let months = terms.total_months();
    let base_plan = if terms.is_valid() {
        solve_annuity_months(principal, annual_rate_percent, months)
    } else {
        PaymentPlan::zero()
    };
    extension_with_plan(&terms, months, &base_plan, delta_percent)
}

/// Tenure projection against an already-solved base plan.
pub fn extension_with_plan(
    terms: &LoanTerms,
    months: u32,
    base_plan: &PaymentPlan,
    delta_percent: Percent,
) -> TenureExtension {
    let shocked_rate_percent = shocked_rate(terms.annual_rate_percent, delta_percent);
    let payment = base_plan.monthly_payment;

    let approximate_months = if base_plan.is_zero() {
        None
    } else {
        log_tenure(terms.principal, monthly_rate(shocked_rate_percent), payment)
    };
    let exact_months = months_to_repay(terms.principal, shocked_rate_percent, payment);
    if exact_months.is_none() && !base_plan.is_zero() {
        warn!(
            shocked_rate_percent = %shocked_rate_percent,
            payment = %payment,
            "Instalment no longer covers monthly interest at shocked rate"
        );
    }

    TenureExtension {
        fixed_payment: payment,
        shocked_rate_percent,
        original_months: months,
        approximate_months,
        exact_months,
        extra_months: exact_months.map(|m| i64::from(m) - i64::from(months)),
    }
}

/// Validated rate shock wrapped in the standard output envelope.
pub fn analyze_rate_shock(
    input: &RateShockInput,
) -> LoanEngineResult<ComputationOutput<RateShockOutput>> {
    let start = Instant::now();
    input.terms.validate()?;

    let mut warnings = Vec::new();
    let terms = &input.terms;
    let months = terms.total_months();
    let base_plan = solve_plan(terms.principal, terms.annual_rate_percent, months)?;
    let impact = shock_with_plan(terms, months, &base_plan, input.delta_percent);
    if impact.shocked_plan.is_zero() {
        return Err(shock_out_of_range(terms, impact.shocked_rate_percent));
    }

    let raw_rate = terms.annual_rate_percent.saturating_add(input.delta_percent);
    if raw_rate < Decimal::ZERO {
        warnings.push(format!("Shocked rate {}% is negative; floored at 0%", raw_rate));
    }

    let tenure_extension = if input.include_tenure_projection {
        let ext = extension_with_plan(&input.terms, months, &base_plan, input.delta_percent);
        if ext.exact_months.is_none() {
            warnings.push(
                "Current instalment does not amortize the loan at the shocked rate".into(),
            );
        }
        Some(ext)
    } else {
        None
    };

    let output = RateShockOutput {
        impact,
        tenure_extension,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annuity re-solve at shocked rate",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn shocked_rate(annual_rate_percent: Percent, delta_percent: Percent) -> Percent {
    annual_rate_percent
        .saturating_add(delta_percent)
        .max(Decimal::ZERO)
}

pub(crate) fn shock_out_of_range(
    terms: &LoanTerms,
    shocked_rate_percent: Percent,
) -> LoanEngineError {
    LoanEngineError::FinancialImpossibility(format!(
        "Instalment for principal {} at shocked rate {}% exceeds the Decimal range",
        terms.principal, shocked_rate_percent
    ))
}

/// `n = -ln(1 - P·r/EMI) / ln(1 + r)`, or `P / EMI` at a zero rate.
fn log_tenure(principal: Money, rate: Decimal, payment: Money) -> Option<Decimal> {
    if payment <= Decimal::ZERO {
        return None;
    }
    if rate.is_zero() {
        return principal.checked_div(payment);
    }
    let remaining_fraction = Decimal::ONE - principal.checked_mul(rate)?.checked_div(payment)?;
    if remaining_fraction <= Decimal::ZERO {
        return None;
    }
    let numerator = remaining_fraction.checked_ln()?;
    let denominator = Decimal::ONE.checked_add(rate)?.checked_ln()?;
    (-numerator).checked_div(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_shock_raises_payment() {
        let impact = compute_rate_shock(dec!(2_500_000), dec!(8.5), dec!(20), dec!(1));
        assert!(impact.shocked_plan.monthly_payment > impact.base_plan.monthly_payment);
        assert!(impact.extra_interest > Decimal::ZERO);
        assert_eq!(impact.shocked_rate_percent, dec!(9.5));
        // 21,695.58 -> 23,303.28
        assert!((impact.base_plan.monthly_payment - dec!(21695.58)).abs() < dec!(0.01));
        assert!((impact.shocked_plan.monthly_payment - dec!(23303.28)).abs() < dec!(0.01));
    }

    #[test]
    fn test_negative_shock_lowers_payment_without_extra_interest() {
        let impact = compute_rate_shock(dec!(2_500_000), dec!(8.5), dec!(20), dec!(-1.5));
        assert!(impact.shocked_plan.monthly_payment < impact.base_plan.monthly_payment);
        assert_eq!(impact.extra_interest, Decimal::ZERO);
    }

    #[test]
    fn test_zero_shock_matches_base() {
        let impact = compute_rate_shock(dec!(900_000), dec!(7.75), dec!(12), Decimal::ZERO);
        assert_eq!(impact.base_plan, impact.shocked_plan);
        assert_eq!(impact.extra_interest, Decimal::ZERO);
    }

    #[test]
    fn test_shock_below_zero_floors_rate() {
        let impact = compute_rate_shock(dec!(120_000), dec!(2), dec!(1), dec!(-5));
        assert_eq!(impact.shocked_rate_percent, Decimal::ZERO);
        assert_eq!(impact.shocked_plan.monthly_payment, dec!(10_000));
    }

    #[test]
    fn test_invalid_terms_zero_impact() {
        let impact = compute_rate_shock(Decimal::ZERO, dec!(8), dec!(10), dec!(1));
        assert!(impact.base_plan.is_zero());
        assert!(impact.shocked_plan.is_zero());
        assert_eq!(impact.extra_interest, Decimal::ZERO);
    }

    #[test]
    fn test_tenure_extension_closed_form_and_exact_agree() {
        let ext = project_tenure_extension(dec!(2_500_000), dec!(8.5), dec!(20), dec!(1));
        let approx = ext.approximate_months.unwrap();
        assert!((approx - dec!(308.566)).abs() < dec!(0.01), "got {approx}");
        assert_eq!(ext.exact_months, Some(309));
        assert_eq!(ext.extra_months, Some(69));
        assert_eq!(ext.original_months, 240);
    }

    #[test]
    fn test_tenure_shortens_on_rate_cut() {
        let ext = project_tenure_extension(dec!(2_500_000), dec!(8.5), dec!(20), dec!(-1));
        assert!(ext.extra_months.unwrap() < 0);
        assert!((ext.approximate_months.unwrap() - dec!(204.42)).abs() < dec!(0.01));
    }

    #[test]
    fn test_tenure_extension_negative_amortization() {
        // 1M at 12% over 10y pays ~14,347; interest at 18% is 15,000/month.
        let ext = project_tenure_extension(dec!(1_000_000), dec!(12), dec!(10), dec!(6));
        assert_eq!(ext.approximate_months, None);
        assert_eq!(ext.exact_months, None);
        assert_eq!(ext.extra_months, None);
    }

    #[test]
    fn test_tenure_extension_zero_shocked_rate() {
        let ext = project_tenure_extension(dec!(120_000), dec!(1), dec!(1), dec!(-1));
        // Payment slightly above 10,000 so straight-line takes just under 12 months
        let approx = ext.approximate_months.unwrap();
        assert!(approx < dec!(12) && approx > dec!(11.9));
        assert_eq!(ext.exact_months, Some(12));
    }

    #[test]
    fn test_analyze_rate_shock_with_projection() {
        let input = RateShockInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(12), dec!(10)),
            delta_percent: dec!(6),
            include_tenure_projection: true,
        };
        let out = analyze_rate_shock(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.result.tenure_extension.is_some());
        assert!(out.result.impact.extra_interest > Decimal::ZERO);
    }

    #[test]
    fn test_analyze_rate_shock_rejects_bad_terms() {
        let input = RateShockInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(-1), dec!(10)),
            delta_percent: dec!(1),
            include_tenure_projection: false,
        };
        assert!(analyze_rate_shock(&input).is_err());
    }

    fn sci(value: &str) -> Decimal {
        Decimal::from_scientific(value).unwrap()
    }

    #[test]
    fn test_extreme_shock_yields_zero_shocked_plan() {
        let impact = compute_rate_shock(dec!(1_000_000), dec!(8.5), dec!(20), sci("1e27"));
        assert!(!impact.base_plan.is_zero());
        assert!(impact.shocked_plan.is_zero());
        assert_eq!(impact.extra_interest, Decimal::ZERO);

        let impact = compute_rate_shock(dec!(1_000_000), dec!(8.5), dec!(20), Decimal::MAX);
        assert_eq!(impact.shocked_rate_percent, Decimal::MAX);
        assert!(impact.shocked_plan.is_zero());

        let impact = compute_rate_shock(dec!(1_000_000), dec!(8.5), dec!(20), Decimal::MIN);
        assert_eq!(impact.shocked_rate_percent, Decimal::ZERO);
    }

    #[test]
    fn test_extreme_shock_has_no_tenure() {
        let ext = project_tenure_extension(dec!(1_000_000), dec!(8.5), dec!(20), sci("1e27"));
        assert_eq!(ext.approximate_months, None);
        assert_eq!(ext.exact_months, None);
        assert_eq!(ext.extra_months, None);
    }

    #[test]
    fn test_analyze_rate_shock_reports_out_of_range_shock() {
        let input = RateShockInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(8.5), dec!(20)),
            delta_percent: sci("1e27"),
            include_tenure_projection: true,
        };
        assert!(matches!(
            analyze_rate_shock(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));
    }
}
