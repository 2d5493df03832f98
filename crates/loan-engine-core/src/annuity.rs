//! Fixed-payment annuity solver.
//!
//! `solve_annuity_months` is the only implementation of the EMI formula in the
//! crate; schedules, prepayment re-amortization, rate shocks and eligibility
//! all go through it (or its inverses below).

use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, warn};

use crate::amortization::{amortize_month, BALANCE_EPSILON};
use crate::error::LoanEngineError;
use crate::types::{
    monthly_rate, with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent,
};
use crate::LoanEngineResult;

pub use crate::types::MAX_TENURE_MONTHS;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monthly payment, total interest and total outlay for a fixed-rate loan.
///
/// Invalid terms (non-positive principal or tenure, negative rate, tenure
/// beyond [`MAX_TENURE_MONTHS`]) and plans too large for a `Decimal` return
/// `PaymentPlan::zero()` rather than an error.
pub fn solve_annuity(
    principal: Money,
    annual_rate_percent: Percent,
    tenure_years: Decimal,
) -> PaymentPlan {
    let terms = LoanTerms::new(principal, annual_rate_percent, tenure_years);
    if !terms.is_valid() {
        warn!(
            principal = %principal,
            annual_rate_percent = %annual_rate_percent,
            tenure_years = %tenure_years,
            "Loan terms cannot be amortized; returning zero plan"
        );
        return PaymentPlan::zero();
    }
    solve_annuity_months(principal, annual_rate_percent, terms.total_months())
}

/// Month-denominated form of [`solve_annuity`].
///
/// `P·r·(1+r)^n / ((1+r)^n − 1)`, evaluated as `P·r / (1 − (1+r)^−n)`, with
/// the straight-line `P / n` when the rate is zero.
pub fn solve_annuity_months(
    principal: Money,
    annual_rate_percent: Percent,
    months: u32,
) -> PaymentPlan {
    if principal <= Decimal::ZERO
        || annual_rate_percent < Decimal::ZERO
        || months == 0
        || months > MAX_TENURE_MONTHS
    {
        warn!(
            principal = %principal,
            annual_rate_percent = %annual_rate_percent,
            months,
            "Loan terms cannot be amortized; returning zero plan"
        );
        return PaymentPlan::zero();
    }

    match checked_plan(principal, annual_rate_percent, months) {
        Some(plan) => {
            debug!(
                principal = %principal,
                annual_rate_percent = %annual_rate_percent,
                months,
                monthly_payment = %plan.monthly_payment,
                "Solved annuity"
            );
            plan
        }
        None => {
            warn!(
                principal = %principal,
                annual_rate_percent = %annual_rate_percent,
                months,
                "Annuity exceeds the Decimal range; returning zero plan"
            );
            PaymentPlan::zero()
        }
    }
}

/// Present value of `months` level payments: the largest principal the
/// payment can fully amortize at the given rate. Zero when the result is out
/// of range.
pub fn principal_for_payment(payment: Money, annual_rate_percent: Percent, months: u32) -> Money {
    if payment <= Decimal::ZERO
        || annual_rate_percent < Decimal::ZERO
        || months == 0
        || months > MAX_TENURE_MONTHS
    {
        return Decimal::ZERO;
    }
    let n = Decimal::from(months);
    let r = monthly_rate(annual_rate_percent);
    let principal = if r.is_zero() {
        payment.checked_mul(n)
    } else {
        (payment * (Decimal::ONE - discount_factor(r, months))).checked_div(r)
    };
    principal.unwrap_or(Decimal::ZERO)
}

/// Whole months needed to retire `principal` with a fixed `payment`.
///
/// Steps the balance forward with the same monthly rule the amortization
/// schedule uses. Returns `None` when the payment does not exceed the first
/// month's interest or the payoff would take longer than
/// [`MAX_TENURE_MONTHS`].
pub fn months_to_repay(
    principal: Money,
    annual_rate_percent: Percent,
    payment: Money,
) -> Option<u32> {
    if principal <= Decimal::ZERO
        || payment <= Decimal::ZERO
        || annual_rate_percent < Decimal::ZERO
    {
        return None;
    }
    let r = monthly_rate(annual_rate_percent);
    if payment <= principal.checked_mul(r)? {
        return None;
    }

    let mut balance = principal;
    let mut months = 0u32;
    while balance >= BALANCE_EPSILON {
        if months == MAX_TENURE_MONTHS {
            return None;
        }
        balance = amortize_month(balance, r, payment, false).closing_balance;
        months += 1;
    }
    Some(months)
}

/// Validated annuity calculation wrapped in the standard output envelope.
pub fn analyze_annuity(terms: &LoanTerms) -> LoanEngineResult<ComputationOutput<PaymentPlan>> {
    let start = Instant::now();
    terms.validate()?;

    let mut warnings = Vec::new();
    if terms.annual_rate_percent.is_zero() {
        warnings.push("Zero interest rate: payment is straight-line principal / months".into());
    }

    let plan = solve_plan(terms.principal, terms.annual_rate_percent, terms.total_months())?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-payment annuity (monthly compounding)",
        terms,
        warnings,
        elapsed,
        plan,
    ))
}

/// Plan for already-validated terms; an out-of-range result is an error.
pub(crate) fn solve_plan(
    principal: Money,
    annual_rate_percent: Percent,
    months: u32,
) -> LoanEngineResult<PaymentPlan> {
    checked_plan(principal, annual_rate_percent, months).ok_or_else(|| {
        LoanEngineError::FinancialImpossibility(format!(
            "Instalment for principal {} at {}% over {} months exceeds the Decimal range",
            principal, annual_rate_percent, months
        ))
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The annuity formula with every product and quotient checked.
fn checked_plan(
    principal: Money,
    annual_rate_percent: Percent,
    months: u32,
) -> Option<PaymentPlan> {
    let n = Decimal::from(months);
    let r = monthly_rate(annual_rate_percent);
    let monthly_payment = if r.is_zero() {
        principal.checked_div(n)?
    } else {
        let annuity_factor = Decimal::ONE - discount_factor(r, months);
        principal.checked_mul(r)?.checked_div(annuity_factor)?
    };
    let total_amount = monthly_payment.checked_mul(n)?;

    Some(PaymentPlan {
        monthly_payment,
        total_interest: total_amount - principal,
        total_amount,
    })
}

/// `(1 + r)^-n` via iterative multiplication (avoids Decimal::powd drift).
/// Saturates to zero once `(1 + r)^n` no longer fits in a Decimal.
fn discount_factor(rate: Decimal, n: u32) -> Decimal {
    let factor = Decimal::ONE + rate;
    let mut growth = Decimal::ONE;
    for _ in 0..n {
        match growth.checked_mul(factor) {
            Some(g) => growth = g,
            None => return Decimal::ZERO,
        }
    }
    Decimal::ONE / growth
}
