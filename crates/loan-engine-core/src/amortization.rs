//! Month-by-month amortization schedules built on the annuity solver.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::annuity::{solve_annuity_months, solve_plan};
use crate::types::{
    monthly_rate, with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent, Rate,
    ScheduleRow, Years, MAX_TENURE_MONTHS,
};
use crate::LoanEngineResult;

/// Minimum balance threshold below which the loan is considered fully paid.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Principal and interest paid within one loan year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlySummary {
    pub year: u32,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub closing_balance: Money,
}

/// Output of [`analyze_schedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub plan: PaymentPlan,
    pub months: u32,
    pub total_interest_paid: Money,
    pub rows: Vec<ScheduleRow>,
    pub yearly: Vec<YearlySummary>,
}

/// Result of applying one month's payment to an outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonthStep {
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Amortization schedule for the annuity payment on the given terms.
///
/// Stops as soon as the balance is retired; never longer than the tenure in
/// months. Invalid terms produce an empty schedule.
pub fn build_amortization_schedule(
    principal: Money,
    annual_rate_percent: Percent,
    tenure_years: Years,
) -> Vec<ScheduleRow> {
    let terms = LoanTerms::new(principal, annual_rate_percent, tenure_years);
    if !terms.is_valid() {
        return Vec::new();
    }
    let months = terms.total_months();
    let plan = solve_annuity_months(principal, annual_rate_percent, months);
    schedule_with_plan(principal, annual_rate_percent, months, &plan)
}

/// Schedule for an already-solved plan, so callers holding a plan do not
/// re-derive the payment.
pub fn schedule_with_plan(
    principal: Money,
    annual_rate_percent: Percent,
    months: u32,
    plan: &PaymentPlan,
) -> Vec<ScheduleRow> {
    if plan.is_zero() || principal <= Decimal::ZERO || months > MAX_TENURE_MONTHS {
        return Vec::new();
    }

    let r = monthly_rate(annual_rate_percent);
    let payment = plan.monthly_payment;
    let mut balance = principal;
    let mut rows = Vec::with_capacity(months as usize);

    for period in 1..=months {
        let step = amortize_month(balance, r, payment, period == months);
        balance = step.closing_balance;
        rows.push(ScheduleRow {
            period,
            payment: step.payment,
            principal_component: step.principal,
            interest_component: step.interest,
            remaining_balance: balance,
        });
        if balance.is_zero() {
            break;
        }
    }

    debug!(
        principal = %principal,
        months,
        rows = rows.len(),
        "Built amortization schedule"
    );
    rows
}

/// Roll a monthly schedule up into loan years (months 1–12 are year 1).
pub fn summarize_by_year(rows: &[ScheduleRow]) -> Vec<YearlySummary> {
    let mut years: Vec<YearlySummary> = Vec::with_capacity(rows.len() / 12 + 1);
    for row in rows {
        let year = (row.period - 1) / 12 + 1;
        match years.last_mut() {
            Some(current) if current.year == year => {
                current.principal_paid += row.principal_component;
                current.interest_paid += row.interest_component;
                current.closing_balance = row.remaining_balance;
            }
            _ => years.push(YearlySummary {
                year,
                principal_paid: row.principal_component,
                interest_paid: row.interest_component,
                closing_balance: row.remaining_balance,
            }),
        }
    }
    years
}

/// Sum of the interest components of a schedule.
pub fn total_interest_paid(rows: &[ScheduleRow]) -> Money {
    rows.iter().map(|r| r.interest_component).sum()
}

/// Validated schedule with its plan and yearly roll-up.
pub fn analyze_schedule(terms: &LoanTerms) -> LoanEngineResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    terms.validate()?;

    let months = terms.total_months();
    let plan = solve_plan(terms.principal, terms.annual_rate_percent, months)?;
    let rows = schedule_with_plan(terms.principal, terms.annual_rate_percent, months, &plan);
    let yearly = summarize_by_year(&rows);

    let mut warnings = Vec::new();
    if rows.len() < months as usize {
        warnings.push(format!(
            "Balance retired after {} of {} scheduled months",
            rows.len(),
            months
        ));
    }

    let output = ScheduleOutput {
        total_interest_paid: total_interest_paid(&rows),
        months: rows.len() as u32,
        plan,
        rows,
        yearly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment amortization schedule",
        terms,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Apply one level payment to `balance`.
///
/// Interest accrues on the opening balance; the rest of the payment retires
/// principal. On the final period, or once the residue would drop below
/// [`BALANCE_EPSILON`], the whole remaining balance is retired.
pub(crate) fn amortize_month(
    balance: Money,
    rate: Rate,
    payment: Money,
    is_final: bool,
) -> MonthStep {
    let interest = balance * rate;
    let principal = (payment - interest).max(Decimal::ZERO);

    if is_final || principal >= balance || balance - principal < BALANCE_EPSILON {
        return MonthStep {
            payment: balance + interest,
            interest,
            principal: balance,
            closing_balance: Decimal::ZERO,
        };
    }

    MonthStep {
        payment,
        interest,
        principal,
        closing_balance: balance - principal,
    }
}
