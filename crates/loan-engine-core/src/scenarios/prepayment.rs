//! Part-prepayment simulation.
//!
//! A fixed lump sum is paid at the end of every loan year from `start_year`
//! onwards. Under [`PrepaymentStrategy::ReduceTenure`] the instalment stays the
//! same and the loan closes early; under [`PrepaymentStrategy::ReduceEmi`] the
//! instalment is re-solved on the reduced balance over the months left.
//! Results are compared against the unmodified amortization schedule.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::{
    amortize_month, schedule_with_plan, total_interest_paid, BALANCE_EPSILON,
};
use crate::annuity::{solve_annuity_months, solve_plan};
use crate::error::LoanEngineError;
use crate::types::{
    monthly_rate, with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent, Years,
    MAX_TENURE_MONTHS,
};
use crate::LoanEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a prepayment buys the borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepaymentStrategy {
    /// Keep the instalment; finish the loan sooner.
    ReduceTenure,
    /// Keep the end date; lower the instalment after each prepayment.
    ReduceEmi,
}

/// Yearly lump-sum prepayment plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentScenario {
    pub yearly_prepay_amount: Money,
    /// First loan year (1-based) whose year-end carries a prepayment.
    pub start_year: u32,
    pub strategy: PrepaymentStrategy,
}

/// Input for [`analyze_prepayment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentInput {
    pub terms: LoanTerms,
    pub scenario: PrepaymentScenario,
}

/// One month of the prepayment schedule. `remaining_balance` is after any
/// prepayment made that month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaymentRow {
    pub period: u32,
    pub payment: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub prepayment: Money,
    pub remaining_balance: Money,
}

/// Headline savings of a prepayment scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaymentImpact {
    pub interest_saved: Money,
    pub years_reduced: Years,
    pub payment_delta: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentResult {
    pub rows: Vec<PrepaymentRow>,
    pub interest_saved: Money,
    pub years_reduced: Years,
    pub payment_delta: Money,
    pub baseline_payment: Money,
    pub final_payment: Money,
    pub baseline_total_interest: Money,
    pub scenario_total_interest: Money,
    pub baseline_months: u32,
    pub scenario_months: u32,
    pub total_prepaid: Money,
}

impl PrepaymentResult {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            interest_saved: Decimal::ZERO,
            years_reduced: Decimal::ZERO,
            payment_delta: Decimal::ZERO,
            baseline_payment: Decimal::ZERO,
            final_payment: Decimal::ZERO,
            baseline_total_interest: Decimal::ZERO,
            scenario_total_interest: Decimal::ZERO,
            baseline_months: 0,
            scenario_months: 0,
            total_prepaid: Decimal::ZERO,
        }
    }

    pub fn impact(&self) -> PrepaymentImpact {
        PrepaymentImpact {
            interest_saved: self.interest_saved,
            years_reduced: self.years_reduced,
            payment_delta: self.payment_delta,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate yearly prepayments against the baseline schedule.
///
/// Invalid loan terms give an empty result with zero savings.
pub fn simulate_prepayment(
    principal: Money,
    annual_rate_percent: Percent,
    tenure_years: Years,
    yearly_prepay_amount: Money,
    start_year: u32,
    strategy: PrepaymentStrategy,
) -> PrepaymentResult {
    let terms = LoanTerms::new(principal, annual_rate_percent, tenure_years);
    if !terms.is_valid() {
        return PrepaymentResult::empty();
    }
    let months = terms.total_months();
    let plan = solve_annuity_months(principal, annual_rate_percent, months);
    let scenario = PrepaymentScenario {
        yearly_prepay_amount,
        start_year,
        strategy,
    };
    simulate_with_plan(&terms, months, &plan, &scenario)
}

/// Simulation against an already-solved baseline plan.
pub fn simulate_with_plan(
    terms: &LoanTerms,
    months: u32,
    plan: &PaymentPlan,
    scenario: &PrepaymentScenario,
) -> PrepaymentResult {
    if plan.is_zero() || months > MAX_TENURE_MONTHS {
        return PrepaymentResult::empty();
    }

    let baseline = schedule_with_plan(terms.principal, terms.annual_rate_percent, months, plan);
    let baseline_total_interest = total_interest_paid(&baseline);
    let baseline_months = baseline.len() as u32;

    let r = monthly_rate(terms.annual_rate_percent);
    let amount = scenario.yearly_prepay_amount;
    let mut payment = plan.monthly_payment;
    let mut balance = terms.principal;
    let mut total_prepaid = Decimal::ZERO;
    let mut rows = Vec::with_capacity(months as usize);

    for month in 1..=months {
        let step = amortize_month(balance, r, payment, month == months);
        balance = step.closing_balance;

        let mut prepayment = Decimal::ZERO;
        if month % 12 == 0
            && month / 12 >= scenario.start_year
            && amount > Decimal::ZERO
            && balance > Decimal::ZERO
        {
            prepayment = amount.min(balance);
            balance -= prepayment;
            if balance < BALANCE_EPSILON {
                prepayment += balance;
                balance = Decimal::ZERO;
            }
            total_prepaid += prepayment;

            if scenario.strategy == PrepaymentStrategy::ReduceEmi && !balance.is_zero() {
                let remaining = months.saturating_sub(month).max(1);
                payment = solve_annuity_months(balance, terms.annual_rate_percent, remaining)
                    .monthly_payment;
                debug!(
                    month,
                    remaining,
                    payment = %payment,
                    "Re-solved instalment after prepayment"
                );
            }
        }

        rows.push(PrepaymentRow {
            period: month,
            payment: step.payment,
            principal_component: step.principal,
            interest_component: step.interest,
            prepayment,
            remaining_balance: balance,
        });

        if balance.is_zero() {
            break;
        }
    }

    let scenario_total_interest: Money = rows.iter().map(|r| r.interest_component).sum();
    let scenario_months = rows.len() as u32;
    let months_saved = Decimal::from(baseline_months) - Decimal::from(scenario_months);

    PrepaymentResult {
        interest_saved: (baseline_total_interest - scenario_total_interest).max(Decimal::ZERO),
        years_reduced: (months_saved / dec!(12)).max(Decimal::ZERO),
        payment_delta: (payment - plan.monthly_payment).abs(),
        baseline_payment: plan.monthly_payment,
        final_payment: payment,
        baseline_total_interest,
        scenario_total_interest,
        baseline_months,
        scenario_months,
        total_prepaid,
        rows,
    }
}

/// Validated prepayment simulation wrapped in the standard output envelope.
pub fn analyze_prepayment(
    input: &PrepaymentInput,
) -> LoanEngineResult<ComputationOutput<PrepaymentResult>> {
    let start = Instant::now();
    input.terms.validate()?;
    validate_scenario(&input.scenario)?;

    let mut warnings = Vec::new();
    let months = input.terms.total_months();
    let scenario = &input.scenario;

    if scenario.start_year.saturating_mul(12) >= months {
        warnings.push(format!(
            "Start year {} has no year-end before the loan closes; scenario equals baseline",
            scenario.start_year
        ));
    }
    if scenario.yearly_prepay_amount.is_zero() {
        warnings.push("Prepayment amount is zero; scenario equals baseline".into());
    }

    let plan = solve_plan(input.terms.principal, input.terms.annual_rate_percent, months)?;
    let result = simulate_with_plan(&input.terms, months, &plan, scenario);

    if let Some(last) = result.rows.last() {
        if last.prepayment > Decimal::ZERO && last.remaining_balance.is_zero() {
            warnings.push(format!(
                "Loan fully repaid by the prepayment in month {}",
                last.period
            ));
        }
    }

    let methodology = match scenario.strategy {
        PrepaymentStrategy::ReduceTenure => "Yearly prepayment, tenure reduction",
        PrepaymentStrategy::ReduceEmi => "Yearly prepayment, EMI reduction",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, result))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_scenario(scenario: &PrepaymentScenario) -> LoanEngineResult<()> {
    if scenario.yearly_prepay_amount < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "yearly_prepay_amount",
            "Prepayment amount cannot be negative",
        ));
    }
    if scenario.start_year == 0 {
        return Err(LoanEngineError::invalid(
            "start_year",
            "Start year is 1-based and must be at least 1",
        ));
    }
    Ok(())
}
