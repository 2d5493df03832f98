//! End-to-end loan analysis.
//!
//! Runs the components in calculator order: moratorium adjustment, annuity
//! solve, schedule, then the optional prepayment, rate-shock and eligibility
//! stages. The effective principal and the solved plan are computed once and
//! passed to every later stage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::{schedule_with_plan, summarize_by_year, YearlySummary};
use crate::annuity::solve_plan;
use crate::eligibility::{evaluate_eligibility, EligibilityResult};
use crate::error::LoanEngineError;
use crate::scenarios::moratorium::{
    accrual_out_of_range, accrue, validate_moratorium_months, MoratoriumResult,
};
use crate::scenarios::prepayment::{
    simulate_with_plan, validate_scenario, PrepaymentResult, PrepaymentScenario,
};
use crate::scenarios::rate_shock::{
    extension_with_plan, shock_out_of_range, shock_with_plan, ShockImpact, TenureExtension,
};
use crate::types::{
    with_metadata, ComputationOutput, LoanTerms, Money, PaymentPlan, Percent, ScheduleRow,
};
use crate::LoanEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeProfile {
    pub monthly_income: Money,
    #[serde(default)]
    pub existing_obligations: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanAnalysisInput {
    pub terms: LoanTerms,
    #[serde(default)]
    pub moratorium_months: u32,
    #[serde(default)]
    pub prepayment: Option<PrepaymentScenario>,
    #[serde(default)]
    pub rate_shock_percent: Option<Percent>,
    #[serde(default)]
    pub income: Option<IncomeProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanAnalysisOutput {
    /// Terms the plan was solved on (principal includes capitalized interest).
    pub effective_terms: LoanTerms,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moratorium: Option<MoratoriumResult>,
    pub plan: PaymentPlan,
    pub schedule: Vec<ScheduleRow>,
    pub yearly: Vec<YearlySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepayment: Option<PrepaymentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_shock: Option<ShockImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure_extension: Option<TenureExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityResult>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn analyze_loan(
    input: &LoanAnalysisInput,
) -> LoanEngineResult<ComputationOutput<LoanAnalysisOutput>> {
    let start = Instant::now();
    validate_analysis_input(input)?;

    let mut warnings = Vec::new();
    let terms = &input.terms;

    let moratorium = if input.moratorium_months > 0 {
        let adjustment = accrue(terms.principal, terms.annual_rate_percent, input.moratorium_months)
            .ok_or_else(|| accrual_out_of_range(terms.principal, input.moratorium_months))?;
        Some(adjustment)
    } else {
        None
    };

    let effective_terms = match &moratorium {
        Some(m) => LoanTerms {
            principal: m.adjusted_principal,
            ..terms.clone()
        },
        None => terms.clone(),
    };

    let months = effective_terms.total_months();
    let plan = solve_plan(
        effective_terms.principal,
        effective_terms.annual_rate_percent,
        months,
    )?;
    let schedule = schedule_with_plan(
        effective_terms.principal,
        effective_terms.annual_rate_percent,
        months,
        &plan,
    );
    let yearly = summarize_by_year(&schedule);

    let prepayment = input
        .prepayment
        .as_ref()
        .map(|scenario| simulate_with_plan(&effective_terms, months, &plan, scenario));

    let (rate_shock, tenure_extension) = match input.rate_shock_percent {
        Some(delta) => {
            let impact = shock_with_plan(&effective_terms, months, &plan, delta);
            if impact.shocked_plan.is_zero() {
                return Err(shock_out_of_range(&effective_terms, impact.shocked_rate_percent));
            }
            let ext = extension_with_plan(&effective_terms, months, &plan, delta);
            if ext.exact_months.is_none() {
                warnings.push(
                    "Current instalment does not amortize the loan at the shocked rate".into(),
                );
            }
            (Some(impact), Some(ext))
        }
        None => (None, None),
    };

    let eligibility = match &input.income {
        Some(income) => {
            let result = evaluate_eligibility(
                income.monthly_income,
                income.existing_obligations,
                plan.monthly_payment,
            );
            if result.is_none() && income.monthly_income <= Decimal::ZERO {
                warnings.push("Eligibility unavailable: monthly income must be positive".into());
            } else if result.is_none() {
                warnings.push("Eligibility unavailable: ratios exceed the Decimal range".into());
            }
            result
        }
        None => None,
    };

    debug!(
        effective_principal = %effective_terms.principal,
        monthly_payment = %plan.monthly_payment,
        "Completed loan analysis"
    );

    let output = LoanAnalysisOutput {
        effective_terms,
        moratorium,
        plan,
        schedule,
        yearly,
        prepayment,
        rate_shock,
        tenure_extension,
        eligibility,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Moratorium-adjusted annuity with scenario overlays",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_analysis_input(input: &LoanAnalysisInput) -> LoanEngineResult<()> {
    input.terms.validate()?;
    validate_moratorium_months(input.moratorium_months)?;
    if let Some(scenario) = &input.prepayment {
        validate_scenario(scenario)?;
    }
    if let Some(income) = &input.income {
        if income.existing_obligations < Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "existing_obligations",
                "Existing obligations cannot be negative",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::solve_annuity;
    use crate::eligibility::AffordabilityBand;
    use crate::scenarios::prepayment::PrepaymentStrategy;
    use rust_decimal_macros::dec;

    fn base_input() -> LoanAnalysisInput {
        LoanAnalysisInput {
            terms: LoanTerms::new(dec!(1_000_000), dec!(8.5), dec!(20)),
            moratorium_months: 0,
            prepayment: None,
            rate_shock_percent: None,
            income: None,
        }
    }

    #[test]
    fn test_plain_analysis_matches_solver() {
        let out = analyze_loan(&base_input()).unwrap();
        let plan = solve_annuity(dec!(1_000_000), dec!(8.5), dec!(20));
        assert_eq!(out.result.plan, plan);
        assert_eq!(out.result.schedule.len(), 240);
        assert_eq!(out.result.yearly.len(), 20);
        assert!(out.result.moratorium.is_none());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_moratorium_feeds_adjusted_principal_downstream() {
        let mut input = base_input();
        input.moratorium_months = 12;
        input.rate_shock_percent = Some(dec!(1));
        input.prepayment = Some(PrepaymentScenario {
            yearly_prepay_amount: dec!(50_000),
            start_year: 1,
            strategy: PrepaymentStrategy::ReduceTenure,
        });
        let out = analyze_loan(&input).unwrap().result;

        let adjusted = out.moratorium.as_ref().unwrap().adjusted_principal;
        assert_eq!(out.effective_terms.principal, adjusted);
        assert_eq!(out.plan, solve_annuity(adjusted, dec!(8.5), dec!(20)));
        assert_eq!(out.rate_shock.unwrap().base_plan, out.plan);
        assert_eq!(out.prepayment.unwrap().baseline_payment, out.plan.monthly_payment);
        // Original principal is kept only for reporting
        assert_eq!(out.moratorium.unwrap().original_principal, dec!(1_000_000));
    }

    #[test]
    fn test_eligibility_uses_solved_payment() {
        let mut input = base_input();
        input.income = Some(IncomeProfile {
            monthly_income: dec!(40_000),
            existing_obligations: dec!(5_000),
        });
        let out = analyze_loan(&input).unwrap().result;
        let elig = out.eligibility.unwrap();
        assert_eq!(elig.payment_to_income_ratio, out.plan.monthly_payment / dec!(40_000));
        assert_eq!(elig.band, AffordabilityBand::Safe);
    }

    #[test]
    fn test_zero_income_warns_instead_of_failing() {
        let mut input = base_input();
        input.income = Some(IncomeProfile {
            monthly_income: Decimal::ZERO,
            existing_obligations: Decimal::ZERO,
        });
        let out = analyze_loan(&input).unwrap();
        assert!(out.result.eligibility.is_none());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut input = base_input();
        input.terms.tenure_years = Decimal::ZERO;
        assert!(analyze_loan(&input).is_err());

        let mut input = base_input();
        input.prepayment = Some(PrepaymentScenario {
            yearly_prepay_amount: dec!(-10),
            start_year: 1,
            strategy: PrepaymentStrategy::ReduceEmi,
        });
        assert!(analyze_loan(&input).is_err());

        let mut input = base_input();
        input.moratorium_months = 120;
        assert!(analyze_loan(&input).is_err());
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let json = r#"{
            "terms": { "principal": "500000", "annual_rate_percent": "9", "tenure_years": "10" },
            "rate_shock_percent": "0.5"
        }"#;
        let input: LoanAnalysisInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.moratorium_months, 0);
        assert!(input.prepayment.is_none());
        assert_eq!(input.rate_shock_percent, Some(dec!(0.5)));
    }

    #[test]
    fn test_out_of_range_stages_are_errors() {
        let mut input = base_input();
        input.terms.principal = Decimal::MAX;
        input.moratorium_months = 60;
        assert!(matches!(
            analyze_loan(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));

        let mut input = base_input();
        input.terms.principal = Decimal::from_scientific("7e28").unwrap();
        assert!(matches!(
            analyze_loan(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));

        let mut input = base_input();
        input.rate_shock_percent = Some(Decimal::from_scientific("1e27").unwrap());
        assert!(matches!(
            analyze_loan(&input),
            Err(LoanEngineError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_tiny_income_warns_about_range() {
        let mut input = base_input();
        input.income = Some(IncomeProfile {
            monthly_income: Decimal::new(1, 28),
            existing_obligations: Decimal::ZERO,
        });
        let out = analyze_loan(&input).unwrap();
        assert!(out.result.eligibility.is_none());
        assert!(out.warnings[0].contains("Decimal range"));
    }
}
