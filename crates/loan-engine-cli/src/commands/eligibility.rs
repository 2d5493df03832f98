use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::annuity::solve_annuity;
use loan_engine_core::eligibility::{self, EligibilityInput};

use super::{read_input, TermsArgs};

/// Arguments for the eligibility evaluator
#[derive(Args)]
pub struct EligibilityArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Net monthly income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Existing monthly debt obligations
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub obligations: Decimal,

    /// Proposed monthly instalment (or give loan terms to solve it)
    #[arg(long)]
    pub payment: Option<Decimal>,

    #[command(flatten)]
    pub terms: TermsArgs,
}

pub fn run_eligibility(args: EligibilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let elig_input: EligibilityInput = match read_input(args.input.as_deref())? {
        Some(data) => data,
        None => {
            let proposed_payment = match args.payment {
                Some(payment) => payment,
                None => {
                    let terms = args.terms.to_terms()?;
                    terms.validate()?;
                    solve_annuity(terms.principal, terms.annual_rate_percent, terms.tenure_years)
                        .monthly_payment
                }
            };
            EligibilityInput {
                monthly_income: args
                    .income
                    .ok_or("--income is required (or provide --input)")?,
                existing_obligations: args.obligations,
                proposed_payment,
            }
        }
    };

    let result = eligibility::analyze_eligibility(&elig_input)?;
    Ok(serde_json::to_value(result)?)
}
