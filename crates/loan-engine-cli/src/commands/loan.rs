use clap::Args;
use serde_json::Value;

use loan_engine_core::amortization;
use loan_engine_core::analysis::{self, LoanAnalysisInput};
use loan_engine_core::annuity;
use loan_engine_core::LoanTerms;

use super::{read_input, TermsArgs};

/// Arguments for the instalment solver
#[derive(Args)]
pub struct EmiArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub terms: TermsArgs,
}

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub terms: TermsArgs,

    /// Print only the year-end summaries instead of every month
    #[arg(long)]
    pub yearly: bool,
}

/// Arguments for the full analysis pipeline
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_emi(args: EmiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = match read_input(args.input.as_deref())? {
        Some(terms) => terms,
        None => args.terms.to_terms()?,
    };

    let result = annuity::analyze_annuity(&terms)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = match read_input(args.input.as_deref())? {
        Some(terms) => terms,
        None => args.terms.to_terms()?,
    };

    let mut value = serde_json::to_value(amortization::analyze_schedule(&terms)?)?;
    if args.yearly {
        if let Some(Value::Object(result)) = value.get_mut("result") {
            result.remove("rows");
        }
    }
    Ok(value)
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input: LoanAnalysisInput = read_input(args.input.as_deref())?
        .ok_or("--input file (or JSON on stdin) is required for the full analysis")?;

    let result = analysis::analyze_loan(&analysis_input)?;
    Ok(serde_json::to_value(result)?)
}
