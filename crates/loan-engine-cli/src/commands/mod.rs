pub mod eligibility;
pub mod loan;
pub mod scenarios;

use clap::Args;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;

use loan_engine_core::LoanTerms;

use crate::input;

/// Loan terms shared by every flag-driven subcommand.
#[derive(Args)]
pub struct TermsArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual interest rate in percent (8.5 means 8.5%)
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Tenure in years (fractional years round to whole months)
    #[arg(long, alias = "years")]
    pub tenure: Option<Decimal>,
}

impl TermsArgs {
    pub fn to_terms(&self) -> Result<LoanTerms, Box<dyn std::error::Error>> {
        Ok(LoanTerms::new(
            self.principal
                .ok_or("--principal is required (or provide --input)")?,
            self.annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            self.tenure
                .ok_or("--tenure is required (or provide --input)")?,
        ))
    }
}

/// Resolve a typed input from `--input`, then piped stdin.
///
/// Returns `None` when neither source is present so the caller can fall back
/// to individual flags.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        debug!(path, "Reading input file");
        return Ok(Some(input::file::read_json(path)?));
    }
    if let Some(data) = input::stdin::read_stdin()? {
        debug!("Reading input from stdin");
        return Ok(Some(serde_json::from_value(data)?));
    }
    Ok(None)
}
