use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::scenarios::moratorium::{self, MoratoriumInput};
use loan_engine_core::scenarios::prepayment::{
    self, PrepaymentInput, PrepaymentScenario, PrepaymentStrategy,
};
use loan_engine_core::scenarios::rate_shock::{self, RateShockInput};

use super::{read_input, TermsArgs};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Keep the instalment, finish earlier
    ReduceTenure,
    /// Keep the end date, lower the instalment
    ReduceEmi,
}

impl From<StrategyArg> for PrepaymentStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::ReduceTenure => PrepaymentStrategy::ReduceTenure,
            StrategyArg::ReduceEmi => PrepaymentStrategy::ReduceEmi,
        }
    }
}

/// Arguments for the prepayment simulator
#[derive(Args)]
pub struct PrepayArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub terms: TermsArgs,

    /// Lump sum paid at each anniversary
    #[arg(long)]
    pub yearly_amount: Option<Decimal>,

    /// First loan year (1-based) whose year-end receives a prepayment
    #[arg(long, default_value_t = 1)]
    pub start_year: u32,

    /// What the borrower does with the freed-up principal
    #[arg(long, value_enum, default_value = "reduce-tenure")]
    pub strategy: StrategyArg,
}

/// Arguments for the rate-shock analyzer
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RateShockArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub terms: TermsArgs,

    /// Change in annual rate in percentage points (may be negative)
    #[arg(long)]
    pub delta: Option<Decimal>,

    /// Also project how long the current instalment takes at the new rate
    #[arg(long)]
    pub extend_tenure: bool,
}

/// Arguments for the moratorium adjuster
#[derive(Args)]
pub struct MoratoriumArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub terms: TermsArgs,

    /// Months of deferred repayment
    #[arg(long)]
    pub months: Option<u32>,
}

pub fn run_prepay(args: PrepayArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let prepay_input: PrepaymentInput = match read_input(args.input.as_deref())? {
        Some(data) => data,
        None => PrepaymentInput {
            terms: args.terms.to_terms()?,
            scenario: PrepaymentScenario {
                yearly_prepay_amount: args
                    .yearly_amount
                    .ok_or("--yearly-amount is required (or provide --input)")?,
                start_year: args.start_year,
                strategy: args.strategy.into(),
            },
        },
    };

    let result = prepayment::analyze_prepayment(&prepay_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_rate_shock(args: RateShockArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let shock_input: RateShockInput = match read_input(args.input.as_deref())? {
        Some(data) => data,
        None => RateShockInput {
            terms: args.terms.to_terms()?,
            delta_percent: args
                .delta
                .ok_or("--delta is required (or provide --input)")?,
            include_tenure_projection: args.extend_tenure,
        },
    };

    let result = rate_shock::analyze_rate_shock(&shock_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_moratorium(args: MoratoriumArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let moratorium_input: MoratoriumInput = match read_input(args.input.as_deref())? {
        Some(data) => data,
        None => MoratoriumInput {
            terms: args.terms.to_terms()?,
            moratorium_months: args
                .months
                .ok_or("--months is required (or provide --input)")?,
        },
    };

    let result = moratorium::analyze_moratorium(&moratorium_input)?;
    Ok(serde_json::to_value(result)?)
}
