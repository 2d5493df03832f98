use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::LoanEngineResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates and ratios expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Annual rates as the calculators collect them (8.5 = 8.5% p.a.).
pub type Percent = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Longest tenure the engine amortizes (100 years); also the bound for
/// iterative payoff searches.
pub const MAX_TENURE_MONTHS: u32 = 1200;

/// Principal, annual rate and tenure of one loan calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate_percent: Percent,
    pub tenure_years: Years,
}

impl LoanTerms {
    pub fn new(principal: Money, annual_rate_percent: Percent, tenure_years: Years) -> Self {
        Self {
            principal,
            annual_rate_percent,
            tenure_years,
        }
    }

    /// Number of monthly instalments, `round(tenure_years * 12)` with halves
    /// rounded away from zero.
    pub fn total_months(&self) -> u32 {
        years_to_months(self.tenure_years)
    }

    pub fn monthly_rate(&self) -> Rate {
        monthly_rate(self.annual_rate_percent)
    }

    /// True when the terms can be amortized: principal > 0, between one and
    /// [`MAX_TENURE_MONTHS`] months of tenure and a non-negative rate.
    pub fn is_valid(&self) -> bool {
        let months = self.total_months();
        self.principal > Decimal::ZERO
            && self.tenure_years > Decimal::ZERO
            && self.annual_rate_percent >= Decimal::ZERO
            && months > 0
            && months <= MAX_TENURE_MONTHS
    }

    pub fn validate(&self) -> LoanEngineResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "principal",
                "Principal must be positive",
            ));
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "annual_rate_percent",
                "Annual rate cannot be negative",
            ));
        }
        if self.tenure_years <= Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "tenure_years",
                "Tenure must be positive",
            ));
        }
        let months = self.total_months();
        if months == 0 {
            return Err(LoanEngineError::invalid(
                "tenure_years",
                "Tenure must round to at least one month",
            ));
        }
        if months > MAX_TENURE_MONTHS {
            return Err(LoanEngineError::invalid(
                "tenure_years",
                "Tenure cannot exceed 100 years",
            ));
        }
        Ok(())
    }
}

/// Fixed monthly payment with its lifetime totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_amount: Money,
}

impl PaymentPlan {
    /// Result for terms that cannot be amortized.
    pub fn zero() -> Self {
        Self {
            monthly_payment: Decimal::ZERO,
            total_interest: Decimal::ZERO,
            total_amount: Decimal::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.monthly_payment.is_zero()
    }
}

/// One month of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub period: u32,
    pub payment: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub remaining_balance: Money,
}

/// `annual_rate_percent / 12 / 100`
pub fn monthly_rate(annual_rate_percent: Percent) -> Rate {
    annual_rate_percent / dec!(12) / dec!(100)
}

/// Convert a tenure in years to a whole number of months. Negative or
/// non-representable tenures map to zero.
pub fn years_to_months(tenure_years: Years) -> u32 {
    if tenure_years <= Decimal::ZERO {
        return 0;
    }
    tenure_years
        .checked_mul(dec!(12))
        .and_then(|months| {
            months
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u32()
        })
        .unwrap_or(0)
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
