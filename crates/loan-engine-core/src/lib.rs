pub mod amortization;
pub mod annuity;
pub mod error;
pub mod types;

#[cfg(feature = "eligibility")]
pub mod eligibility;

pub mod scenarios;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use amortization::build_amortization_schedule;
pub use annuity::solve_annuity;
pub use error::LoanEngineError;
pub use types::*;

#[cfg(feature = "eligibility")]
pub use eligibility::evaluate_eligibility;

#[cfg(feature = "moratorium")]
pub use scenarios::moratorium::adjust_for_moratorium;

#[cfg(feature = "prepayment")]
pub use scenarios::prepayment::simulate_prepayment;

#[cfg(feature = "rate_shock")]
pub use scenarios::rate_shock::compute_rate_shock;

/// Standard result type for all loan-engine operations
pub type LoanEngineResult<T> = Result<T, LoanEngineError>;
