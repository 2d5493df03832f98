#[cfg(feature = "moratorium")]
pub mod moratorium;

#[cfg(feature = "prepayment")]
pub mod prepayment;

#[cfg(feature = "rate_shock")]
pub mod rate_shock;
