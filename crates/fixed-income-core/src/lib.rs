pub mod day_count;
pub mod error;
pub mod math;
pub mod types;

#[cfg(feature = "fixed_income")]
pub mod fixed_income;

#[cfg(feature = "credit_derivatives")]
pub mod credit_derivatives;

#[cfg(feature = "credit_portfolio")]
pub mod credit_portfolio;

pub use day_count::DayCountConvention;
pub use error::FixedIncomeError;
pub use types::*;

/// Standard result type for all fixed-income operations
pub type FixedIncomeResult<T> = Result<T, FixedIncomeError>;
