use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixedIncomeError {
    #[error("Invalid instrument {field}: {reason}")]
    InvalidInstrument { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    Convergence {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid date range: end {end} must be after start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid input {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FixedIncomeError {
    /// True for the generic domain-logic violations (bad date ranges, rates
    /// out of bounds, impossible intermediate values) as opposed to malformed
    /// instruments, solver failures or missing data.
    pub fn is_calculation_error(&self) -> bool {
        matches!(
            self,
            FixedIncomeError::InvalidDateRange { .. }
                | FixedIncomeError::InvalidInput { .. }
                | FixedIncomeError::FinancialImpossibility(_)
                | FixedIncomeError::DivisionByZero { .. }
        )
    }

    pub(crate) fn invalid_instrument(field: &str, reason: impl Into<String>) -> Self {
        FixedIncomeError::InvalidInstrument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        FixedIncomeError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FixedIncomeError {
    fn from(e: serde_json::Error) -> Self {
        FixedIncomeError::SerializationError(e.to_string())
    }
}
