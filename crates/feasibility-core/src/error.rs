use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeasibilityError {
    #[error("Configuration error: {field} — {reason}")]
    Configuration { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FeasibilityError {
    /// Shorthand for the configuration errors raised while validating input.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FeasibilityError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FeasibilityError {
    fn from(e: serde_json::Error) -> Self {
        FeasibilityError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_field() {
        let err = FeasibilityError::config("span", "must be at least 1 month");
        assert_eq!(
            err.to_string(),
            "Configuration error: span — must be at least 1 month"
        );
    }
}
