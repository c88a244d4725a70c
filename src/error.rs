use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpFinanceError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

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

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Schema mismatch: missing required column {column} in table {table}")]
    SchemaMismatch { table: String, column: String },

    #[error("Unknown regulatory framework: {0}")]
    UnknownFramework(String),

    #[error("Unknown calculation approach: {0}")]
    UnknownApproach(String),

    #[error("Configuration field out of range: {field} — {reason}")]
    ConfigurationOutOfRange { field: String, reason: String },
}

impl From<serde_json::Error> for CorpFinanceError {
    fn from(e: serde_json::Error) -> Self {
        CorpFinanceError::SerializationError(e.to_string())
    }
}
