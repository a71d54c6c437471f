//! Error types for the breakout pipeline

use thiserror::Error;

/// Errors raised by the analysis core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BreakoutError {
    /// Structural problem with the raw bar records
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Division by zero (or by a missing value) inside a per-row calculation
    #[error("division undefined: denominator is {0}")]
    DivisionUndefined(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BreakoutError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BreakoutError>;
