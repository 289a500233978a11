//! Closed error taxonomy for the engine core.
//!
//! One variant per abstract kind in the error-handling design: validation
//! failures are raised by the innermost component that detects them and
//! propagated unchanged; nothing in this crate logs, swallows, or retries.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("amount too small to buy any shares: {0}")]
    AmountTooSmall(Decimal),

    #[error("duplicate market name: {0}")]
    DuplicateName(String),

    #[error("duplicate user: {0}")]
    DuplicateUser(String),

    #[error("structural error: {0}")]
    Structural(String),

    #[error("durability error: in-memory commit succeeded but persistence failed: {0}")]
    Durability(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
