//! User balances and per-market positions.
//!
//! Grounded on the teacher's `users`/`user_shares` row shapes (`lmsr_api.rs`),
//! moved from SQL columns to in-process struct fields; `balance` stays a
//! `Decimal` exactly as the teacher's `rp_balance` column is, per the
//! money-precision design note.

use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_id: String,
    pub yes_shares: f64,
    pub no_shares: f64,
    pub settled: bool,
}

impl Position {
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            yes_shares: 0.0,
            no_shares: 0.0,
            settled: false,
        }
    }

    pub fn set_yes_shares(&mut self, value: f64) -> Result<(), EngineError> {
        if value < 0.0 {
            return Err(EngineError::InvalidInput(
                "yes_shares must be non-negative".to_string(),
            ));
        }
        self.yes_shares = value;
        Ok(())
    }

    pub fn set_no_shares(&mut self, value: f64) -> Result<(), EngineError> {
        if value < 0.0 {
            return Err(EngineError::InvalidInput(
                "no_shares must be non-negative".to_string(),
            ));
        }
        self.no_shares = value;
        Ok(())
    }

    pub fn clear_shares(&mut self) {
        self.yes_shares = 0.0;
        self.no_shares = 0.0;
    }

    /// `false -> true`, exactly once.
    pub fn mark_settled(&mut self) -> Result<(), EngineError> {
        if self.settled {
            return Err(EngineError::IllegalState(format!(
                "position on market {} already settled",
                self.market_id
            )));
        }
        self.settled = true;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.yes_shares < 0.0 || self.no_shares < 0.0 {
            return Err(EngineError::Structural(format!(
                "position on market {}: negative share count",
                self.market_id
            )));
        }
        if self.settled && (self.yes_shares != 0.0 || self.no_shares != 0.0) {
            return Err(EngineError::Structural(format!(
                "position on market {}: settled but shares not cleared",
                self.market_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    balance: Decimal,
    positions: HashMap<String, Position>,
}

impl User {
    pub fn new(user_id: impl Into<String>, starting_balance: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            balance: starting_balance,
            positions: HashMap::new(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn set_balance(&mut self, value: Decimal) -> Result<(), EngineError> {
        if value.is_sign_negative() {
            return Err(EngineError::InvalidInput(
                "balance must be non-negative".to_string(),
            ));
        }
        self.balance = value;
        Ok(())
    }

    pub fn position(&self, market_id: &str) -> Option<&Position> {
        self.positions.get(market_id)
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut HashMap<String, Position> {
        &mut self.positions
    }

    /// Returns the existing position for `market_id`, inserting an empty one
    /// (market_id == map key, per the ownership invariant) if absent.
    pub fn get_or_create_position(&mut self, market_id: &str) -> &mut Position {
        self.positions
            .entry(market_id.to_string())
            .or_insert_with(|| Position::new(market_id))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.balance.is_sign_negative() {
            return Err(EngineError::Structural(format!(
                "user {}: negative balance",
                self.user_id
            )));
        }
        for (market_id, position) in &self.positions {
            if &position.market_id != market_id {
                return Err(EngineError::Structural(format!(
                    "user {}: position key {} does not match position.market_id {}",
                    self.user_id, market_id, position.market_id
                )));
            }
            position.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn set_balance_rejects_negative() {
        let mut user = User::new("u1", dec!(1000));
        assert!(user.set_balance(dec!(-1)).is_err());
        assert_eq!(user.balance(), dec!(1000));
    }

    #[test]
    fn get_or_create_position_is_idempotent() {
        let mut user = User::new("u1", dec!(1000));
        assert!(user.position("m1").is_none());
        user.get_or_create_position("m1").yes_shares = 5.0;
        assert_eq!(user.position("m1").unwrap().yes_shares, 5.0);
        // second call returns the same position, doesn't reset it
        user.get_or_create_position("m1");
        assert_eq!(user.position("m1").unwrap().yes_shares, 5.0);
    }

    #[test]
    fn mark_settled_fails_on_second_call() {
        let mut pos = Position::new("m1");
        pos.set_yes_shares(10.0).unwrap();
        pos.mark_settled().unwrap();
        pos.clear_shares();
        assert!(pos.mark_settled().is_err());
    }

    #[test]
    fn validate_rejects_settled_position_with_shares() {
        let mut pos = Position::new("m1");
        pos.yes_shares = 5.0;
        pos.settled = true;
        assert!(pos.validate().is_err());
    }
}
