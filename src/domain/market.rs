//! Market state and lifecycle. Generalizes the teacher's `lmsr_core::Market`
//! (which is pure `(q_yes, q_no, b)`) with the `status`/`resolved_outcome`
//! lifecycle the teacher instead tracks as an `Option<String>` column.

use crate::error::EngineError;
use crate::kernel;
use crate::domain::outcome::Outcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub market_id: String,
    pub name: String,
    pub description: Option<String>,
    pub q_yes: f64,
    pub q_no: f64,
    pub b: f64,
    pub status: MarketStatus,
    pub resolved_outcome: Option<Outcome>,
}

impl Market {
    /// A freshly created market: OPEN, at `(q_yes=0, q_no=0)`.
    pub fn new(
        market_id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        b: f64,
    ) -> Result<Self, EngineError> {
        if !(b.is_finite() && b > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "liquidity parameter b must be positive and finite, got {b}"
            )));
        }
        Ok(Self {
            market_id: market_id.into(),
            name: name.into(),
            description,
            q_yes: 0.0,
            q_no: 0.0,
            b,
            status: MarketStatus::Open,
            resolved_outcome: None,
        })
    }

    pub fn get_prices(&self) -> (f64, f64) {
        kernel::prices(self.q_yes, self.q_no, self.b)
    }

    pub fn cost_to_buy(&self, outcome: Outcome, delta: f64) -> f64 {
        kernel::cost_to_buy(self.q_yes, self.q_no, self.b, outcome, delta)
    }

    /// Add `delta >= 0` shares of `outcome`. Fails (state unchanged) unless
    /// the market is OPEN and `delta` is non-negative.
    pub fn apply_shares(&mut self, outcome: Outcome, delta: f64) -> Result<(), EngineError> {
        if self.status != MarketStatus::Open {
            return Err(EngineError::IllegalState(format!(
                "market {} is not OPEN",
                self.market_id
            )));
        }
        if delta < 0.0 {
            return Err(EngineError::InvalidInput(
                "share delta must be non-negative".to_string(),
            ));
        }
        match outcome {
            Outcome::Yes => self.q_yes += delta,
            Outcome::No => self.q_no += delta,
        }
        Ok(())
    }

    /// Overwrite both share counts directly. Fails (state unchanged) unless
    /// the market is OPEN and both counts are non-negative.
    pub fn set_shares(&mut self, q_yes: f64, q_no: f64) -> Result<(), EngineError> {
        if self.status != MarketStatus::Open {
            return Err(EngineError::IllegalState(format!(
                "market {} is not OPEN",
                self.market_id
            )));
        }
        if q_yes < 0.0 || q_no < 0.0 {
            return Err(EngineError::InvalidInput(
                "share counts must be non-negative".to_string(),
            ));
        }
        self.q_yes = q_yes;
        self.q_no = q_no;
        Ok(())
    }

    /// OPEN -> RESOLVED, exactly once.
    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), EngineError> {
        if self.status != MarketStatus::Open {
            return Err(EngineError::IllegalState(format!(
                "market {} is already resolved",
                self.market_id
            )));
        }
        self.status = MarketStatus::Resolved;
        self.resolved_outcome = Some(outcome);
        Ok(())
    }

    /// Re-checks the structural invariants; used after a load from storage.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.b.is_finite() && self.b > 0.0) {
            return Err(EngineError::Structural(format!(
                "market {}: b must be positive and finite, got {}",
                self.market_id, self.b
            )));
        }
        if self.q_yes < 0.0 || self.q_no < 0.0 {
            return Err(EngineError::Structural(format!(
                "market {}: share counts must be non-negative",
                self.market_id
            )));
        }
        match (self.status, self.resolved_outcome) {
            (MarketStatus::Open, None) => Ok(()),
            (MarketStatus::Resolved, Some(_)) => Ok(()),
            _ => Err(EngineError::Structural(format!(
                "market {}: status/resolved_outcome mismatch",
                self.market_id
            ))),
        }
    }
}
