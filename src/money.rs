//! The single controlled rounding point between kernel-computed `f64` costs
//! and the exact `Decimal` money type.
//!
//! Design note (`spec.md` §9): shares are a pricing-curve coordinate and
//! stay `f64`; balances and trade costs are exact decimals with fixed scale
//! and must never drift from floating point subtraction/addition. Converting
//! a kernel cost to money happens exactly once, here, with banker's rounding
//! (round-half-to-even) at the money scale.

use crate::error::EngineError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal scale (digits after the point) money values are stored/rounded at.
pub const MONEY_SCALE: u32 = 8;

/// Round a kernel-computed `f64` cost into the crate's exact money type.
pub fn cost_to_money(cost: f64) -> Result<Decimal, EngineError> {
    if !cost.is_finite() {
        return Err(EngineError::Structural(format!(
            "non-finite cost produced by pricing kernel: {cost}"
        )));
    }
    let decimal = Decimal::from_f64(cost)
        .ok_or_else(|| EngineError::Structural(format!("cost {cost} not representable")))?;
    Ok(decimal.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Convert a money amount into the `f64` the kernel operates on.
pub fn money_to_f64(amount: Decimal) -> f64 {
    amount
        .to_string()
        .parse()
        .expect("Decimal's Display always parses back as f64")
}
