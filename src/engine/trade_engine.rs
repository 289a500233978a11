//! The trade engine: the only place user balance, market shares, and
//! positions change in lockstep.
//!
//! Grounded on the teacher's `update_market_transaction` (fetch state under
//! lock, compute deltas, write once), generalized from SQL row mutations to
//! in-process struct mutation. Phase separation is made structural here
//! rather than leaning on a database rollback: phase 1 only computes a
//! `TradePlan`, phase 2 is the sole code path allowed to write.

use crate::domain::{Market, Outcome, Trade, User};
use crate::error::EngineError;
use crate::kernel;
use crate::money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Everything phase 1 computes before any mutation is allowed to happen.
struct TradePlan {
    delta: f64,
    cost: Decimal,
    new_q_yes: f64,
    new_q_no: f64,
    new_balance: Decimal,
    new_position_yes: f64,
    new_position_no: f64,
}

fn plan_trade(user: &User, market: &Market, outcome: Outcome, delta: f64) -> Result<TradePlan, EngineError> {
    // Step 2: reject non-positive share request.
    if delta <= 0.0 {
        return Err(EngineError::InvalidInput(
            "shares to buy must be positive".to_string(),
        ));
    }
    // Step 3: reject trades on a non-OPEN market.
    if market.status != crate::domain::MarketStatus::Open {
        return Err(EngineError::IllegalState(format!(
            "market {} is not OPEN",
            market.market_id
        )));
    }

    // Step 1: price the trade.
    let raw_cost = market.cost_to_buy(outcome, delta);
    // Step 4: a pricing invariant broken is a bug, not a user-facing error path.
    if raw_cost < 0.0 {
        return Err(EngineError::Structural(format!(
            "pricing kernel returned negative cost {raw_cost} for market {}",
            market.market_id
        )));
    }
    let cost = money::cost_to_money(raw_cost)?;

    // Step 5: balance check.
    let balance = user.balance();
    if balance < cost {
        return Err(EngineError::InsufficientBalance {
            required: cost,
            available: balance,
        });
    }

    // Step 6: new market share counts.
    let (new_q_yes, new_q_no) = match outcome {
        Outcome::Yes => (market.q_yes + delta, market.q_no),
        Outcome::No => (market.q_yes, market.q_no + delta),
    };

    // Step 7: new balance.
    let new_balance = balance - cost;

    // Step 8: new position share counts (position may not exist yet).
    let existing = user.position(&market.market_id);
    let (existing_yes, existing_no) = existing
        .map(|p| (p.yes_shares, p.no_shares))
        .unwrap_or((0.0, 0.0));
    let (new_position_yes, new_position_no) = match outcome {
        Outcome::Yes => (existing_yes + delta, existing_no),
        Outcome::No => (existing_yes, existing_no + delta),
    };

    Ok(TradePlan {
        delta,
        cost,
        new_q_yes,
        new_q_no,
        new_balance,
        new_position_yes,
        new_position_no,
    })
}

/// Phase 2: apply a computed plan. Must not fail.
fn apply_trade(user: &mut User, market: &mut Market, outcome: Outcome, plan: &TradePlan) {
    // Step 9: write market shares (via set_shares, market is already known
    // OPEN and the new counts are non-negative by construction).
    market
        .set_shares(plan.new_q_yes, plan.new_q_no)
        .expect("phase 1 guaranteed an OPEN market and non-negative shares");

    // Step 10: write balance.
    user.set_balance(plan.new_balance)
        .expect("phase 1 guaranteed a non-negative balance");

    // Step 11: create the position if absent, then write its shares.
    let position = user.get_or_create_position(&market.market_id);
    position
        .set_yes_shares(plan.new_position_yes)
        .expect("phase 1 guaranteed non-negative position shares");
    position
        .set_no_shares(plan.new_position_no)
        .expect("phase 1 guaranteed non-negative position shares");
    let _ = outcome; // outcome only needed for plan, kept for call-site symmetry
}

/// Buy an explicit `delta >= 0` shares of `outcome`.
///
/// Atomic: if any phase-1 check fails, `user`, `market`, and the user's
/// position are left bit-for-bit unchanged, and no position is created.
pub fn buy_shares(
    user: &mut User,
    market: &mut Market,
    outcome: Outcome,
    delta: f64,
    now: DateTime<Utc>,
) -> Result<Trade, EngineError> {
    let plan = plan_trade(user, market, outcome, delta)?;
    apply_trade(user, market, outcome, &plan);
    Ok(Trade::new(
        user.user_id.clone(),
        market.market_id.clone(),
        outcome,
        plan.delta,
        plan.cost,
        now,
    ))
}

/// Buy as many shares of `outcome` as `amount` affords, via the kernel's
/// bisection search, then proceed exactly as [`buy_shares`].
#[allow(clippy::too_many_arguments)]
pub fn buy_with_budget(
    user: &mut User,
    market: &mut Market,
    outcome: Outcome,
    amount: Decimal,
    epsilon: f64,
    initial_bound_factor: f64,
    max_iters: u32,
    now: DateTime<Utc>,
) -> Result<Trade, EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(
            "amount must be positive".to_string(),
        ));
    }
    if market.status != crate::domain::MarketStatus::Open {
        return Err(EngineError::IllegalState(format!(
            "market {} is not OPEN",
            market.market_id
        )));
    }

    let delta = kernel::shares_for_amount(
        market.q_yes,
        market.q_no,
        market.b,
        outcome,
        money::money_to_f64(amount),
        epsilon,
        initial_bound_factor,
        max_iters,
    );
    if delta <= 0.0 {
        return Err(EngineError::AmountTooSmall(amount));
    }

    buy_shares(user, market, outcome, delta, now)
}
