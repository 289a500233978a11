//! Market settlement: flat 1-per-winning-share payout, applied once per user.
//!
//! Grounded on the teacher's `resolve_event_transaction` (resolve the event,
//! then walk every holder and pay out), generalized to the in-process
//! `Position.settled` flag instead of a `user_shares.settled` column checked
//! via SQL `WHERE settled = false`.

use crate::domain::{Market, Outcome, User};
use crate::error::EngineError;

/// Resolve `market` to `winner`. Fails (state unchanged) if the market is
/// already resolved.
pub fn resolve_market(market: &mut Market, winner: Outcome) -> Result<(), EngineError> {
    market.resolve(winner)
}

fn resolved_winner(market: &Market) -> Result<Outcome, EngineError> {
    market.resolved_outcome.ok_or_else(|| {
        EngineError::IllegalState(format!("market {} is not resolved", market.market_id))
    })
}

/// Pay `market_id`'s winning side into `user`'s balance and clear/mark-settled
/// the position. Caller must have already confirmed the position exists and
/// is unsettled.
fn apply_payout(user: &mut User, market_id: &str, winner: Outcome) -> Result<(), EngineError> {
    let winning_shares = {
        let position = user
            .positions_mut()
            .get_mut(market_id)
            .expect("caller checked position exists");
        match winner {
            Outcome::Yes => position.yes_shares,
            Outcome::No => position.no_shares,
        }
    };

    // Flat 1-per-winning-share payout; losing shares pay nothing.
    let payout = crate::money::cost_to_money(winning_shares)?;
    let new_balance = user.balance() + payout;
    user.set_balance(new_balance)
        .expect("payout is non-negative, balance only grows");

    let position = user
        .positions_mut()
        .get_mut(market_id)
        .expect("checked present above");
    position.clear_shares();
    position.mark_settled()?;
    Ok(())
}

/// Settle one user's position on an already-resolved `market`.
///
/// Strict: requires the position to exist and not already be settled,
/// per `spec.md` §4.5 — for callers and tests that know the position is
/// there and want a double-settle attempt to surface as an error rather
/// than silently doing nothing. [`settle_all`] is the lenient, idempotent
/// variant for bulk settlement over every user in a store.
pub fn settle_user(user: &mut User, market: &Market) -> Result<(), EngineError> {
    let winner = resolved_winner(market)?;

    let position = user
        .positions_mut()
        .get_mut(&market.market_id)
        .ok_or_else(|| {
            EngineError::NotFound(format!(
                "user {} has no position on market {}",
                user.user_id, market.market_id
            ))
        })?;
    if position.settled {
        return Err(EngineError::IllegalState(format!(
            "user {} position on market {} already settled",
            user.user_id, market.market_id
        )));
    }

    apply_payout(user, &market.market_id, winner)
}

/// Settle `user`'s position on `market` if one exists and isn't already
/// settled; otherwise a no-op. Backs [`settle_all`]'s idempotent bulk sweep.
fn settle_user_if_present(user: &mut User, market: &Market) -> Result<(), EngineError> {
    let winner = resolved_winner(market)?;
    match user.positions_mut().get(&market.market_id) {
        None => return Ok(()),
        Some(position) if position.settled => return Ok(()),
        Some(_) => {}
    }
    apply_payout(user, &market.market_id, winner)
}

/// Settle every user holding a position on `market`. Resolution itself is
/// the caller's job (via [`resolve_market`]) so this can be called once per
/// user as positions are discovered, or in bulk over a full user store.
///
/// Idempotent: a user with no position, or whose position is already
/// settled, is silently skipped — running this twice over the same store
/// produces the same balances as running it once.
pub fn settle_all<'a>(
    users: impl IntoIterator<Item = &'a mut User>,
    market: &Market,
) -> Result<(), EngineError> {
    for user in users {
        settle_user_if_present(user, market)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn resolved_market(winner: Outcome) -> Market {
        let mut m = Market::new("m1", "Test market", None, 100.0).unwrap();
        m.resolve(winner).unwrap();
        m
    }

    #[test]
    fn settling_winning_position_pays_out_and_clears_shares() {
        let mut user = User::new("u1", dec!(0));
        let pos = user.get_or_create_position("m1");
        pos.set_yes_shares(10.0).unwrap();
        let market = resolved_market(Outcome::Yes);

        settle_user(&mut user, &market).unwrap();

        assert_eq!(user.balance(), dec!(10));
        let pos = user.position("m1").unwrap();
        assert_eq!(pos.yes_shares, 0.0);
        assert_eq!(pos.no_shares, 0.0);
        assert!(pos.settled);
    }

    #[test]
    fn settling_losing_position_pays_nothing_but_still_clears() {
        let mut user = User::new("u1", dec!(0));
        let pos = user.get_or_create_position("m1");
        pos.set_no_shares(10.0).unwrap();
        let market = resolved_market(Outcome::Yes);

        settle_user(&mut user, &market).unwrap();

        assert_eq!(user.balance(), dec!(0));
        assert!(user.position("m1").unwrap().settled);
    }

    #[test]
    fn settle_all_is_idempotent() {
        let mut user = User::new("u1", dec!(0));
        let pos = user.get_or_create_position("m1");
        pos.set_yes_shares(10.0).unwrap();
        let market = resolved_market(Outcome::Yes);

        settle_all([&mut user], &market).unwrap();
        let balance_after_first = user.balance();
        settle_all([&mut user], &market).unwrap();

        assert_eq!(user.balance(), balance_after_first);
    }

    #[test]
    fn settle_user_rejects_double_settle() {
        let mut user = User::new("u1", dec!(0));
        let pos = user.get_or_create_position("m1");
        pos.set_yes_shares(10.0).unwrap();
        let market = resolved_market(Outcome::Yes);

        settle_user(&mut user, &market).unwrap();
        assert!(matches!(
            settle_user(&mut user, &market),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn settle_all_skips_user_with_no_position() {
        let mut user = User::new("u1", dec!(5));
        let market = resolved_market(Outcome::Yes);
        settle_all([&mut user], &market).unwrap();
        assert_eq!(user.balance(), dec!(5));
    }

    #[test]
    fn settle_user_rejects_missing_position() {
        let mut user = User::new("u1", dec!(5));
        let market = resolved_market(Outcome::Yes);
        assert!(matches!(
            settle_user(&mut user, &market),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn settle_user_rejects_unresolved_market() {
        let mut user = User::new("u1", dec!(0));
        let market = Market::new("m1", "Test market", None, 100.0).unwrap();
        assert!(settle_user(&mut user, &market).is_err());
    }

    #[test]
    fn settle_all_covers_every_user() {
        let mut alice = User::new("alice", dec!(0));
        alice.get_or_create_position("m1").set_yes_shares(4.0).unwrap();
        let mut bob = User::new("bob", dec!(0));
        bob.get_or_create_position("m1").set_no_shares(6.0).unwrap();
        let market = resolved_market(Outcome::Yes);

        settle_all([&mut alice, &mut bob], &market).unwrap();

        assert_eq!(alice.balance(), dec!(4));
        assert_eq!(bob.balance(), dec!(0));
    }
}
