//! Pure LMSR pricing kernel.
//!
//! Stateless functions over `(q_yes, q_no, b)` and an [`Outcome`]. No I/O, no
//! globals. Grounded on the teacher's `lmsr_core::{cost, prob_yes,
//! log_sum_exp}`; `shares_for_amount` departs from the teacher's closed-form
//! `delta_q_for_stake` and instead bisects, because the specification fixes
//! bisection (with a `1e-4` epsilon) as the required algorithm.

use crate::domain::outcome::Outcome;

/// Numerically stable `ln(exp(a) + exp(b))`.
#[inline]
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp()).ln()
}

/// `C(q_yes, q_no, b) = b * ln(exp(q_yes/b) + exp(q_no/b))`.
#[inline]
pub fn cost(q_yes: f64, q_no: f64, b: f64) -> f64 {
    debug_assert!(b > 0.0 && b.is_finite(), "b must be positive and finite");
    b * log_sum_exp(q_yes / b, q_no / b)
}

/// Marginal price of YES, `exp(q_yes/b) / (exp(q_yes/b) + exp(q_no/b))`.
///
/// At `q_yes = q_no = 0` this is exactly `0.5` (both exponentials are 1).
#[inline]
pub fn prob_yes(q_yes: f64, q_no: f64, b: f64) -> f64 {
    debug_assert!(b > 0.0 && b.is_finite(), "b must be positive and finite");
    let a = q_yes / b;
    let n = q_no / b;
    let m = a.max(n);
    let ey = (a - m).exp();
    let en = (n - m).exp();
    ey / (ey + en)
}

/// `(P(YES), P(NO))`, always summing to 1.
#[inline]
pub fn prices(q_yes: f64, q_no: f64, b: f64) -> (f64, f64) {
    let p_yes = prob_yes(q_yes, q_no, b);
    (p_yes, 1.0 - p_yes)
}

/// Cost to buy `delta >= 0` shares of `outcome` from state `(q_yes, q_no)`.
///
/// Strictly positive for `delta > 0` and strictly increasing in `delta`.
pub fn cost_to_buy(q_yes: f64, q_no: f64, b: f64, outcome: Outcome, delta: f64) -> f64 {
    debug_assert!(delta >= 0.0, "delta must be non-negative");
    let (new_yes, new_no) = match outcome {
        Outcome::Yes => (q_yes + delta, q_no),
        Outcome::No => (q_yes, q_no + delta),
    };
    cost(new_yes, new_no, b) - cost(q_yes, q_no, b)
}

/// The unique `delta >= 0` with `cost_to_buy(.., delta) == amount`, found by
/// bisection over `[0, U]` with `U` an expanding over-estimate.
///
/// `cost_to_buy` is continuous, strictly increasing, and zero at `delta = 0`,
/// so monotonicity guarantees a unique root. If the bracket collapses below
/// `epsilon` without separating from zero, the budget was too small to buy
/// any shares and `0.0` is returned — the trade engine is responsible for
/// rejecting that as `AmountTooSmall`.
pub fn shares_for_amount(
    q_yes: f64,
    q_no: f64,
    b: f64,
    outcome: Outcome,
    amount: f64,
    epsilon: f64,
    initial_bound_factor: f64,
    max_iters: u32,
) -> f64 {
    debug_assert!(amount > 0.0, "amount must be positive");

    let mut lo = 0.0_f64;
    let mut hi = initial_bound_factor * amount;
    while cost_to_buy(q_yes, q_no, b, outcome, hi) < amount {
        hi *= 2.0;
        if !hi.is_finite() {
            break;
        }
    }

    let mut iters = 0;
    while hi - lo > epsilon && iters < max_iters {
        let mid = lo + (hi - lo) / 2.0;
        if cost_to_buy(q_yes, q_no, b, outcome, mid) < amount {
            lo = mid;
        } else {
            hi = mid;
        }
        iters += 1;
    }

    let delta = (lo + hi) / 2.0;
    if delta < epsilon {
        0.0
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-4;
    const BOUND_FACTOR: f64 = 10.0;
    const MAX_ITERS: u32 = 200;

    fn shares(q_yes: f64, q_no: f64, b: f64, outcome: Outcome, amount: f64) -> f64 {
        shares_for_amount(q_yes, q_no, b, outcome, amount, EPS, BOUND_FACTOR, MAX_ITERS)
    }

    #[test]
    fn prices_sum_to_one_at_origin() {
        let (p_yes, p_no) = prices(0.0, 0.0, 100.0);
        assert!((p_yes - 0.5).abs() < 1e-12);
        assert!((p_no - 0.5).abs() < 1e-12);
    }

    #[test]
    fn buying_yes_moves_price_toward_yes() {
        let b = 100.0;
        let (p_yes_before, p_no_before) = prices(0.0, 0.0, b);
        let delta = shares(0.0, 0.0, b, Outcome::Yes, 10.0);
        assert!(delta > 0.0);
        let (p_yes_after, p_no_after) = prices(delta, 0.0, b);
        assert!(p_yes_after > p_yes_before);
        assert!(p_no_after < p_no_before);
    }

    #[test]
    fn cost_monotone_in_delta() {
        let b = 50.0;
        let c1 = cost_to_buy(0.0, 0.0, b, Outcome::Yes, 1.0);
        let c2 = cost_to_buy(0.0, 0.0, b, Outcome::Yes, 2.0);
        assert!(c1 > 0.0);
        assert!(c2 > c1);
    }

    #[test]
    fn symmetry_of_cost_across_outcomes() {
        let b = 75.0;
        let (q_yes, q_no, delta) = (12.0, 3.0, 4.0);
        let cost_yes = cost_to_buy(q_yes, q_no, b, Outcome::Yes, delta);
        let cost_no = cost_to_buy(q_no, q_yes, b, Outcome::No, delta);
        assert!((cost_yes - cost_no).abs() < 1e-9);
    }

    #[test]
    fn bisection_matches_scenario_from_spec() {
        // b = 100, fresh market, buy(YES, amount = 10) should land near 10.1 shares.
        let b = 100.0;
        let delta = shares(0.0, 0.0, b, Outcome::Yes, 10.0);
        assert!((delta - 10.1).abs() < 0.05, "delta={delta}");
        let cost = cost_to_buy(0.0, 0.0, b, Outcome::Yes, delta);
        assert!((cost - 10.0).abs() < EPS * 10.0, "cost={cost}");
    }

    #[test]
    fn amount_too_small_yields_zero_delta() {
        let b = 1_000_000.0;
        let delta = shares(0.0, 0.0, b, Outcome::Yes, 1e-9);
        assert_eq!(delta, 0.0);
    }

    proptest! {
        #[test]
        fn prob_always_between_zero_and_one(
            q_yes in 0.0f64..10_000.0,
            q_no in 0.0f64..10_000.0,
            b in 1.0f64..10_000.0,
        ) {
            let (p_yes, p_no) = prices(q_yes, q_no, b);
            prop_assert!(p_yes > 0.0 && p_yes < 1.0);
            prop_assert!(p_no > 0.0 && p_no < 1.0);
            prop_assert!((p_yes + p_no - 1.0).abs() < 1e-9);
        }

        #[test]
        fn cost_strictly_increasing(
            q_yes in 0.0f64..1_000.0,
            q_no in 0.0f64..1_000.0,
            b in 10.0f64..1_000.0,
            d1 in 0.01f64..50.0,
            d2 in 0.01f64..50.0,
        ) {
            let (small, large) = if d1 < d2 { (d1, d2) } else { (d2, d1) };
            prop_assume!((large - small) > 1e-6);
            let c1 = cost_to_buy(q_yes, q_no, b, Outcome::Yes, small);
            let c2 = cost_to_buy(q_yes, q_no, b, Outcome::Yes, large);
            prop_assert!(c2 > c1);
        }

        #[test]
        fn round_trip_bisection_recovers_amount(
            b in 10.0f64..5_000.0,
            amount in 1.0f64..500.0,
        ) {
            let delta = shares(0.0, 0.0, b, Outcome::Yes, amount);
            prop_assume!(delta > 0.0);
            let recovered_cost = cost_to_buy(0.0, 0.0, b, Outcome::Yes, delta);
            prop_assert!((recovered_cost - amount).abs() < 1e-2);
        }
    }
}
