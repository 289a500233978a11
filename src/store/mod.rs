//! In-process stores for markets and users.
//!
//! Grounded on `usealtoal-edgelord`'s `AppState` (a `parking_lot::RwLock`
//! wrapping shared mutable state with read/write accessor methods), applied
//! twice over: one store per collection, at the granularity chosen for the
//! concurrency model (`spec.md` §5; see `SPEC_FULL.md` §5 and `DESIGN.md`).
//! Callers needing both a market and a user locked for one trade must take
//! the market lock first, then the user lock, to avoid deadlock.

use crate::domain::{Market, User};
use crate::error::EngineError;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;

/// A single-collection store: validates on insert, otherwise a thin
/// `RwLock<HashMap>` wrapper.
pub struct Store<T> {
    items: RwLock<HashMap<String, T>>,
}

impl<T> Store<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HashMap<String, T>> {
        self.items.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, T>> {
        self.items.write()
    }

    pub fn get(&self, id: &str) -> Option<T>
    where
        T: Clone,
    {
        self.items.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.read().contains_key(id)
    }

    pub fn list(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Markets keyed by `market_id`.
pub type MarketStore = Store<Market>;

impl MarketStore {
    /// Insert a freshly validated market. Fails without mutating the store
    /// if `market_id` collides (a structural violation — ids are
    /// engine-generated and should never collide for a valid caller) or if
    /// `name` matches an existing market case-insensitively (`spec.md` §3).
    pub fn insert(&self, market: Market) -> Result<(), EngineError> {
        market.validate()?;
        let mut guard = self.items.write();
        if guard.contains_key(&market.market_id) {
            return Err(EngineError::Structural(format!(
                "duplicate market id {}",
                market.market_id
            )));
        }
        let name_lower = market.name.to_lowercase();
        if guard.values().any(|m| m.name.to_lowercase() == name_lower) {
            return Err(EngineError::DuplicateName(market.name.clone()));
        }
        guard.insert(market.market_id.clone(), market);
        Ok(())
    }

    pub fn require(&self, market_id: &str) -> Result<Market, EngineError> {
        self.get(market_id)
            .ok_or_else(|| EngineError::NotFound(format!("market {market_id}")))
    }
}

/// Users keyed by `user_id`.
pub type UserStore = Store<User>;

impl UserStore {
    /// Insert a freshly validated user. Fails without mutating the store if
    /// `user_id` is already taken.
    pub fn insert(&self, user: User) -> Result<(), EngineError> {
        user.validate()?;
        let mut guard = self.items.write();
        if guard.contains_key(&user.user_id) {
            return Err(EngineError::DuplicateUser(user.user_id.clone()));
        }
        guard.insert(user.user_id.clone(), user);
        Ok(())
    }

    pub fn require(&self, user_id: &str) -> Result<User, EngineError> {
        self.get(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insert_rejects_duplicate_market_id() {
        let store = MarketStore::new();
        let market = Market::new("m1", "first", None, 100.0).unwrap();
        store.insert(market).unwrap();

        let dup = Market::new("m1", "second", None, 50.0).unwrap();
        assert!(matches!(store.insert(dup), Err(EngineError::Structural(_))));
        // original untouched
        assert_eq!(store.require("m1").unwrap().name, "first");
    }

    #[test]
    fn insert_rejects_case_insensitive_duplicate_name() {
        let store = MarketStore::new();
        store
            .insert(Market::new("m1", "Will it rain", None, 100.0).unwrap())
            .unwrap();

        let dup = Market::new("m2", "WILL IT RAIN", None, 50.0).unwrap();
        assert!(matches!(
            store.insert(dup),
            Err(EngineError::DuplicateName(_))
        ));
        // the colliding market was never admitted
        assert!(!store.contains("m2"));
    }

    #[test]
    fn insert_rejects_duplicate_user_id() {
        let store = UserStore::new();
        store.insert(User::new("u1", dec!(100))).unwrap();
        assert!(matches!(
            store.insert(User::new("u1", dec!(5))),
            Err(EngineError::DuplicateUser(_))
        ));
    }

    #[test]
    fn require_reports_not_found() {
        let store = MarketStore::new();
        assert!(matches!(
            store.require("missing"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn write_guard_allows_in_place_mutation_under_the_lock() {
        let store = MarketStore::new();
        store
            .insert(Market::new("m1", "test", None, 100.0).unwrap())
            .unwrap();
        {
            let mut guard = store.write();
            let market = guard.get_mut("m1").unwrap();
            market.set_shares(5.0, 0.0).unwrap();
        }
        assert_eq!(store.require("m1").unwrap().q_yes, 5.0);
    }
}
