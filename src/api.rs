//! The `Engine` façade: the typed operations surrounding layers (HTTP,
//! CLI, whatever) translate requests into. Adapted from the teacher's
//! `lmsr_api.rs` public functions — same operation surface, moved from
//! async/SQL to synchronous/in-memory plus an explicit persistence call.

use crate::config::EngineConfig;
use crate::domain::{Market, MarketStatus, Outcome, Trade, User};
use crate::engine::{settlement, trade_engine};
use crate::error::{EngineError, EngineResult};
use crate::persistence::{PersistenceBackend, Snapshot};
use crate::store::{MarketStore, UserStore};
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Read projection of a market: deliberately omits `qYes`/`qNo`/`b`
/// per `spec.md` §6 — those are pricing-kernel internals, not a client view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketView {
    pub market_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: MarketStatus,
    pub resolved_outcome: Option<Outcome>,
}

impl From<&Market> for MarketView {
    fn from(market: &Market) -> Self {
        Self {
            market_id: market.market_id.clone(),
            name: market.name.clone(),
            description: market.description.clone(),
            status: market.status,
            resolved_outcome: market.resolved_outcome,
        }
    }
}

/// Minimal user projection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserView {
    pub user_id: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
        }
    }
}

/// The "me" projection: balance and positions, for a caller that already
/// knows which user it is.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserDetail {
    pub user_id: String,
    pub balance: Decimal,
    pub positions: Vec<crate::domain::Position>,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            balance: user.balance(),
            positions: user.positions().values().cloned().collect(),
        }
    }
}

/// The prediction-market engine: in-memory stores plus a persistence
/// backend invoked after every successful mutation, per `spec.md` §4.7.
///
/// Lock order for any operation touching both stores: market store first,
/// then user store (see `src/store/mod.rs`).
pub struct Engine<B: PersistenceBackend> {
    markets: MarketStore,
    users: UserStore,
    trades: parking_lot::RwLock<Vec<Trade>>,
    backend: B,
    config: EngineConfig,
}

impl<B: PersistenceBackend> Engine<B> {
    /// Load all state from `backend` and populate the in-memory stores.
    pub fn load(backend: B, config: EngineConfig) -> EngineResult<Self> {
        let Snapshot {
            markets,
            users,
            trades,
        } = backend.load_all()?;

        let market_store = MarketStore::new();
        for market in markets {
            market_store.insert(market)?;
        }
        let user_store = UserStore::new();
        for user in users {
            user_store.insert(user)?;
        }

        Ok(Self {
            markets: market_store,
            users: user_store,
            trades: parking_lot::RwLock::new(trades),
            backend,
            config,
        })
    }

    /// Write the current in-memory state back through the backend.
    /// `spec.md` §9: this runs strictly after the in-memory mutation that
    /// triggered it has already committed.
    fn persist(&self) -> EngineResult<()> {
        let snapshot = Snapshot {
            markets: self.markets.list(),
            users: self.users.list(),
            trades: self.trades.read().clone(),
        };
        self.backend
            .save_all(&snapshot)
            .map_err(|e| EngineError::Durability(e.to_string()))
    }

    /// Create a market, generating its `marketId` (`spec.md` §6 takes no id
    /// parameter; ids are engine-assigned, same role `uuid` plays everywhere
    /// else a `SERIAL`/`RETURNING id` has no equivalent).
    pub fn create_market(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        liquidity: f64,
    ) -> EngineResult<String> {
        let market_id = uuid::Uuid::new_v4().to_string();
        let market = Market::new(market_id, name, description, liquidity)?;
        let market_id = market.market_id.clone();
        self.markets.insert(market)?;
        self.persist()?;
        Ok(market_id)
    }

    pub fn list_markets(&self, status_filter: Option<MarketStatus>) -> Vec<MarketView> {
        self.markets
            .list()
            .iter()
            .filter(|m| status_filter.map_or(true, |s| m.status == s))
            .map(MarketView::from)
            .collect()
    }

    pub fn get_market(&self, market_id: &str) -> EngineResult<MarketView> {
        Ok(MarketView::from(&self.markets.require(market_id)?))
    }

    /// Resolve a market and settle every user holding a position on it.
    pub fn resolve_market(&self, market_id: &str, outcome: Outcome) -> EngineResult<()> {
        let mut market_guard = self.markets.write();
        let market = market_guard
            .get_mut(market_id)
            .ok_or_else(|| EngineError::NotFound(format!("market {market_id}")))?;
        settlement::resolve_market(market, outcome)?;
        let market_snapshot = market.clone();
        drop(market_guard);

        let mut user_guard = self.users.write();
        settlement::settle_all(user_guard.values_mut(), &market_snapshot)?;
        drop(user_guard);

        self.persist()
    }

    pub fn create_user(&self, user_id: impl Into<String>) -> EngineResult<()> {
        let balance = Decimal::from_f64(self.config.default_starting_balance).ok_or_else(|| {
            EngineError::Structural(format!(
                "default_starting_balance {} not decimal-representable",
                self.config.default_starting_balance
            ))
        })?;
        let user = User::new(user_id, balance);
        self.users.insert(user)?;
        self.persist()
    }

    pub fn list_users(&self) -> Vec<UserView> {
        self.users.list().iter().map(UserView::from).collect()
    }

    pub fn get_user(&self, user_id: &str) -> EngineResult<UserDetail> {
        Ok(UserDetail::from(&self.users.require(user_id)?))
    }

    /// Buy `amount` worth of `outcome` shares in `market_id` for `user_id`,
    /// via the kernel's bisection search. Lock order: market, then user.
    pub fn buy(
        &self,
        user_id: &str,
        market_id: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> EngineResult<Trade> {
        let mut market_guard = self.markets.write();
        let market = market_guard
            .get_mut(market_id)
            .ok_or_else(|| EngineError::NotFound(format!("market {market_id}")))?;

        let mut user_guard = self.users.write();
        let user = user_guard
            .get_mut(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))?;

        let trade = trade_engine::buy_with_budget(
            user,
            market,
            outcome,
            amount,
            self.config.bisection_epsilon,
            self.config.initial_bound_factor,
            self.config.max_bisection_iters,
            Utc::now(),
        )?;

        drop(user_guard);
        drop(market_guard);

        self.trades.write().push(trade.clone());
        self.persist()?;
        Ok(trade)
    }

    /// Parse an outcome string as the API boundary does, surfacing
    /// `InvalidInput` rather than panicking on garbage input.
    pub fn parse_outcome(s: &str) -> EngineResult<Outcome> {
        Outcome::from_str(s)
    }
}
