//! Immutable trade record, written once when a trade commits.
//!
//! Grounded on the teacher's `market_updates` row
//! (`DbAdapter::record_market_update`); `trade_id` is a `uuid` here because
//! there is no database `SERIAL`/`RETURNING id` to lean on.

use crate::domain::outcome::Outcome;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub user_id: String,
    pub market_id: String,
    pub outcome: Outcome,
    pub shares_bought: f64,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        user_id: impl Into<String>,
        market_id: impl Into<String>,
        outcome: Outcome,
        shares_bought: f64,
        cost: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            market_id: market_id.into(),
            outcome,
            shares_bought,
            cost,
            created_at,
        }
    }
}
