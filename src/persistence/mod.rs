//! Restart-safe persistence: load at boot, save after every successful
//! mutation.
//!
//! Grounded on `usealtoal-edgelord`'s `StatusWriter::write` (temp file +
//! `fs::rename`, cleaning up the temp file on any I/O error before
//! propagating it) — generalized from one status file to one file per
//! collection, per `spec.md` §4.7/§6's "a set of JSON files, one per
//! collection, each a flat array of records" layout.

use crate::domain::{Market, Trade, User};
use crate::error::EngineError;
use std::fs;
use std::path::PathBuf;

/// Everything the engine loads at boot and overwrites after a mutation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub markets: Vec<Market>,
    pub users: Vec<User>,
    pub trades: Vec<Trade>,
}

/// A durable backend for markets, users, and trades.
///
/// `save_all` must be atomic per collection: a crash mid-write must never
/// corrupt the previous snapshot of any collection it didn't finish writing.
pub trait PersistenceBackend {
    fn load_all(&self) -> Result<Snapshot, EngineError>;
    fn save_all(&self, snapshot: &Snapshot) -> Result<(), EngineError>;

    /// Default direct-lookup helpers; backends with an indexed store (e.g. a
    /// relational one) may override these for efficiency.
    fn load_by_id(&self, market_id: &str) -> Result<Option<Market>, EngineError> {
        Ok(self
            .load_all()?
            .markets
            .into_iter()
            .find(|m| m.market_id == market_id))
    }

    fn load_by_status(
        &self,
        status: crate::domain::MarketStatus,
    ) -> Result<Vec<Market>, EngineError> {
        Ok(self
            .load_all()?
            .markets
            .into_iter()
            .filter(|m| m.status == status)
            .collect())
    }
}

/// JSON-file backend: `markets.json`, `users.json`, `trades.json` under one
/// directory, each a flat JSON array.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    /// Read one collection's flat JSON array, or `vec![]` if the file does
    /// not exist yet (a fresh installation with nothing persisted).
    fn load_collection<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, EngineError> {
        let path = self.path_for(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).map_err(|e| {
            EngineError::Structural(format!("reading {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            EngineError::Structural(format!("parsing {}: {e}", path.display()))
        })
    }

    /// Write-to-temp-then-rename, matching the atomicity contract. Cleans up
    /// the temp file on any failure before propagating it.
    fn save_collection<T: serde::Serialize>(
        &self,
        collection: &str,
        items: &[T],
    ) -> Result<(), EngineError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| EngineError::Durability(format!("creating {}: {e}", self.dir.display())))?;

        let path = self.path_for(collection);
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| EngineError::Durability(format!("serializing {collection}: {e}")))?;

        let write_result = fs::write(&temp_path, json.as_bytes())
            .map_err(|e| EngineError::Durability(format!("writing {}: {e}", temp_path.display())));
        if let Err(err) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(EngineError::Durability(format!(
                "renaming {} to {}: {e}",
                temp_path.display(),
                path.display()
            )));
        }
        Ok(())
    }
}

impl PersistenceBackend for JsonFileBackend {
    fn load_all(&self) -> Result<Snapshot, EngineError> {
        let markets: Vec<Market> = self.load_collection("markets")?;
        let mut users: Vec<User> = self.load_collection("users")?;
        let trades: Vec<Trade> = self.load_collection("trades")?;

        for market in &markets {
            market.validate()?;
        }
        for user in &users {
            user.validate()?;
        }

        // Referential integrity: drop positions pointing at a market that no
        // longer exists, with a warning rather than a hard failure — a
        // stray position is evidence of a prior partial write, not grounds
        // to refuse boot.
        let known_markets: std::collections::HashSet<&str> =
            markets.iter().map(|m| m.market_id.as_str()).collect();
        for user in &mut users {
            let stray: Vec<String> = user
                .positions()
                .keys()
                .filter(|market_id| !known_markets.contains(market_id.as_str()))
                .cloned()
                .collect();
            for market_id in stray {
                tracing::warn!(
                    user_id = %user.user_id,
                    market_id = %market_id,
                    "dropping position referencing unknown market on load"
                );
                user.positions_mut().remove(&market_id);
            }
        }

        let known_users: std::collections::HashSet<&str> =
            users.iter().map(|u| u.user_id.as_str()).collect();
        let trades: Vec<Trade> = trades
            .into_iter()
            .filter(|t| {
                let ok = known_markets.contains(t.market_id.as_str())
                    && known_users.contains(t.user_id.as_str());
                if !ok {
                    tracing::warn!(
                        trade_id = %t.trade_id,
                        "dropping trade referencing unknown market or user on load"
                    );
                }
                ok
            })
            .collect();

        Ok(Snapshot {
            markets,
            users,
            trades,
        })
    }

    fn save_all(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        self.save_collection("markets", &snapshot.markets)?;
        self.save_collection("users", &snapshot.users)?;
        self.save_collection("trades", &snapshot.trades)?;
        Ok(())
    }
}
