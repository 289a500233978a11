//! Trade execution and settlement: the only code paths allowed to mutate
//! `Market`/`User` state, besides direct construction.

pub mod settlement;
pub mod trade_engine;
