//! Gateways, market-data dispatching and the shared engine state.

pub mod market_data;
pub mod session;
pub mod state;

pub use state::{Engine, FeedEvent, MarketDataSession, OrderEntrySession, SharedState, Topics};
