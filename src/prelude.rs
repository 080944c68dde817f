//! Prelude module that re-exports the commonly used types.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use exchange_sim::prelude::*;
//! ```

// Core order book types
pub use crate::orderbook::{
    BookError, NewOrder, Order, OrderBook, OrderId, OrderKind, OrderUpdate, ProcessResult, Side,
};

// Trade records and derived messages
pub use crate::orderbook::{SelfMatchCancel, Transaction, TransactionList};

// Snapshots
pub use crate::orderbook::OrderBookSnapshot;

// Wire messages
pub use crate::wire::{Inbound, Outbound};

// Server state and configuration
pub use crate::config::{DisplayStyle, EngineConfig};
pub use crate::server::{Engine, FeedEvent, SharedState, Topics};

// Utility functions
pub use crate::utils::current_time_micros;
