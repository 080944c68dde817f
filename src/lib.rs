//! # Continuous Double-Auction Matching Engine with Market Simulation
//!
//! A limit order book matching engine with WebSocket order entry, a public
//! market-data fan-out and an optional stochastic market simulator. The
//! engine accepts limit and market orders from connected clients, matches
//! them against resting liquidity under strict price-then-time priority,
//! reports per-order lifecycle and per-trade messages to participants, and
//! publishes the same (plus anonymized book deltas) on a public feed.
//!
//! ## Key Features
//!
//! - **Price-time priority matching**: ordered price ladders with FIFO
//!   queues at every level; the passive side always sets the trade price.
//! - **Self-match prevention**: resting orders of the incoming order's
//!   owner that would match are canceled before matching begins.
//! - **Single critical section**: every book mutation and every public
//!   event enqueue happens under one exclusive lock, so all participants
//!   observe the same totally ordered event sequence.
//! - **Snapshot/delta coherence**: a new `orderBookL2` subscriber receives
//!   the full book under the same lock that serializes mutations, so the
//!   snapshot and the subsequent delta stream never diverge.
//! - **Stochastic simulation**: a population of exponential-inter-arrival
//!   generators seeds and perturbs the book with pegged adds, cancels and
//!   market orders.
//!
//! ## Architecture
//!
//! ```text
//! clients ──ws──> order entry gateway ─┐
//!                                      ├─> [engine lock] order books ──> event queue
//! simulator generators ────────────────┘                                    │
//!                                                                           v
//! subscribers <──ws── market data gateway <──────────────── dispatcher (filtered fan-out)
//! ```
//!
//! Request handlers take the lock once, perform all book operations,
//! session bookkeeping and event-queue pushes, then release it. Sessions
//! own outbound queues drained by writer tasks, so no socket write ever
//! happens under the lock.
//!
//! ## Wire schema
//!
//! JSON text frames over WebSocket. Inbound: `A` enter/modify, `X` cancel,
//! `C` configure, `subscribe`/`unsubscribe`. Outbound: `Y` accepted, `R`
//! rejected, `E` executed, `X` canceled/removed, `M` modify, `A` add (with
//! a `snapshot` flag). Prices are integer tick counts.

pub mod config;
pub mod orderbook;
pub mod prelude;
pub mod server;
pub mod sim;
mod utils;
pub mod wire;

pub use config::{ConfigError, DisplayStyle, EngineConfig};
pub use orderbook::{
    BookError, Ladder, NewOrder, Order, OrderBook, OrderBookSnapshot, OrderId, OrderKind,
    OrderUpdate, PriceLevelQueue, ProcessResult, SelfMatchCancel, Side, Transaction,
    TransactionList,
};
pub use server::{Engine, FeedEvent, SharedState, Topics};
pub use utils::current_time_micros;
pub use wire::{Inbound, Outbound};
