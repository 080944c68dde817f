//! Order book implementation: price-level queues, ladders, matching and
//! the trade records derived from each matching step.

mod book;
mod error;
mod ladder;
mod level;
mod order;
mod snapshot;
mod transaction;

mod tests;

pub use book::{OrderBook, ProcessResult};
pub use error::BookError;
pub use ladder::Ladder;
pub use level::PriceLevelQueue;
pub use order::{NewOrder, Order, OrderId, OrderKind, OrderUpdate, Side};
pub use snapshot::OrderBookSnapshot;
pub use transaction::{SelfMatchCancel, Transaction, TransactionList};
