//! Full-book snapshots for market data and rebuilds.

use super::book::OrderBook;
use super::order::{Order, Side};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

/// A snapshot of every resting order at one point in time.
///
/// Orders are stored best price first on each side (bids descending, asks
/// ascending) and in arrival order within a level, so replaying the
/// snapshot into an empty book reconstructs the ladders exactly,
/// price-time priority included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// The symbol of the captured book
    pub symbol: String,
    /// Capture time, microseconds
    pub timestamp: u64,
    /// Resting buy orders, best (highest) price first
    pub bids: Vec<Order>,
    /// Resting sell orders, best (lowest) price first
    pub asks: Vec<Order>,
}

impl OrderBook {
    /// Captures the current resting state of the book.
    #[must_use]
    pub fn snapshot(&self) -> OrderBookSnapshot {
        let bids: Vec<Order> = self
            .levels_by_priority(Side::Buy)
            .flat_map(|level| level.iter().cloned())
            .collect();
        let asks: Vec<Order> = self
            .levels_by_priority(Side::Sell)
            .flat_map(|level| level.iter().cloned())
            .collect();

        trace!(
            symbol = self.symbol(),
            bids = bids.len(),
            asks = asks.len(),
            "captured snapshot"
        );

        OrderBookSnapshot {
            symbol: self.symbol().to_string(),
            timestamp: self.time(),
            bids,
            asks,
        }
    }
}

impl OrderBookSnapshot {
    /// Total number of captured orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// SHA-256 over the canonical JSON encoding, as a lowercase hex string.
    ///
    /// Two snapshots of identical book state produce identical checksums,
    /// which makes divergence after a replay cheap to detect.
    #[must_use]
    pub fn checksum(&self) -> String {
        let encoded = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(encoded.as_bytes());
        format!("{digest:x}")
    }

    /// Rebuilds a book holding exactly the captured orders.
    ///
    /// The rebuilt book continues id assignment above the highest captured
    /// order id.
    #[must_use]
    pub fn restore(&self) -> OrderBook {
        let mut book = OrderBook::new(&self.symbol);
        for order in self.bids.iter().chain(self.asks.iter()) {
            book.insert_resting(order.clone());
        }
        book
    }
}
