//! Order primitives: sides, order kinds and the resting order record.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Side of an order or a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy (bid) side
    #[serde(rename = "B")]
    Buy,
    /// Sell (ask) side
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "B"),
            Side::Sell => write!(f, "S"),
        }
    }
}

/// The kind of an incoming order.
///
/// Only limit orders ever rest in the book; a market order either fills
/// against available liquidity or evaporates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Limit order with an explicit price
    #[serde(rename = "LMT")]
    Limit,
    /// Market order, matched against the best available prices
    #[serde(rename = "MKT")]
    Market,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LMT"),
            OrderKind::Market => write!(f, "MKT"),
        }
    }
}

/// Identifier assigned to every order the book accepts.
///
/// Strictly increasing over the life of a book; never reused.
pub type OrderId = u64;

/// An order as it enters the matching engine, before an id is assigned.
///
/// `price` is the integer tick count and must be present for limit orders;
/// `owner` is `None` for simulator-generated flow, which bypasses
/// self-match prevention and per-owner notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Buy or Sell
    pub side: Side,
    /// Limit or Market
    pub kind: OrderKind,
    /// Limit price in ticks; `None` for market orders
    pub price: Option<u64>,
    /// Quantity to trade, must be positive
    pub quantity: u64,
    /// Owning trader, or `None` for simulated flow
    pub owner: Option<Uuid>,
}

impl NewOrder {
    /// Convenience constructor for a limit order.
    pub fn limit(side: Side, price: u64, quantity: u64, owner: Option<Uuid>) -> Self {
        Self {
            side,
            kind: OrderKind::Limit,
            price: Some(price),
            quantity,
            owner,
        }
    }

    /// Convenience constructor for a market order.
    pub fn market(side: Side, quantity: u64, owner: Option<Uuid>) -> Self {
        Self {
            side,
            kind: OrderKind::Market,
            price: None,
            quantity,
            owner,
        }
    }
}

/// A fully specified order record as held by the book.
///
/// Returned from `process_order` (with the residual quantity after
/// matching) and stored in the price-level queues while resting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Book-assigned identifier
    pub order_id: OrderId,
    /// Buy or Sell
    pub side: Side,
    /// Limit or Market
    pub kind: OrderKind,
    /// Price in ticks
    pub price: u64,
    /// Remaining quantity
    pub quantity: u64,
    /// Acceptance (or last priority-losing update) time, microseconds
    pub timestamp: u64,
    /// Owning trader, or `None` for simulated flow
    pub owner: Option<Uuid>,
}

/// An in-place update to a resting order.
///
/// A price change is applied as remove-then-reinsert and therefore loses
/// time priority, as does a quantity increase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    /// The resting order to update
    pub order_id: OrderId,
    /// Side the order rests on
    pub side: Side,
    /// New price in ticks
    pub price: u64,
    /// New quantity
    pub quantity: u64,
    /// Stamped by the book when the update is applied
    pub timestamp: u64,
}
