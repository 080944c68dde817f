//! Trade records produced by matching, and the messages derived from them.

use super::order::{Order, OrderId, OrderKind, Side};
use crate::wire::Outbound;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One fill between an incoming (aggressing) order and a resting (passive)
/// order.
///
/// `passive_side` is always the opposite of `aggressor_side`, and
/// `traded_price` is always the passive order's price. When
/// `passive_quantity_remaining` is zero the passive order was fully
/// consumed and is no longer in the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The incoming order that initiated the match
    pub aggressor_id: OrderId,
    /// Side of the incoming order
    pub aggressor_side: Side,
    /// Kind of the incoming order
    pub aggressor_kind: OrderKind,
    /// The resting order that was matched against
    pub passive_id: OrderId,
    /// Owner of the resting order; `None` for simulated flow
    pub passive_owner: Option<Uuid>,
    /// Side of the resting order
    pub passive_side: Side,
    /// Quantity left on the resting order after this fill
    pub passive_quantity_remaining: u64,
    /// Price the fill occurred at, in ticks
    pub traded_price: u64,
    /// Quantity exchanged in this fill
    pub traded_quantity: u64,
    /// Book time of the fill, microseconds
    pub timestamp: u64,
}

/// The fills produced by a single `process_order` call, in the order they
/// occurred: best price first, FIFO within a price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionList {
    transactions: Vec<Transaction>,
}

impl TransactionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when no fill occurred.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Number of fills.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Appends a fill.
    pub fn push(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    /// Iterates the fills in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Total quantity exchanged across all fills.
    #[must_use]
    pub fn executed_quantity(&self) -> u64 {
        self.transactions
            .iter()
            .map(|t| t.traded_quantity)
            .fold(0u64, u64::saturating_add)
    }

    /// One `E` message per fill, from the aggressor's point of view.
    ///
    /// These go back to the submitting client and double as the public
    /// trade ticks.
    #[must_use]
    pub fn aggressor_messages(&self) -> Vec<Outbound> {
        self.transactions
            .iter()
            .map(|t| Outbound::Executed {
                order_type: t.aggressor_kind,
                timestamp: t.timestamp,
                price: t.traded_price,
                order_id: t.aggressor_id,
                quantity: t.traded_quantity,
                side: t.aggressor_side,
            })
            .collect()
    }

    /// One `E` message per fill, addressed to the passive order's owner.
    ///
    /// The owner is `None` for simulated resting orders; callers skip
    /// delivery for those. Passive fills are always reported as LMT since
    /// only limit orders rest.
    #[must_use]
    pub fn passive_messages(&self) -> Vec<(Option<Uuid>, Outbound)> {
        self.transactions
            .iter()
            .map(|t| {
                (
                    t.passive_owner,
                    Outbound::Executed {
                        order_type: OrderKind::Limit,
                        timestamp: t.timestamp,
                        price: t.traded_price,
                        order_id: t.passive_id,
                        quantity: t.traded_quantity,
                        side: t.passive_side,
                    },
                )
            })
            .collect()
    }

    /// One public book delta per fill: `X` when the passive order was fully
    /// consumed, `M` with the new resting quantity otherwise.
    #[must_use]
    pub fn remove_and_modify_messages(&self, instrument: &str) -> Vec<Outbound> {
        self.transactions
            .iter()
            .map(|t| {
                if t.passive_quantity_remaining == 0 {
                    Outbound::Canceled {
                        order_id: t.passive_id,
                        instrument: instrument.to_string(),
                        side: t.passive_side,
                        quantity: None,
                        price: t.traded_price,
                        timestamp: t.timestamp,
                        reason: None,
                    }
                } else {
                    Outbound::Modify {
                        timestamp: t.timestamp,
                        side: t.passive_side,
                        price: t.traded_price,
                        order_id: t.passive_id,
                        quantity: t.passive_quantity_remaining,
                    }
                }
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a TransactionList {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

/// A resting order canceled by self-match prevention before matching.
///
/// Carries the canceled order's full attributes so the owner notification
/// and the public remove can be built without another book lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfMatchCancel {
    /// The canceled resting order, as it was in the book
    pub order: Order,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(passive_remaining: u64) -> Transaction {
        Transaction {
            aggressor_id: 10,
            aggressor_side: Side::Sell,
            aggressor_kind: OrderKind::Market,
            passive_id: 3,
            passive_owner: None,
            passive_side: Side::Buy,
            passive_quantity_remaining: passive_remaining,
            traded_price: 100,
            traded_quantity: 4,
            timestamp: 77,
        }
    }

    #[test]
    fn test_aggressor_message_shape() {
        let mut list = TransactionList::new();
        list.push(transaction(6));

        let messages = list.aggressor_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            Outbound::Executed {
                order_type: OrderKind::Market,
                timestamp: 77,
                price: 100,
                order_id: 10,
                quantity: 4,
                side: Side::Sell,
            }
        );
    }

    #[test]
    fn test_passive_message_is_limit_on_opposite_side() {
        let mut list = TransactionList::new();
        list.push(transaction(6));

        let messages = list.passive_messages();
        let (owner, message) = &messages[0];
        assert!(owner.is_none());
        assert_eq!(
            *message,
            Outbound::Executed {
                order_type: OrderKind::Limit,
                timestamp: 77,
                price: 100,
                order_id: 3,
                quantity: 4,
                side: Side::Buy,
            }
        );
    }

    #[test]
    fn test_partial_fill_derives_modify() {
        let mut list = TransactionList::new();
        list.push(transaction(6));

        let deltas = list.remove_and_modify_messages("SIM");
        assert_eq!(
            deltas[0],
            Outbound::Modify {
                timestamp: 77,
                side: Side::Buy,
                price: 100,
                order_id: 3,
                quantity: 6,
            }
        );
    }

    #[test]
    fn test_full_fill_derives_remove() {
        let mut list = TransactionList::new();
        list.push(transaction(0));

        let deltas = list.remove_and_modify_messages("SIM");
        assert!(matches!(
            &deltas[0],
            Outbound::Canceled {
                order_id: 3,
                quantity: None,
                reason: None,
                ..
            }
        ));
    }

    #[test]
    fn test_executed_quantity_sums_fills() {
        let mut list = TransactionList::new();
        list.push(transaction(6));
        list.push(transaction(0));
        assert_eq!(list.executed_quantity(), 8);
    }
}
