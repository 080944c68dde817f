//! One side of the book: a price-ordered collection of level queues.

use super::level::PriceLevelQueue;
use super::order::{Order, OrderId, OrderUpdate};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// A price ladder: every price level on one side of the book, ordered by
/// price, with an auxiliary order-id index for O(log n) by-id operations.
///
/// The ladder never exposes an empty level: a queue is deleted in the same
/// operation that removes its last order.
#[derive(Debug, Clone, Default)]
pub struct Ladder {
    /// Price levels keyed by price; `BTreeMap` gives ordered traversal and
    /// O(log n) best-price lookups
    levels: BTreeMap<u64, PriceLevelQueue>,
    /// order id -> resting price, so removal does not search the ladder
    index: HashMap<OrderId, u64>,
}

impl Ladder {
    /// Creates an empty ladder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when no order rests on this side.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of live orders on this side.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Lowest price present, or `None` if the side is empty.
    #[must_use]
    pub fn min_price(&self) -> Option<u64> {
        self.levels.keys().next().copied()
    }

    /// Highest price present, or `None` if the side is empty.
    #[must_use]
    pub fn max_price(&self) -> Option<u64> {
        self.levels.keys().next_back().copied()
    }

    /// Returns `true` if a level exists at `price`.
    #[must_use]
    pub fn price_exists(&self, price: u64) -> bool {
        self.levels.contains_key(&price)
    }

    /// The queue at `price`, if the level exists.
    #[must_use]
    pub fn level(&self, price: u64) -> Option<&PriceLevelQueue> {
        self.levels.get(&price)
    }

    /// Mutable access to the queue at `price`.
    pub(super) fn level_mut(&mut self, price: u64) -> Option<&mut PriceLevelQueue> {
        self.levels.get_mut(&price)
    }

    /// Cached volume at `price`, zero when the level does not exist.
    #[must_use]
    pub fn volume_at(&self, price: u64) -> u64 {
        self.levels.get(&price).map_or(0, PriceLevelQueue::volume)
    }

    /// Iterates the levels in ascending price order.
    pub fn levels(&self) -> impl DoubleEndedIterator<Item = &PriceLevelQueue> {
        self.levels.values()
    }

    /// Inserts an order at the tail of the queue for its price, creating the
    /// level if absent.
    pub fn insert(&mut self, order: Order) {
        trace!(
            order_id = order.order_id,
            price = order.price,
            quantity = order.quantity,
            "ladder insert"
        );
        self.index.insert(order.order_id, order.price);
        self.levels
            .entry(order.price)
            .or_insert_with(|| PriceLevelQueue::new(order.price))
            .append(order);
    }

    /// Removes an order by id, deleting its level if it becomes empty.
    ///
    /// Returns the removed order, or `None` if the id is not on this side.
    pub fn remove_by_id(&mut self, order_id: OrderId) -> Option<Order> {
        let price = self.index.remove(&order_id)?;
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Looks up a resting order by id.
    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let price = self.index.get(&order_id)?;
        self.levels.get(price)?.get(order_id)
    }

    /// Returns `true` if the id rests on this side.
    #[must_use]
    pub fn order_exists(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Decrements the quantity of a resting order in place, keeping its
    /// queue position. Used by the matching loop for partial fills.
    pub(super) fn reduce_quantity(&mut self, order_id: OrderId, new_quantity: u64, now: u64) {
        if let Some(price) = self.index.get(&order_id).copied()
            && let Some(level) = self.levels.get_mut(&price)
        {
            level.update_quantity(order_id, new_quantity, now);
        }
    }

    /// Applies an update to a resting order.
    ///
    /// A price change is a remove-then-reinsert at the new price with the
    /// update's timestamp, so the order goes to the back of the new queue.
    /// With an unchanged price only the quantity is touched; the level queue
    /// decides whether priority is kept (decrease) or lost (increase).
    ///
    /// Returns the updated order record, or `None` if the id is unknown.
    pub fn update(&mut self, update: &OrderUpdate) -> Option<Order> {
        let price = *self.index.get(&update.order_id)?;

        if price != update.price {
            let mut order = self.remove_by_id(update.order_id)?;
            order.price = update.price;
            order.quantity = update.quantity;
            order.timestamp = update.timestamp;
            self.insert(order.clone());
            return Some(order);
        }

        let level = self.levels.get_mut(&price)?;
        level.update_quantity(update.order_id, update.quantity, update.timestamp)?;
        level.get(update.order_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::order::{OrderKind, Side};

    fn order(id: OrderId, price: u64, quantity: u64) -> Order {
        Order {
            order_id: id,
            side: Side::Sell,
            kind: OrderKind::Limit,
            price,
            quantity,
            timestamp: id,
            owner: None,
        }
    }

    #[test]
    fn test_min_max_price() {
        let mut ladder = Ladder::new();
        assert_eq!(ladder.min_price(), None);
        assert_eq!(ladder.max_price(), None);

        ladder.insert(order(1, 101, 5));
        ladder.insert(order(2, 99, 5));
        ladder.insert(order(3, 105, 5));

        assert_eq!(ladder.min_price(), Some(99));
        assert_eq!(ladder.max_price(), Some(105));
    }

    #[test]
    fn test_insert_appends_to_existing_level() {
        let mut ladder = Ladder::new();
        ladder.insert(order(1, 100, 5));
        ladder.insert(order(2, 100, 7));

        let level = ladder.level(100).unwrap();
        assert_eq!(level.len(), 2);
        assert_eq!(level.volume(), 12);
    }

    #[test]
    fn test_remove_last_order_deletes_level() {
        let mut ladder = Ladder::new();
        ladder.insert(order(1, 100, 5));

        let removed = ladder.remove_by_id(1).unwrap();
        assert_eq!(removed.order_id, 1);
        assert!(!ladder.price_exists(100));
        assert!(ladder.is_empty());
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut ladder = Ladder::new();
        ladder.insert(order(1, 100, 5));
        assert!(ladder.remove_by_id(7).is_none());
        assert_eq!(ladder.order_count(), 1);
    }

    #[test]
    fn test_update_price_change_loses_priority() {
        let mut ladder = Ladder::new();
        ladder.insert(order(1, 100, 5));
        ladder.insert(order(2, 101, 5));
        ladder.insert(order(3, 101, 5));

        let updated = ladder
            .update(&OrderUpdate {
                order_id: 1,
                side: Side::Sell,
                price: 101,
                quantity: 5,
                timestamp: 999,
            })
            .unwrap();

        assert_eq!(updated.price, 101);
        assert_eq!(updated.timestamp, 999);
        assert!(!ladder.price_exists(100));
        let ids: Vec<OrderId> = ladder.level(101).unwrap().iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_update_same_price_quantity_decrease() {
        let mut ladder = Ladder::new();
        ladder.insert(order(1, 100, 5));
        ladder.insert(order(2, 100, 5));

        ladder
            .update(&OrderUpdate {
                order_id: 1,
                side: Side::Sell,
                price: 100,
                quantity: 2,
                timestamp: 999,
            })
            .unwrap();

        let level = ladder.level(100).unwrap();
        assert_eq!(level.volume(), 7);
        let ids: Vec<OrderId> = level.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_update_unknown_id_is_none() {
        let mut ladder = Ladder::new();
        assert!(
            ladder
                .update(&OrderUpdate {
                    order_id: 9,
                    side: Side::Sell,
                    price: 100,
                    quantity: 2,
                    timestamp: 0,
                })
                .is_none()
        );
    }
}
