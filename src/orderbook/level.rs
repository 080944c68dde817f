//! FIFO queue of resting orders at a single price level.

use super::order::{Order, OrderId};
use std::collections::{HashMap, VecDeque};

/// A price level: the orders resting at exactly one price, in arrival order,
/// with a cached aggregate volume.
///
/// Internally the level keeps two structures: an arrival queue of order ids
/// that preserves FIFO priority, and a by-id map holding the orders
/// themselves. Removal by id only touches the map; the stale id left in the
/// queue is skipped lazily the next time the head is taken. This keeps both
/// `append` and `remove` O(1) while iteration stays in arrival order.
#[derive(Debug, Clone, Default)]
pub struct PriceLevelQueue {
    /// The price shared by every order in this queue
    price: u64,
    /// Cached sum of resting quantities
    volume: u64,
    /// Arrival order of order ids; may contain ids already removed
    arrivals: VecDeque<OrderId>,
    /// Live orders keyed by id
    orders: HashMap<OrderId, Order>,
}

impl PriceLevelQueue {
    /// Creates an empty queue for the given price.
    #[must_use]
    pub fn new(price: u64) -> Self {
        Self {
            price,
            volume: 0,
            arrivals: VecDeque::new(),
            orders: HashMap::new(),
        }
    }

    /// The price of this level.
    #[must_use]
    #[inline]
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Cached aggregate volume, equal to the sum of resting quantities.
    #[must_use]
    #[inline]
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Number of live orders at this level.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns `true` when no live order rests at this level.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Appends an order at the tail of the queue.
    ///
    /// The caller guarantees `order.price == self.price` and that the id is
    /// not already present.
    pub fn append(&mut self, order: Order) {
        debug_assert_eq!(order.price, self.price);
        self.volume = self.volume.saturating_add(order.quantity);
        self.arrivals.push_back(order.order_id);
        self.orders.insert(order.order_id, order);
    }

    /// Removes an order by id, returning it if it was resting here.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&order_id)?;
        self.volume = self.volume.saturating_sub(order.quantity);
        // The stale id stays in `arrivals` and is dropped at head access.
        Some(order)
    }

    /// Returns the id of the earliest-arrived live order, discarding any
    /// stale ids accumulated at the front of the arrival queue.
    pub fn head_id(&mut self) -> Option<OrderId> {
        while let Some(&id) = self.arrivals.front() {
            if self.orders.contains_key(&id) {
                return Some(id);
            }
            self.arrivals.pop_front();
        }
        None
    }

    /// The earliest-arrived live order, if any.
    pub fn head(&mut self) -> Option<&Order> {
        let id = self.head_id()?;
        self.orders.get(&id)
    }

    /// Looks up a live order by id.
    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Returns `true` if the given order rests at this level.
    #[must_use]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Iterates the live orders in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.arrivals.iter().filter_map(|id| self.orders.get(id))
    }

    /// Updates the quantity of a resting order.
    ///
    /// A quantity increase is a priority-losing event: the order's timestamp
    /// is refreshed to `now` and it moves to the tail of the queue. A
    /// decrease keeps both the timestamp and the queue position; this is the
    /// normal case, since matching only ever decrements resting quantity.
    ///
    /// Returns the new quantity, or `None` if the order is not here.
    pub fn update_quantity(
        &mut self,
        order_id: OrderId,
        new_quantity: u64,
        now: u64,
    ) -> Option<u64> {
        let order = self.orders.get_mut(&order_id)?;
        let old = order.quantity;
        order.quantity = new_quantity;
        self.volume = self
            .volume
            .saturating_sub(old)
            .saturating_add(new_quantity);
        if new_quantity > old {
            order.timestamp = now;
            self.arrivals.retain(|id| *id != order_id);
            self.arrivals.push_back(order_id);
        }
        Some(new_quantity)
    }
}
