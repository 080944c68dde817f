//! Core order book: price ladders, id assignment and the matching engine.

use super::error::BookError;
use super::ladder::Ladder;
use super::level::PriceLevelQueue;
use super::order::{NewOrder, Order, OrderId, OrderKind, OrderUpdate, Side};
use super::transaction::{SelfMatchCancel, Transaction, TransactionList};
use crate::utils::current_time_micros;
use dashmap::DashMap;
use either::Either;
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

/// Number of recent trades kept on the tape for inspection.
const TRADE_TAPE_CAPACITY: usize = 100;

/// Everything produced by one `process_order` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// Fills, in match order: best price first, FIFO within a price
    pub transactions: TransactionList,
    /// The order record with its assigned id, timestamp and residual quantity
    pub order: Order,
    /// Resting orders canceled by self-match prevention before matching
    pub smp_cancels: Vec<SelfMatchCancel>,
}

/// A limit order book for one instrument.
///
/// The book owns a bid ladder and an ask ladder, assigns strictly
/// increasing order ids, and matches incoming orders under price-then-time
/// priority. It performs no locking of its own: callers serialize access
/// through the engine's single exclusive lock, which also orders the
/// market-data events derived from each call.
pub struct OrderBook {
    /// The symbol this book trades
    symbol: String,
    /// Resting buy orders
    bids: Ladder,
    /// Resting sell orders
    asks: Ladder,
    /// order id -> resting side, so cancels and lookups skip the search
    order_locations: DashMap<OrderId, Side>,
    /// Next id to assign; ids are never reused
    next_order_id: OrderId,
    /// Book clock, refreshed at the start of every mutation (microseconds)
    last_time: u64,
    /// Most recent trades, newest first
    tape: VecDeque<Transaction>,
}

impl OrderBook {
    /// Creates an empty book for the given symbol.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: Ladder::new(),
            asks: Ladder::new(),
            order_locations: DashMap::new(),
            next_order_id: 1,
            last_time: 0,
            tape: VecDeque::new(),
        }
    }

    /// The symbol of this book.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The book clock: the time of the most recent mutation, microseconds.
    #[must_use]
    #[inline]
    pub fn time(&self) -> u64 {
        self.last_time
    }

    /// The bid ladder.
    #[must_use]
    pub fn bids(&self) -> &Ladder {
        &self.bids
    }

    /// The ask ladder.
    #[must_use]
    pub fn asks(&self) -> &Ladder {
        &self.asks
    }

    /// Highest resting bid price, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.max_price()
    }

    /// Lowest resting ask price, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.min_price()
    }

    /// Lowest resting bid price, if any.
    #[must_use]
    pub fn worst_bid(&self) -> Option<u64> {
        self.bids.min_price()
    }

    /// Highest resting ask price, if any.
    #[must_use]
    pub fn worst_ask(&self) -> Option<u64> {
        self.asks.max_price()
    }

    /// Best ask minus best bid, when both sides are populated.
    #[must_use]
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Midpoint of the best bid and ask, when both sides are populated.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Cached volume resting at `price` on `side`; zero if the level is
    /// absent.
    #[must_use]
    pub fn volume_at_price(&self, side: Side, price: u64) -> u64 {
        self.ladder(side).volume_at(price)
    }

    /// Looks up a resting order by id on either side.
    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let side = *self.order_locations.get(&order_id)?;
        self.ladder(side).get_order(order_id)
    }

    /// Returns `true` if the id is resting in the book.
    #[must_use]
    pub fn order_exists(&self, order_id: OrderId) -> bool {
        self.order_locations.contains_key(&order_id)
    }

    /// The side an order rests on, if it is in the book.
    #[must_use]
    pub fn order_side(&self, order_id: OrderId) -> Option<Side> {
        self.order_locations.get(&order_id).map(|entry| *entry)
    }

    /// Total number of resting orders across both sides.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.order_locations.len()
    }

    /// Recent trades, newest first.
    pub fn recent_trades(&self) -> impl Iterator<Item = &Transaction> {
        self.tape.iter()
    }

    /// Iterates one side's levels best price first: bids descending, asks
    /// ascending.
    pub fn levels_by_priority(&self, side: Side) -> impl Iterator<Item = &PriceLevelQueue> {
        match side {
            Side::Buy => Either::Left(self.bids.levels().rev()),
            Side::Sell => Either::Right(self.asks.levels()),
        }
    }

    /// Accepts an order, matches it against resting liquidity and rests any
    /// limit residual.
    ///
    /// Steps, all inside the caller's critical section:
    /// 1. Assign the next order id and refresh the book clock.
    /// 2. Self-match prevention: cancel every opposite-side resting order
    ///    with the same owner whose price would match. Simulated flow
    ///    (`owner == None`) is exempt.
    /// 3. Match against best-priced opposite levels, FIFO within a level,
    ///    until the quantity is exhausted, the price limit stops crossing,
    ///    or the opposite side empties.
    /// 4. Rest a limit residual on the same side; a market residual is
    ///    dropped.
    ///
    /// # Errors
    /// Rejects zero quantities and limit orders without a positive price.
    pub fn process_order(&mut self, new_order: NewOrder) -> Result<ProcessResult, BookError> {
        if new_order.quantity == 0 {
            return Err(BookError::InvalidQuantity(0));
        }
        let limit = match new_order.kind {
            OrderKind::Limit => match new_order.price {
                Some(price) if price > 0 => Some(price),
                _ => return Err(BookError::MissingLimitPrice),
            },
            OrderKind::Market => None,
        };

        let order_id = self.next_order_id;
        self.next_order_id += 1;
        self.touch();
        let timestamp = self.last_time;

        trace!(
            symbol = %self.symbol,
            order_id,
            side = %new_order.side,
            kind = %new_order.kind,
            quantity = new_order.quantity,
            price = limit,
            "processing order"
        );

        let smp_cancels = self.apply_self_match_prevention(&new_order, limit);

        let mut transactions = TransactionList::new();
        let mut remaining = new_order.quantity;

        while remaining > 0 {
            let opposite = match new_order.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let best_price = match new_order.side {
                Side::Buy => opposite.min_price(),
                Side::Sell => opposite.max_price(),
            };
            let Some(best_price) = best_price else { break };
            if !Self::price_crosses(new_order.side, limit, best_price) {
                break;
            }
            remaining = Self::match_level(
                opposite,
                &self.order_locations,
                best_price,
                &new_order,
                order_id,
                remaining,
                timestamp,
                &mut transactions,
            );
        }

        let order = Order {
            order_id,
            side: new_order.side,
            kind: new_order.kind,
            price: limit.unwrap_or(0),
            quantity: remaining,
            timestamp,
            owner: new_order.owner,
        };

        // A limit residual rests; a market residual evaporates.
        if new_order.kind == OrderKind::Limit && remaining > 0 {
            let same = match new_order.side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            same.insert(order.clone());
            self.order_locations.insert(order_id, new_order.side);
        }

        self.record_trades(&transactions);

        Ok(ProcessResult {
            transactions,
            order,
            smp_cancels,
        })
    }

    /// Cancels a resting order on the given side.
    ///
    /// Returns the removed order. Canceling an id that is not resting on
    /// `side` is a silent no-op; callers needing a rejection check
    /// ownership and existence first.
    pub fn cancel_order(&mut self, side: Side, order_id: OrderId) -> Option<Order> {
        self.touch();
        let removed = self.ladder_mut(side).remove_by_id(order_id)?;
        self.order_locations.remove(&order_id);
        trace!(symbol = %self.symbol, order_id, %side, "order canceled");
        Some(removed)
    }

    /// Cancels a resting order looked up by id alone.
    pub fn cancel_by_id(&mut self, order_id: OrderId) -> Option<Order> {
        let side = self.order_side(order_id)?;
        self.cancel_order(side, order_id)
    }

    /// Applies an update to a resting order.
    ///
    /// The update is stamped with the book clock before being applied. A
    /// price change is a remove-then-reinsert and loses time priority; a
    /// quantity increase keeps the price level but also loses priority.
    ///
    /// Returns the updated order, or `None` when the id is not resting on
    /// the update's side.
    pub fn modify_order(&mut self, order_id: OrderId, mut update: OrderUpdate) -> Option<Order> {
        self.touch();
        update.order_id = order_id;
        update.timestamp = self.last_time;
        let updated = self.ladder_mut(update.side).update(&update)?;
        trace!(
            symbol = %self.symbol,
            order_id,
            price = update.price,
            quantity = update.quantity,
            "order modified"
        );
        Some(updated)
    }

    /// Inserts a resting order verbatim, bypassing matching. Used when
    /// rebuilding a book from a snapshot.
    pub(super) fn insert_resting(&mut self, order: Order) {
        self.next_order_id = self.next_order_id.max(order.order_id + 1);
        self.order_locations.insert(order.order_id, order.side);
        self.ladder_mut(order.side).insert(order);
    }

    #[inline]
    fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline]
    fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Refreshes the book clock.
    fn touch(&mut self) {
        self.last_time = current_time_micros();
    }

    /// Whether a level at `level_price` is matchable for the incoming
    /// order. Market orders match every level.
    fn price_crosses(aggressor_side: Side, limit: Option<u64>, level_price: u64) -> bool {
        match (aggressor_side, limit) {
            (_, None) => true,
            (Side::Buy, Some(limit)) => level_price <= limit,
            (Side::Sell, Some(limit)) => level_price >= limit,
        }
    }

    /// Cancels every opposite-side resting order owned by the incoming
    /// order's owner whose price would match it, before matching starts.
    fn apply_self_match_prevention(
        &mut self,
        new_order: &NewOrder,
        limit: Option<u64>,
    ) -> Vec<SelfMatchCancel> {
        let Some(owner) = new_order.owner else {
            return Vec::new();
        };

        let conflicting: Vec<OrderId> = self
            .levels_by_priority(new_order.side.opposite())
            .filter(|level| Self::price_crosses(new_order.side, limit, level.price()))
            .flat_map(|level| level.iter())
            .filter(|order| order.owner == Some(owner))
            .map(|order| order.order_id)
            .collect();

        let mut cancels = Vec::with_capacity(conflicting.len());
        for order_id in conflicting {
            let ladder = match new_order.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            if let Some(order) = ladder.remove_by_id(order_id) {
                self.order_locations.remove(&order_id);
                trace!(symbol = %self.symbol, order_id, "self-match prevention cancel");
                cancels.push(SelfMatchCancel { order });
            }
        }
        cancels
    }

    /// Matches the incoming order against the queue at one price until the
    /// queue empties or the incoming quantity does.
    ///
    /// The passive side sets the trade price. A partial fill of the resting
    /// head keeps its queue position and timestamp; a consumed order is
    /// removed in the same step that zeroed it.
    #[allow(clippy::too_many_arguments)]
    fn match_level(
        opposite: &mut Ladder,
        locations: &DashMap<OrderId, Side>,
        price: u64,
        new_order: &NewOrder,
        aggressor_id: OrderId,
        mut remaining: u64,
        now: u64,
        transactions: &mut TransactionList,
    ) -> u64 {
        while remaining > 0 {
            let head = match opposite.level_mut(price).and_then(|level| level.head()) {
                Some(order) => order.clone(),
                None => break,
            };

            let (traded, passive_remaining) = if remaining < head.quantity {
                let left = head.quantity - remaining;
                opposite.reduce_quantity(head.order_id, left, now);
                (remaining, left)
            } else {
                opposite.remove_by_id(head.order_id);
                locations.remove(&head.order_id);
                (head.quantity, 0)
            };
            remaining -= traded;

            transactions.push(Transaction {
                aggressor_id,
                aggressor_side: new_order.side,
                aggressor_kind: new_order.kind,
                passive_id: head.order_id,
                passive_owner: head.owner,
                passive_side: new_order.side.opposite(),
                passive_quantity_remaining: passive_remaining,
                traded_price: head.price,
                traded_quantity: traded,
                timestamp: now,
            });
        }
        remaining
    }

    /// Pushes the fills onto the tape, newest first.
    fn record_trades(&mut self, transactions: &TransactionList) {
        for transaction in transactions.iter() {
            self.tape.push_front(transaction.clone());
        }
        self.tape.truncate(TRADE_TAPE_CAPACITY);
    }
}

impl fmt::Display for OrderBook {
    /// Renders both sides top-down (asks above bids) with per-level
    /// volumes, followed by the most recent trades.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- [Asks] ---")?;
        for level in self.asks.levels().rev() {
            writeln!(f, "{} - {}", level.price(), level.volume())?;
        }
        writeln!(f, "--- [Bids] ---")?;
        for level in self.bids.levels().rev() {
            writeln!(f, "{} - {}", level.price(), level.volume())?;
        }
        let mut trades = self.recent_trades().take(10).peekable();
        if trades.peek().is_some() {
            writeln!(f, "--- [Trades] ---")?;
            for trade in trades {
                writeln!(
                    f,
                    "{} @ {} ({})",
                    trade.traded_quantity, trade.traded_price, trade.timestamp
                )?;
            }
        }
        Ok(())
    }
}
