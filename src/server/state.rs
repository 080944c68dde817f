//! Shared engine state: the single exclusive lock, the stop signal and the
//! client registries.
//!
//! Every mutation of a book and every push onto the public event queue
//! happens inside one critical section on [`SharedState::engine`], so all
//! participants observe the same totally ordered event sequence. Handlers
//! never write to sockets under the lock: each session owns an unbounded
//! outbound queue drained by its writer task.

use crate::config::EngineConfig;
use crate::orderbook::{Order, OrderBook, OrderId, TransactionList};
use crate::wire::Outbound;
use bitflags::bitflags;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::trace;
use uuid::Uuid;

bitflags! {
    /// Market-data topics a subscriber can request per instrument.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Topics: u8 {
        /// Anonymized per-order book deltas (`A`, `X`, `M`)
        const ORDER_BOOK_L2 = 1;
        /// Trade ticks (`E`)
        const TRADE = 1 << 1;
    }
}

impl Topics {
    /// Parses a wire topic name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Topics> {
        match name {
            "orderBookL2" => Some(Topics::ORDER_BOOK_L2),
            "trade" => Some(Topics::TRADE),
            _ => None,
        }
    }
}

/// One public market-data event awaiting dispatch.
#[derive(Debug, Clone)]
pub struct FeedEvent {
    /// Instrument the event belongs to, used for per-subscriber filtering
    pub instrument: String,
    /// The message to fan out
    pub message: Outbound,
}

/// Per-connection state of an order-entry client.
#[derive(Debug)]
pub struct OrderEntrySession {
    /// Opaque trader identity assigned at accept
    pub trader_id: Uuid,
    /// Outbound queue drained by the session's writer task
    tx: mpsc::UnboundedSender<String>,
    /// Orders this session currently owns in the book
    pub orders: HashMap<OrderId, Order>,
    /// Orders this session has canceled
    pub canceled_orders: HashMap<OrderId, Order>,
}

impl OrderEntrySession {
    /// Creates the session record for a freshly accepted connection.
    #[must_use]
    pub fn new(trader_id: Uuid, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            trader_id,
            tx,
            orders: HashMap::new(),
            canceled_orders: HashMap::new(),
        }
    }

    /// Enqueues a message for this client. A closed queue means the
    /// connection is going away; the message is dropped.
    pub fn send(&self, message: &Outbound) {
        let _ = self.tx.send(message.to_json());
    }
}

/// Per-connection state of a market-data subscriber.
#[derive(Debug)]
pub struct MarketDataSession {
    /// Subscriber identity
    pub id: Uuid,
    /// Outbound queue drained by the session's writer task
    tx: mpsc::UnboundedSender<String>,
    /// True once the WebSocket handshake completed
    pub handshaken: bool,
    /// True once the initial snapshot (when owed) has been queued
    pub snapshot_sent: bool,
    /// Requested topics per instrument
    pub subscriptions: HashMap<String, Topics>,
}

impl MarketDataSession {
    /// Creates the session record for a freshly accepted subscriber.
    #[must_use]
    pub fn new(id: Uuid, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            tx,
            handshaken: true,
            snapshot_sent: false,
            subscriptions: HashMap::new(),
        }
    }

    /// Enqueues a message for this subscriber.
    pub fn send(&self, message: &Outbound) {
        let _ = self.tx.send(message.to_json());
    }

    /// Whether this subscriber should receive the event: handshake done,
    /// snapshot delivered, instrument subscribed, and the event's type
    /// matching a requested topic.
    #[must_use]
    pub fn wants(&self, event: &FeedEvent) -> bool {
        if !self.handshaken || !self.snapshot_sent {
            return false;
        }
        let Some(topics) = self.subscriptions.get(&event.instrument) else {
            return false;
        };
        match event.message {
            Outbound::Add { .. } | Outbound::Canceled { .. } | Outbound::Modify { .. } => {
                topics.contains(Topics::ORDER_BOOK_L2)
            }
            Outbound::Executed { .. } => topics.contains(Topics::TRADE),
            _ => false,
        }
    }
}

/// Everything the global lock protects: the books, the event queue and
/// both session registries.
pub struct Engine {
    /// Order books keyed by instrument
    pub books: HashMap<String, OrderBook>,
    /// FIFO of public events awaiting dispatch
    pub event_queue: VecDeque<FeedEvent>,
    /// Connected order-entry clients by trader id
    pub order_sessions: HashMap<Uuid, OrderEntrySession>,
    /// Connected market-data subscribers
    pub md_sessions: HashMap<Uuid, MarketDataSession>,
}

impl Engine {
    /// Creates the engine with one empty book per configured instrument.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let mut books = HashMap::new();
        books.insert(
            config.book.instrument.clone(),
            OrderBook::new(&config.book.instrument),
        );
        Self {
            books,
            event_queue: VecDeque::new(),
            order_sessions: HashMap::new(),
            md_sessions: HashMap::new(),
        }
    }

    /// The book for an instrument, if the engine trades it.
    #[must_use]
    pub fn book_mut(&mut self, instrument: &str) -> Option<&mut OrderBook> {
        self.books.get_mut(instrument)
    }

    /// Pushes one event onto the public feed.
    pub fn publish(&mut self, instrument: &str, message: Outbound) {
        trace!(instrument, "queueing public event");
        self.event_queue.push_back(FeedEvent {
            instrument: instrument.to_string(),
            message,
        });
    }

    /// Publishes the public view of a batch of fills: the aggressor trade
    /// ticks, then the per-passive-order remove/modify deltas, in match
    /// order.
    pub fn publish_transactions(&mut self, instrument: &str, transactions: &TransactionList) {
        for message in transactions.aggressor_messages() {
            self.publish(instrument, message);
        }
        for message in transactions.remove_and_modify_messages(instrument) {
            self.publish(instrument, message);
        }
    }

    /// Delivers the passive-side `E` messages of a batch of fills to the
    /// owning sessions, and keeps their owned-order maps current.
    ///
    /// Owners that are `None` (simulated flow) or no longer connected are
    /// skipped; their resting orders trade on regardless.
    pub fn deliver_passive_fills(&mut self, transactions: &TransactionList) {
        for (owner, message) in transactions.passive_messages() {
            let Some(owner) = owner else { continue };
            let Some(session) = self.order_sessions.get_mut(&owner) else {
                continue;
            };
            session.send(&message);
            if let Outbound::Executed { order_id, .. } = message {
                let remaining = transactions
                    .iter()
                    .filter(|t| t.passive_id == order_id)
                    .map(|t| t.passive_quantity_remaining)
                    .last();
                match remaining {
                    Some(0) => {
                        session.orders.remove(&order_id);
                    }
                    Some(quantity) => {
                        if let Some(order) = session.orders.get_mut(&order_id) {
                            order.quantity = quantity;
                        }
                    }
                    None => {}
                }
            }
        }
    }
}

/// The process-wide shared state: the engine behind its exclusive lock,
/// the configuration and the stop signal.
pub struct SharedState {
    /// The single exclusive critical section
    pub engine: Mutex<Engine>,
    /// Engine configuration
    pub config: EngineConfig,
    shutdown: watch::Sender<bool>,
}

impl SharedState {
    /// Builds the shared state from a loaded configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine: Mutex::new(Engine::new(&config)),
            config,
            shutdown,
        }
    }

    /// A receiver that resolves when the engine is told to stop.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signals every loop to stop.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// True once [`Self::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}
