//! A single stochastic event generator and its generation loop.

use crate::orderbook::{NewOrder, OrderBook, OrderId, Side};
use crate::server::state::SharedState;
use crate::wire::Outbound;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Geometric};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

/// Success probability of the geometric market-order quantity draw.
const MARKET_QUANTITY_P: f64 = 0.05;
/// Granularity of the stop-flag polling inside a generator sleep.
const SLEEP_SLICE_MS: u64 = 10;

/// What a generator produces on each firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Pegged limit order addition
    Add,
    /// Cancellation of a random order at the pegged level
    Cancel,
    /// Market order
    Market,
}

/// One independent generator: an event kind, a side, a pegged price level
/// and an exponential inter-arrival rate.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    /// What this generator emits
    pub kind: EventKind,
    /// Side of the emitted events
    pub side: Side,
    /// Levels off the opposite best quote; unused by market generators
    pub level: u64,
    /// Mean arrival rate, events per second
    pub rate: f64,
    /// Tick size used to convert the level into a price offset
    pub tick_size: u64,
}

impl EventGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(kind: EventKind, side: Side, level: u64, rate: f64, tick_size: u64) -> Self {
        Self {
            kind,
            side,
            level,
            rate,
            tick_size,
        }
    }

    /// Infers the price this generator targets, pegged `level` ticks off
    /// the opposite best quote, falling back to the same-side best when
    /// the opposite side is empty.
    ///
    /// Returns `None` when no reference quote exists or the peg would
    /// cross zero.
    #[must_use]
    pub fn peg_price(&self, book: &OrderBook) -> Option<u64> {
        let peg = self.level.saturating_mul(self.tick_size);
        match self.side {
            Side::Buy => {
                let reference = book.best_ask().or_else(|| book.best_bid())?;
                reference.checked_sub(peg).filter(|price| *price > 0)
            }
            Side::Sell => {
                let reference = book.best_bid().or_else(|| book.best_ask())?;
                reference.checked_add(peg)
            }
        }
    }
}

/// Samples an exponential inter-arrival delay in seconds. Falls back to
/// the distribution mean when the rate is degenerate.
fn sample_delay_seconds(rate: f64, rng: &mut StdRng) -> f64 {
    match Exp::new(rate) {
        Ok(exp) => exp.sample(rng),
        Err(_) => 1.0 / rate.max(f64::EPSILON),
    }
}

/// Draws a market-order quantity: a geometric number of trials, at least 1.
fn market_quantity(rng: &mut StdRng) -> u64 {
    match Geometric::new(MARKET_QUANTITY_P) {
        Ok(geometric) => geometric.sample(rng).saturating_add(1),
        Err(_) => 1,
    }
}

/// Picks a uniformly random resting order at the given level, if the
/// level exists and is non-empty.
fn choose_random_order_id(
    book: &OrderBook,
    side: Side,
    price: u64,
    rng: &mut StdRng,
) -> Option<OrderId> {
    let ladder = match side {
        Side::Buy => book.bids(),
        Side::Sell => book.asks(),
    };
    let level = ladder.level(price)?;
    let ids: Vec<OrderId> = level.iter().map(|order| order.order_id).collect();
    if ids.is_empty() {
        return None;
    }
    Some(ids[rng.gen_range(0..ids.len())])
}

/// Runs one generator until the stop signal: sleep an exponential delay
/// (polling the stop flag every 10 ms), then apply one event under the
/// engine lock and publish its public messages.
pub async fn generation_loop(state: Arc<SharedState>, generator: EventGenerator) {
    let mut rng = StdRng::from_entropy();
    let mut shutdown = state.shutdown_signal();
    let instrument = state.config.book.instrument.clone();

    while !*shutdown.borrow() {
        sleep_until_next_event(&generator, &mut shutdown, &mut rng).await;
        if *shutdown.borrow() {
            break;
        }
        apply_event(&state, &generator, &instrument, &mut rng).await;
    }
    debug!(kind = ?generator.kind, side = %generator.side, level = generator.level, "event generation stopped");
}

/// Sleeps for an exponentially distributed delay, waking every 10 ms to
/// check the stop flag.
async fn sleep_until_next_event(
    generator: &EventGenerator,
    shutdown: &mut watch::Receiver<bool>,
    rng: &mut StdRng,
) {
    let millis = (sample_delay_seconds(generator.rate, rng) * 1000.0) as u64;
    let mut slept = 0;
    while slept < millis {
        if *shutdown.borrow() {
            return;
        }
        let step = (millis - slept).min(SLEEP_SLICE_MS);
        sleep(Duration::from_millis(step)).await;
        slept += step;
    }
}

/// Creates and applies one event inside the critical section, then queues
/// the resulting public messages. Simulated flow carries no owner, so it
/// never triggers self-match prevention; passive fills against client
/// orders are still delivered to their sessions.
async fn apply_event(
    state: &Arc<SharedState>,
    generator: &EventGenerator,
    instrument: &str,
    rng: &mut StdRng,
) {
    let mut engine = state.engine.lock().await;
    let engine = &mut *engine;
    let Some(book) = engine.books.get_mut(instrument) else {
        return;
    };

    match generator.kind {
        EventKind::Add => {
            let Some(price) = generator.peg_price(book) else {
                return;
            };
            let quantity = rng.gen_range(1..10);
            match book.process_order(NewOrder::limit(generator.side, price, quantity, None)) {
                Ok(result) => {
                    let rested = result.order.quantity > 0;
                    engine.publish_transactions(instrument, &result.transactions);
                    engine.deliver_passive_fills(&result.transactions);
                    if rested {
                        let add = Outbound::add(&result.order, instrument, false);
                        engine.publish(instrument, add);
                    }
                }
                Err(err) => debug!(%err, "simulated add rejected"),
            }
        }

        EventKind::Cancel => {
            let Some(price) = generator.peg_price(book) else {
                return;
            };
            let Some(target) = choose_random_order_id(book, generator.side, price, rng) else {
                return;
            };
            if let Some(removed) = book.cancel_order(generator.side, target) {
                let remove = Outbound::canceled(&removed, instrument, None);
                engine.publish(instrument, remove);
            }
        }

        EventKind::Market => {
            let quantity = market_quantity(rng);
            match book.process_order(NewOrder::market(generator.side, quantity, None)) {
                Ok(result) => {
                    engine.publish_transactions(instrument, &result.transactions);
                    engine.deliver_passive_fills(&result.transactions);
                }
                Err(err) => debug!(%err, "simulated market order rejected"),
            }
        }
    }
}
