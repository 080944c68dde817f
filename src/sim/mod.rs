//! Market simulation: initial book seeding and the population of
//! stochastic generators that keep the book alive.

mod generator;

pub use generator::{EventGenerator, EventKind, generation_loop};

use crate::config::BookConfig;
use crate::orderbook::{NewOrder, OrderBook, Side};
use crate::server::state::SharedState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Number of pegged price levels covered by each add/cancel generator
/// family.
pub const N_LEVELS: u64 = 15;
/// Arrival rate of the two market-order generators, events per second.
const MARKET_ORDER_RATE: f64 = 0.5;

/// Arrival rate of add generators at a pegged level: busiest at the touch,
/// decaying exponentially with depth.
fn add_rate(level: u64) -> f64 {
    1.10 * (-0.08 * (level as f64 - 1.0)).exp()
}

/// Arrival rate of cancel generators at a pegged level.
fn cancel_rate(level: u64) -> f64 {
    1.0 * (-0.10 * (level as f64 - 1.0)).exp()
}

/// Seeds the book with `initial_orders` resting orders at each of
/// `initial_book_levels` price levels on both sides of the configured
/// opening quotes.
pub fn seed_book(book: &mut OrderBook, config: &BookConfig) {
    for offset in 0..config.initial_book_levels {
        let price = config.initial_best_ask.saturating_add(offset);
        for _ in 0..config.initial_orders {
            if let Err(err) = book.process_order(NewOrder::limit(
                Side::Sell,
                price,
                config.initial_order_volume,
                None,
            )) {
                warn!(%err, price, "failed to seed ask level");
            }
        }
    }

    for offset in 0..config.initial_book_levels {
        let Some(price) = config
            .initial_best_bid
            .checked_sub(offset)
            .filter(|price| *price > 0)
        else {
            break;
        };
        for _ in 0..config.initial_orders {
            if let Err(err) = book.process_order(NewOrder::limit(
                Side::Buy,
                price,
                config.initial_order_volume,
                None,
            )) {
                warn!(%err, price, "failed to seed bid level");
            }
        }
    }

    info!(
        symbol = book.symbol(),
        best_bid = book.best_bid(),
        best_ask = book.best_ask(),
        orders = book.order_count(),
        "seeded order book"
    );
}

/// Spawns the generator population: one add and one cancel generator per
/// side and pegged level, plus one market-order generator per side.
pub fn spawn_generators(state: &Arc<SharedState>) -> Vec<JoinHandle<()>> {
    let tick_size = state.config.book.tick_size;
    let mut handles = Vec::new();

    for side in [Side::Buy, Side::Sell] {
        for level in 1..=N_LEVELS {
            handles.push(tokio::spawn(generation_loop(
                Arc::clone(state),
                EventGenerator::new(EventKind::Add, side, level, add_rate(level), tick_size),
            )));
        }
        for level in 1..=N_LEVELS {
            handles.push(tokio::spawn(generation_loop(
                Arc::clone(state),
                EventGenerator::new(
                    EventKind::Cancel,
                    side,
                    level,
                    cancel_rate(level),
                    tick_size,
                ),
            )));
        }
        handles.push(tokio::spawn(generation_loop(
            Arc::clone(state),
            EventGenerator::new(EventKind::Market, side, 0, MARKET_ORDER_RATE, tick_size),
        )));
    }

    info!(generators = handles.len(), "simulation started");
    handles
}
