//! Market-data gateway and the public event dispatcher.
//!
//! Subscribers connect, request `"topic:symbol"` subscriptions and then
//! receive the filtered public feed. The dispatcher drains the event queue
//! under the engine lock, so every subscriber observes events in exactly
//! the order the matching engine produced them. The snapshot protocol runs
//! under the same lock, which makes a snapshot and its subsequent delta
//! stream strictly consistent.

use crate::config::DisplayStyle;
use crate::server::state::{MarketDataSession, SharedState, Topics};
use crate::wire::{Inbound, Outbound, decode};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pause between dispatcher drain passes.
const DISPATCH_PAUSE: Duration = Duration::from_millis(10);

/// Accept loop for the market-data gateway. Runs until the stop signal.
pub async fn accept_market_data_clients(state: Arc<SharedState>) {
    let addr = state.config.market_data.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %addr, "market data gateway failed to bind");
            state.stop();
            return;
        }
    };
    info!(%addr, "market data gateway listening");

    let mut shutdown = state.shutdown_signal();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "market data connection");
                    tokio::spawn(handle_market_data_client(Arc::clone(&state), stream));
                }
                Err(err) => warn!(%err, "market data accept failed"),
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("market data gateway stopped");
}

/// Per-subscriber task: handshake, register, then serve subscription
/// requests until EOF or shutdown.
async fn handle_market_data_client(state: Arc<SharedState>, stream: TcpStream) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%err, "market data handshake failed");
            return;
        }
    };
    let (mut sink, mut frames) = ws.split();

    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    {
        let mut engine = state.engine.lock().await;
        engine
            .md_sessions
            .insert(id, MarketDataSession::new(id, tx));
    }
    info!(subscriber = %id, "market data session opened");

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut shutdown = state.shutdown_signal();
    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode(&text) {
                    Some(Inbound::Subscribe { args }) => handle_subscribe(&state, id, &args).await,
                    Some(Inbound::Unsubscribe { args }) => {
                        handle_unsubscribe(&state, id, &args).await;
                    }
                    Some(_) => debug!(subscriber = %id, "ignoring non-subscription request"),
                    None => {}
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, subscriber = %id, "market data read failed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    state.engine.lock().await.md_sessions.remove(&id);
    let _ = writer.await;
    info!(subscriber = %id, "market data session closed");
}

/// Splits a `"topic:symbol"` argument into a topic set and a symbol.
#[must_use]
pub fn parse_subscription_arg(arg: &str) -> Option<(Topics, &str)> {
    let (topic, symbol) = arg.split_once(':')?;
    Some((Topics::parse(topic)?, symbol))
}

/// Applies a subscribe request and runs the snapshot protocol.
///
/// For every `orderBookL2` subscription the full book is streamed as
/// `A`/`snapshot: 1` messages before `snapshot_sent` flips, all inside the
/// critical section; no delta can interleave. A trade-only subscription
/// has nothing to snapshot and flips the flag immediately.
async fn handle_subscribe(state: &Arc<SharedState>, id: Uuid, args: &[String]) {
    let mut engine = state.engine.lock().await;
    let engine = &mut *engine;

    let requests: Vec<(Topics, String)> = args
        .iter()
        .filter_map(|arg| parse_subscription_arg(arg))
        .filter(|(_, symbol)| {
            let known = engine.books.contains_key(*symbol);
            if !known {
                debug!(subscriber = %id, symbol, "subscription for unknown symbol dropped");
            }
            known
        })
        .map(|(topics, symbol)| (topics, symbol.to_string()))
        .collect();

    let Some(session) = engine.md_sessions.get_mut(&id) else {
        return;
    };

    let mut snapshot_symbols = Vec::new();
    for (topics, symbol) in requests {
        if topics.contains(Topics::ORDER_BOOK_L2) {
            snapshot_symbols.push(symbol.clone());
        }
        *session.subscriptions.entry(symbol).or_default() |= topics;
    }

    for symbol in &snapshot_symbols {
        if let Some(book) = engine.books.get(symbol) {
            let snapshot = book.snapshot();
            for order in snapshot.bids.iter().chain(snapshot.asks.iter()) {
                session.send(&Outbound::add(order, symbol, true));
            }
        }
    }
    session.snapshot_sent = true;
}

/// Removes subscriptions named by an unsubscribe request.
async fn handle_unsubscribe(state: &Arc<SharedState>, id: Uuid, args: &[String]) {
    let mut engine = state.engine.lock().await;
    let Some(session) = engine.md_sessions.get_mut(&id) else {
        return;
    };
    for arg in args {
        let Some((topics, symbol)) = parse_subscription_arg(arg) else {
            continue;
        };
        if let Some(existing) = session.subscriptions.get_mut(symbol) {
            existing.remove(topics);
            if existing.is_empty() {
                session.subscriptions.remove(symbol);
            }
        }
    }
}

/// The dispatcher: drains the public event queue under the lock and fans
/// each event out to the subscribers whose filters match, then pauses
/// briefly. Terminates on the stop signal.
pub async fn dispatch_market_data(state: Arc<SharedState>) {
    info!("market data dispatcher started");
    let mut shutdown = state.shutdown_signal();

    while !*shutdown.borrow() {
        {
            let mut engine = state.engine.lock().await;
            let engine = &mut *engine;
            while let Some(event) = engine.event_queue.pop_front() {
                for session in engine.md_sessions.values() {
                    if session.wants(&event) {
                        session.send(&event.message);
                    }
                }
                match state.config.display.style {
                    DisplayStyle::Book => {
                        if let Some(book) = engine.books.get(&event.instrument) {
                            println!("{book}");
                        }
                    }
                    DisplayStyle::Messages => println!("{}", event.message.to_json()),
                    DisplayStyle::None => {}
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(DISPATCH_PAUSE) => {}
            _ = shutdown.changed() => break,
        }
    }
    info!("market data dispatcher stopped");
}
