//! Order-entry gateway: accepts clients and handles their requests.
//!
//! Each connection gets a trader UUID, a session record in the registry
//! and two tasks: this read loop and a writer draining the session's
//! outbound queue. Request handling takes the engine lock once per
//! request and performs all book operations, session bookkeeping and
//! event-queue pushes inside that one critical section.

use crate::orderbook::{NewOrder, OrderId, OrderKind, OrderUpdate, Side};
use crate::server::state::{OrderEntrySession, SharedState};
use crate::utils::current_time_micros;
use crate::wire::{Inbound, Outbound, decode};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reason attached to self-match-prevention cancels sent to the owner.
const SMP_REASON: &str = "Self-Match-Prevention";

/// Accept loop for the order-entry gateway. Runs until the stop signal.
pub async fn accept_order_entry_clients(state: Arc<SharedState>) {
    let addr = state.config.order_entry.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %addr, "order entry gateway failed to bind");
            state.stop();
            return;
        }
    };
    info!(%addr, "order entry gateway listening");

    let mut shutdown = state.shutdown_signal();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "order entry connection");
                    tokio::spawn(handle_order_entry_client(Arc::clone(&state), stream));
                }
                Err(err) => warn!(%err, "order entry accept failed"),
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("order entry gateway stopped");
}

/// Per-connection task: handshake, register, read frames until EOF or
/// shutdown, then unregister. Resting orders survive the session.
async fn handle_order_entry_client(state: Arc<SharedState>, stream: TcpStream) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%err, "order entry handshake failed");
            return;
        }
    };
    let (mut sink, mut frames) = ws.split();

    let trader_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    {
        let mut engine = state.engine.lock().await;
        engine
            .order_sessions
            .insert(trader_id, OrderEntrySession::new(trader_id, tx));
    }
    info!(%trader_id, "order entry session opened");

    // Writer task: drains the session queue outside the lock, so a slow
    // client cannot stall the critical section.
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
                Some(Ok(Message::Text(text))) => {
                    if let Some(request) = decode(&text) {
                        handle_request(&state, trader_id, request).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, %trader_id, "order entry read failed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    // Dropping the session closes its queue; the writer drains and exits.
    state.engine.lock().await.order_sessions.remove(&trader_id);
    let _ = writer.await;
    info!(%trader_id, "order entry session closed");
}

/// Dispatches one decoded request.
async fn handle_request(state: &Arc<SharedState>, trader_id: Uuid, request: Inbound) {
    match request {
        Inbound::EnterOrder {
            instrument,
            order_type,
            side,
            quantity,
            price,
            order_id,
        } => {
            handle_enter_order(
                state, trader_id, instrument, order_type, side, quantity, price, order_id,
            )
            .await;
        }
        Inbound::CancelOrder {
            order_id,
            instrument,
        } => handle_cancel_order(state, trader_id, instrument, order_id).await,
        Inbound::Configure {} => {
            // Acknowledged without state change.
            debug!(%trader_id, "session configuration acknowledged");
        }
        Inbound::Subscribe { .. } | Inbound::Unsubscribe { .. } => {
            debug!(%trader_id, "market-data verbs are not served on the order entry gateway");
        }
    }
}

/// Handles an `A` frame: a new order, or a modify when the id is known.
#[allow(clippy::too_many_arguments)]
async fn handle_enter_order(
    state: &Arc<SharedState>,
    trader_id: Uuid,
    instrument: String,
    order_type: OrderKind,
    side: Side,
    quantity: u64,
    price: Option<u64>,
    order_id: Option<OrderId>,
) {
    let mut engine = state.engine.lock().await;
    let engine = &mut *engine;
    let now = current_time_micros();

    let Some(book) = engine.books.get_mut(&instrument) else {
        if let Some(session) = engine.order_sessions.get(&trader_id) {
            session.send(&Outbound::reject_order(
                &instrument,
                order_type,
                side,
                quantity,
                price,
                now,
                "Invalid symbol",
            ));
        }
        return;
    };

    // Modification of a known resting order.
    if let Some(order_id) = order_id
        && book.order_exists(order_id)
    {
        let current_price = book.get_order(order_id).map(|o| o.price);
        let update = OrderUpdate {
            order_id,
            side,
            price: price.or(current_price).unwrap_or(0),
            quantity,
            timestamp: 0,
        };
        let modified = book.modify_order(order_id, update);
        let Some(modified) = modified else {
            warn!(%trader_id, order_id, "modify did not apply; side mismatch");
            return;
        };
        if let Some(session) = engine.order_sessions.get_mut(&trader_id) {
            session.send(&Outbound::Accepted {
                instrument: instrument.clone(),
                order_type: OrderKind::Limit,
                side: modified.side,
                quantity: modified.quantity,
                price: Some(modified.price),
                order_id,
                timestamp: modified.timestamp,
            });
            session.orders.insert(order_id, modified);
        }
        return;
    }

    // New order: match first, the order needs its id.
    let result = book.process_order(NewOrder {
        side,
        kind: order_type,
        price,
        quantity,
        owner: Some(trader_id),
    });
    let result = match result {
        Ok(result) => result,
        Err(err) => {
            if let Some(session) = engine.order_sessions.get(&trader_id) {
                session.send(&Outbound::reject_order(
                    &instrument,
                    order_type,
                    side,
                    quantity,
                    price,
                    now,
                    &err.to_string(),
                ));
            }
            return;
        }
    };

    let rested = result.order.kind == OrderKind::Limit && result.order.quantity > 0;

    if let Some(session) = engine.order_sessions.get_mut(&trader_id) {
        for cancel in &result.smp_cancels {
            session.send(&Outbound::canceled(
                &cancel.order,
                &instrument,
                Some(SMP_REASON),
            ));
            session.orders.remove(&cancel.order.order_id);
            session
                .canceled_orders
                .insert(cancel.order.order_id, cancel.order.clone());
        }
        session.send(&Outbound::Accepted {
            instrument: instrument.clone(),
            order_type,
            side,
            quantity,
            price,
            order_id: result.order.order_id,
            timestamp: result.order.timestamp,
        });
        for message in result.transactions.aggressor_messages() {
            session.send(&message);
        }
        if rested {
            session
                .orders
                .insert(result.order.order_id, result.order.clone());
        }
    }

    for cancel in &result.smp_cancels {
        let remove = Outbound::canceled(&cancel.order, &instrument, None);
        engine.publish(&instrument, remove);
    }
    engine.publish_transactions(&instrument, &result.transactions);
    engine.deliver_passive_fills(&result.transactions);
    if rested {
        let add = Outbound::add(&result.order, &instrument, false);
        engine.publish(&instrument, add);
    }
}

/// Handles an `X` frame: cancel an order this session owns.
async fn handle_cancel_order(
    state: &Arc<SharedState>,
    trader_id: Uuid,
    instrument: String,
    order_id: OrderId,
) {
    let mut engine = state.engine.lock().await;
    let engine = &mut *engine;
    let now = current_time_micros();

    if !engine.books.contains_key(&instrument) {
        if let Some(session) = engine.order_sessions.get(&trader_id) {
            session.send(&Outbound::reject_cancel(
                &instrument,
                order_id,
                now,
                "Invalid symbol",
            ));
        }
        return;
    }

    let owns = engine
        .order_sessions
        .get(&trader_id)
        .is_some_and(|session| session.orders.contains_key(&order_id));
    if !owns {
        if let Some(session) = engine.order_sessions.get(&trader_id) {
            session.send(&Outbound::reject_cancel(
                &instrument,
                order_id,
                now,
                "Not your order.",
            ));
        }
        return;
    }

    let removed = engine
        .books
        .get_mut(&instrument)
        .and_then(|book| book.cancel_by_id(order_id));
    let Some(removed) = removed else {
        if let Some(session) = engine.order_sessions.get(&trader_id) {
            session.send(&Outbound::reject_cancel(
                &instrument,
                order_id,
                now,
                "OrderId not found.",
            ));
        }
        return;
    };

    if let Some(session) = engine.order_sessions.get_mut(&trader_id) {
        session.orders.remove(&order_id);
        session.canceled_orders.insert(order_id, removed.clone());
        session.send(&Outbound::canceled(
            &removed,
            &instrument,
            Some("Client request."),
        ));
    }
    let remove = Outbound::canceled(&removed, &instrument, None);
    engine.publish(&instrument, remove);
}
