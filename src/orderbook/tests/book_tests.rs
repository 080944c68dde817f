//! Book maintenance: cancels, modifies, accessors and round-trip laws.

#[cfg(test)]
mod tests {
    use crate::orderbook::{NewOrder, Order, OrderBook, OrderId, OrderUpdate, Side};

    fn rest_limit(book: &mut OrderBook, side: Side, price: u64, quantity: u64) -> OrderId {
        book.process_order(NewOrder::limit(side, price, quantity, None))
            .expect("valid limit order")
            .order
            .order_id
    }

    fn resting_state(book: &OrderBook) -> (Vec<Order>, Vec<Order>) {
        let snapshot = book.snapshot();
        (snapshot.bids, snapshot.asks)
    }

    #[test]
    fn test_cancel_after_add_restores_the_book() {
        let mut book = OrderBook::new("SIM");
        rest_limit(&mut book, Side::Buy, 100, 10);
        rest_limit(&mut book, Side::Sell, 102, 4);
        let before = resting_state(&book);

        let added = rest_limit(&mut book, Side::Buy, 99, 7);
        let removed = book.cancel_order(Side::Buy, added).unwrap();
        assert_eq!(removed.order_id, added);

        // Same ladders, same volumes; only id assignment advanced.
        assert_eq!(resting_state(&book), before);
        let next = rest_limit(&mut book, Side::Buy, 98, 1);
        assert!(next > added);
    }

    #[test]
    fn test_cancel_unknown_id_is_silent() {
        let mut book = OrderBook::new("SIM");
        rest_limit(&mut book, Side::Buy, 100, 10);
        let before = resting_state(&book);

        assert!(book.cancel_order(Side::Buy, 999).is_none());
        assert!(book.cancel_by_id(999).is_none());
        assert_eq!(resting_state(&book), before);
    }

    #[test]
    fn test_cancel_checks_the_named_side() {
        let mut book = OrderBook::new("SIM");
        let bid = rest_limit(&mut book, Side::Buy, 100, 10);

        // The id rests on the bid side; naming the ask side is a no-op.
        assert!(book.cancel_order(Side::Sell, bid).is_none());
        assert!(book.order_exists(bid));
        assert!(book.cancel_order(Side::Buy, bid).is_some());
        assert!(!book.order_exists(bid));
    }

    #[test]
    fn test_modify_price_change_loses_priority() {
        let mut book = OrderBook::new("SIM");
        let moving = rest_limit(&mut book, Side::Buy, 99, 5);
        let incumbent = rest_limit(&mut book, Side::Buy, 100, 5);

        let modified = book
            .modify_order(
                moving,
                OrderUpdate {
                    order_id: moving,
                    side: Side::Buy,
                    price: 100,
                    quantity: 5,
                    timestamp: 0,
                },
            )
            .unwrap();
        assert_eq!(modified.price, 100);

        // The repriced order queues behind the incumbent at 100.
        let mut fills = Vec::new();
        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 6, None))
            .unwrap();
        for trade in result.transactions.iter() {
            fills.push(trade.passive_id);
        }
        assert_eq!(fills, vec![incumbent, moving]);
    }

    #[test]
    fn test_modify_quantity_decrease_keeps_priority() {
        let mut book = OrderBook::new("SIM");
        let first = rest_limit(&mut book, Side::Buy, 100, 10);
        rest_limit(&mut book, Side::Buy, 100, 10);

        book.modify_order(
            first,
            OrderUpdate {
                order_id: first,
                side: Side::Buy,
                price: 100,
                quantity: 4,
                timestamp: 0,
            },
        )
        .unwrap();

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 1, None))
            .unwrap();
        assert_eq!(result.transactions.iter().next().unwrap().passive_id, first);
    }

    #[test]
    fn test_modify_quantity_increase_loses_priority() {
        let mut book = OrderBook::new("SIM");
        let first = rest_limit(&mut book, Side::Buy, 100, 10);
        let second = rest_limit(&mut book, Side::Buy, 100, 10);

        book.modify_order(
            first,
            OrderUpdate {
                order_id: first,
                side: Side::Buy,
                price: 100,
                quantity: 15,
                timestamp: 0,
            },
        )
        .unwrap();

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 1, None))
            .unwrap();
        assert_eq!(
            result.transactions.iter().next().unwrap().passive_id,
            second
        );
        assert_eq!(book.volume_at_price(Side::Buy, 100), 24);
    }

    #[test]
    fn test_modify_unknown_order_is_none() {
        let mut book = OrderBook::new("SIM");
        assert!(
            book.modify_order(
                7,
                OrderUpdate {
                    order_id: 7,
                    side: Side::Buy,
                    price: 100,
                    quantity: 5,
                    timestamp: 0,
                },
            )
            .is_none()
        );
    }

    #[test]
    fn test_lookup_accessors() {
        let mut book = OrderBook::new("SIM");
        let bid = rest_limit(&mut book, Side::Buy, 100, 10);
        let ask = rest_limit(&mut book, Side::Sell, 103, 5);

        assert!(book.order_exists(bid));
        assert_eq!(book.order_side(bid), Some(Side::Buy));
        assert_eq!(book.order_side(ask), Some(Side::Sell));
        assert_eq!(book.get_order(ask).unwrap().price, 103);
        assert_eq!(book.get_order(999), None);

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(103));
        assert_eq!(book.spread(), Some(3));
        assert_eq!(book.mid_price(), Some(101.5));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_worst_prices() {
        let mut book = OrderBook::new("SIM");
        rest_limit(&mut book, Side::Buy, 100, 1);
        rest_limit(&mut book, Side::Buy, 97, 1);
        rest_limit(&mut book, Side::Sell, 101, 1);
        rest_limit(&mut book, Side::Sell, 104, 1);

        assert_eq!(book.worst_bid(), Some(97));
        assert_eq!(book.worst_ask(), Some(104));
    }

    #[test]
    fn test_display_renders_levels_and_trades() {
        let mut book = OrderBook::new("SIM");
        rest_limit(&mut book, Side::Buy, 100, 10);
        rest_limit(&mut book, Side::Sell, 102, 5);
        book.process_order(NewOrder::market(Side::Buy, 2, None))
            .unwrap();

        let rendered = format!("{book}");
        assert!(rendered.contains("--- [Asks] ---"));
        assert!(rendered.contains("102 - 3"));
        assert!(rendered.contains("100 - 10"));
        assert!(rendered.contains("--- [Trades] ---"));
        assert!(rendered.contains("2 @ 102"));
    }
}
