//! Self-match prevention: an owner's resting orders are canceled before
//! they can match that owner's incoming order.

#[cfg(test)]
mod tests {
    use crate::orderbook::{NewOrder, OrderBook, OrderId, Side};
    use uuid::Uuid;

    fn rest_limit(
        book: &mut OrderBook,
        side: Side,
        price: u64,
        quantity: u64,
        owner: Option<Uuid>,
    ) -> OrderId {
        book.process_order(NewOrder::limit(side, price, quantity, owner))
            .expect("valid limit order")
            .order
            .order_id
    }

    #[test]
    fn test_incoming_sell_cancels_own_crossing_bid() {
        let mut book = OrderBook::new("SIM");
        let trader = Uuid::new_v4();
        let resting = rest_limit(&mut book, Side::Buy, 100, 5, Some(trader));

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 3, Some(trader)))
            .unwrap();

        // The resting buy was canceled, not traded.
        assert!(result.transactions.is_empty());
        assert_eq!(result.smp_cancels.len(), 1);
        let canceled = &result.smp_cancels[0].order;
        assert_eq!(canceled.order_id, resting);
        assert_eq!(canceled.quantity, 5);
        assert_eq!(canceled.owner, Some(trader));

        // The new sell rests at 100 with its full quantity.
        assert!(!book.order_exists(resting));
        assert_eq!(book.best_ask(), Some(100));
        assert_eq!(book.volume_at_price(Side::Sell, 100), 3);
        assert!(book.bids().is_empty());
    }

    #[test]
    fn test_smp_spares_non_crossing_orders() {
        let mut book = OrderBook::new("SIM");
        let trader = Uuid::new_v4();
        let crossing = rest_limit(&mut book, Side::Buy, 100, 5, Some(trader));
        let safe = rest_limit(&mut book, Side::Buy, 99, 5, Some(trader));

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 3, Some(trader)))
            .unwrap();

        assert_eq!(result.smp_cancels.len(), 1);
        assert_eq!(result.smp_cancels[0].order.order_id, crossing);
        assert!(book.order_exists(safe));
        assert_eq!(book.best_bid(), Some(99));
    }

    #[test]
    fn test_market_order_smp_covers_every_price() {
        let mut book = OrderBook::new("SIM");
        let trader = Uuid::new_v4();
        rest_limit(&mut book, Side::Sell, 101, 5, Some(trader));
        rest_limit(&mut book, Side::Sell, 110, 5, Some(trader));
        let other = rest_limit(&mut book, Side::Sell, 105, 5, Some(Uuid::new_v4()));

        let result = book
            .process_order(NewOrder::market(Side::Buy, 5, Some(trader)))
            .unwrap();

        // Both own asks canceled regardless of depth; the other trader's
        // order is what trades.
        assert_eq!(result.smp_cancels.len(), 2);
        assert_eq!(result.transactions.len(), 1);
        let trade = result.transactions.iter().next().unwrap();
        assert_eq!(trade.passive_id, other);
        assert_eq!(trade.traded_price, 105);
    }

    #[test]
    fn test_other_owners_match_normally() {
        let mut book = OrderBook::new("SIM");
        let maker = Uuid::new_v4();
        let taker = Uuid::new_v4();
        let resting = rest_limit(&mut book, Side::Buy, 100, 5, Some(maker));

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 5, Some(taker)))
            .unwrap();

        assert!(result.smp_cancels.is_empty());
        assert_eq!(result.transactions.len(), 1);
        let trade = result.transactions.iter().next().unwrap();
        assert_eq!(trade.passive_id, resting);
        assert_eq!(trade.passive_owner, Some(maker));
    }

    #[test]
    fn test_simulated_flow_is_exempt() {
        let mut book = OrderBook::new("SIM");
        rest_limit(&mut book, Side::Buy, 100, 5, None);

        // Anonymous incoming sell trades against the anonymous bid.
        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 5, None))
            .unwrap();

        assert!(result.smp_cancels.is_empty());
        assert_eq!(result.transactions.len(), 1);
    }

    #[test]
    fn test_smp_cancel_precedes_matching_with_third_party() {
        let mut book = OrderBook::new("SIM");
        let trader = Uuid::new_v4();
        let own = rest_limit(&mut book, Side::Buy, 100, 5, Some(trader));
        let third = rest_limit(&mut book, Side::Buy, 100, 5, Some(Uuid::new_v4()));

        let result = book
            .process_order(NewOrder::limit(Side::Sell, 100, 4, Some(trader)))
            .unwrap();

        // Own order canceled first, then the third party fills the sell.
        assert_eq!(result.smp_cancels.len(), 1);
        assert_eq!(result.smp_cancels[0].order.order_id, own);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions.iter().next().unwrap().passive_id, third);
        assert_eq!(book.volume_at_price(Side::Buy, 100), 1);
    }
}
