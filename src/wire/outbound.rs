//! Outbound message encoding: engine events rendered into the public wire
//! schema.

use crate::orderbook::{Order, OrderId, OrderKind, Side};
use serde::{Deserialize, Serialize};

/// A message sent to a client or published on the market-data feed.
///
/// The `message-type` tag on the wire selects the variant: `Y` accepted,
/// `R` rejected, `E` executed, `X` canceled/removed, `M` modify, `A` add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message-type")]
pub enum Outbound {
    /// Order accepted by the engine.
    #[serde(rename = "Y")]
    Accepted {
        /// Symbol the order was entered on
        instrument: String,
        /// LMT or MKT
        #[serde(rename = "order-type")]
        order_type: OrderKind,
        /// Buy or Sell
        side: Side,
        /// Quantity as entered
        quantity: u64,
        /// Limit price in ticks; absent for market orders
        #[serde(skip_serializing_if = "Option::is_none")]
        price: Option<u64>,
        /// Book-assigned order id
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// Acceptance time, microseconds
        timestamp: u64,
    },

    /// Order rejected; `reason` says why.
    ///
    /// Rejected enter-orders echo the order attributes back; rejected
    /// cancels only know the order id, so every order field is optional.
    #[serde(rename = "R")]
    Rejected {
        /// Symbol the request named
        instrument: String,
        /// LMT or MKT, when rejecting an enter-order
        #[serde(
            rename = "order-type",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        order_type: Option<OrderKind>,
        /// Buy or Sell, when rejecting an enter-order
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<Side>,
        /// Quantity as entered, when rejecting an enter-order
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<u64>,
        /// Limit price in ticks, when one was given
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<u64>,
        /// The order id named by a rejected cancel or modify
        #[serde(
            rename = "order-id",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        order_id: Option<OrderId>,
        /// Rejection time, microseconds
        timestamp: u64,
        /// Human-readable rejection reason
        reason: String,
    },

    /// A fill on one side of a trade.
    #[serde(rename = "E")]
    Executed {
        /// LMT or MKT; passive fills are always LMT
        #[serde(rename = "order-type")]
        order_type: OrderKind,
        /// Trade time, microseconds
        timestamp: u64,
        /// Traded price in ticks (the passive order's price)
        price: u64,
        /// The filled order's id
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// Traded quantity
        quantity: u64,
        /// Side of the filled order
        side: Side,
    },

    /// Order canceled, or a resting order removed from the public book.
    #[serde(rename = "X")]
    Canceled {
        /// The removed order's id
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// Symbol the order rested on
        instrument: String,
        /// Side the order rested on
        side: Side,
        /// Remaining quantity at removal, when known
        #[serde(skip_serializing_if = "Option::is_none")]
        quantity: Option<u64>,
        /// Resting price in ticks
        price: u64,
        /// Removal time, microseconds
        timestamp: u64,
        /// Cancel reason; absent on anonymized public removes
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A resting order's quantity changed (partial fill).
    #[serde(rename = "M")]
    Modify {
        /// Modification time, microseconds
        timestamp: u64,
        /// Side the order rests on
        side: Side,
        /// Resting price in ticks
        price: u64,
        /// The modified order's id
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// New resting quantity
        quantity: u64,
    },

    /// A new resting order on the public book.
    #[serde(rename = "A")]
    Add {
        /// The resting order's id
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// Symbol the order rests on
        instrument: String,
        /// Always LMT: only limit orders rest
        #[serde(rename = "order-type")]
        order_type: OrderKind,
        /// Resting quantity
        quantity: u64,
        /// Resting price in ticks
        price: u64,
        /// Side the order rests on
        side: Side,
        /// Acceptance time, microseconds
        timestamp: u64,
        /// 1 when part of a subscription snapshot, 0 on live deltas
        snapshot: u8,
    },
}

impl Outbound {
    /// Builds the public `A` add message for an order resting in the book.
    #[must_use]
    pub fn add(order: &Order, instrument: &str, snapshot: bool) -> Self {
        Outbound::Add {
            order_id: order.order_id,
            instrument: instrument.to_string(),
            order_type: OrderKind::Limit,
            quantity: order.quantity,
            price: order.price,
            side: order.side,
            timestamp: order.timestamp,
            snapshot: u8::from(snapshot),
        }
    }

    /// Builds the `R` reject for an enter-order request.
    #[must_use]
    pub fn reject_order(
        instrument: &str,
        order_type: OrderKind,
        side: Side,
        quantity: u64,
        price: Option<u64>,
        timestamp: u64,
        reason: &str,
    ) -> Self {
        Outbound::Rejected {
            instrument: instrument.to_string(),
            order_type: Some(order_type),
            side: Some(side),
            quantity: Some(quantity),
            price,
            order_id: None,
            timestamp,
            reason: reason.to_string(),
        }
    }

    /// Builds the `R` reject for a cancel request.
    #[must_use]
    pub fn reject_cancel(instrument: &str, order_id: OrderId, timestamp: u64, reason: &str) -> Self {
        Outbound::Rejected {
            instrument: instrument.to_string(),
            order_type: None,
            side: None,
            quantity: None,
            price: None,
            order_id: Some(order_id),
            timestamp,
            reason: reason.to_string(),
        }
    }

    /// Builds an `X` cancel message for a removed order.
    #[must_use]
    pub fn canceled(order: &Order, instrument: &str, reason: Option<&str>) -> Self {
        Outbound::Canceled {
            order_id: order.order_id,
            instrument: instrument.to_string(),
            side: order.side,
            quantity: Some(order.quantity),
            price: order.price,
            timestamp: order.timestamp,
            reason: reason.map(str::to_string),
        }
    }

    /// Serializes this message to its wire JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        // The schema is closed over plain values; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_wire_shape() {
        let msg = Outbound::Accepted {
            instrument: "SIM".to_string(),
            order_type: OrderKind::Limit,
            side: Side::Buy,
            quantity: 10,
            price: Some(100),
            order_id: 7,
            timestamp: 1,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(value["message-type"], "Y");
        assert_eq!(value["order-type"], "LMT");
        assert_eq!(value["order-id"], 7);
        assert_eq!(value["side"], "B");
        assert_eq!(value["price"], 100);
    }

    #[test]
    fn test_market_reject_omits_price() {
        let msg = Outbound::reject_order(
            "SIM",
            OrderKind::Market,
            Side::Sell,
            3,
            None,
            1,
            "Invalid symbol",
        );
        let value: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(value["message-type"], "R");
        assert!(value.get("price").is_none());
        assert!(value.get("order-id").is_none());
        assert_eq!(value["reason"], "Invalid symbol");
    }

    #[test]
    fn test_cancel_reject_carries_only_order_id() {
        let msg = Outbound::reject_cancel("SIM", 12, 1, "Not your order.");
        let value: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(value["order-id"], 12);
        assert!(value.get("side").is_none());
        assert!(value.get("quantity").is_none());
    }

    #[test]
    fn test_snapshot_flag_roundtrip() {
        let order = Order {
            order_id: 3,
            side: Side::Sell,
            kind: OrderKind::Limit,
            price: 105,
            quantity: 4,
            timestamp: 9,
            owner: None,
        };
        let msg = Outbound::add(&order, "SIM", true);
        let value: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(value["snapshot"], 1);

        let back: Outbound = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }
}
