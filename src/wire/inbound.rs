//! Inbound message decoding: client frames lifted into typed commands.

use crate::orderbook::{OrderId, OrderKind, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A validated client request.
///
/// The `message-type` tag selects the variant: `A` enter or modify an
/// order, `X` cancel, `C` session configuration, plus the market-data
/// `subscribe`/`unsubscribe` verbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message-type")]
pub enum Inbound {
    /// Enter a new order, or modify one when `order-id` is present.
    #[serde(rename = "A")]
    EnterOrder {
        /// Symbol to trade
        instrument: String,
        /// LMT or MKT
        #[serde(rename = "order-type")]
        order_type: OrderKind,
        /// Buy or Sell
        side: Side,
        /// Quantity, must be at least 1
        quantity: u64,
        /// Limit price in ticks; required for LMT, ignored for MKT
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<u64>,
        /// When present, modifies the identified resting order instead
        #[serde(
            rename = "order-id",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        order_id: Option<OrderId>,
    },

    /// Cancel a resting order the client owns.
    #[serde(rename = "X")]
    CancelOrder {
        /// The order to cancel
        #[serde(rename = "order-id")]
        order_id: OrderId,
        /// Symbol the order rests on
        instrument: String,
    },

    /// Session configuration; acknowledged without state change.
    #[serde(rename = "C")]
    Configure {},

    /// Subscribe to market-data topics, `"topic:symbol"` per entry.
    #[serde(rename = "subscribe")]
    Subscribe {
        /// Topic requests, e.g. `"orderBookL2:SIM"` or `"trade:SIM"`
        args: Vec<String>,
    },

    /// Remove market-data subscriptions, same argument format.
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        /// Topic requests to drop
        args: Vec<String>,
    },
}

/// Decodes and validates one client frame.
///
/// Frames that fail to parse or violate the schema's domain constraints
/// (zero quantity, limit order without a positive price) are dropped
/// silently per the error-handling policy; a `debug` trace records why.
#[must_use]
pub fn decode(text: &str) -> Option<Inbound> {
    let message = match serde_json::from_str::<Inbound>(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(%err, "dropping malformed frame");
            return None;
        }
    };

    if let Inbound::EnterOrder {
        order_type,
        quantity,
        price,
        ..
    } = &message
    {
        if *quantity == 0 {
            debug!("dropping enter-order frame with zero quantity");
            return None;
        }
        if *order_type == OrderKind::Limit && price.map_or(true, |p| p == 0) {
            debug!("dropping limit-order frame without a positive price");
            return None;
        }
    }

    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_enter_limit_order() {
        let frame = r#"{"message-type":"A","instrument":"SIM","order-type":"LMT","side":"B","quantity":10,"price":100}"#;
        let decoded = decode(frame).unwrap();
        assert_eq!(
            decoded,
            Inbound::EnterOrder {
                instrument: "SIM".to_string(),
                order_type: OrderKind::Limit,
                side: Side::Buy,
                quantity: 10,
                price: Some(100),
                order_id: None,
            }
        );
    }

    #[test]
    fn test_decode_enter_market_order_without_price() {
        let frame = r#"{"message-type":"A","instrument":"SIM","order-type":"MKT","side":"S","quantity":5}"#;
        assert!(matches!(
            decode(frame),
            Some(Inbound::EnterOrder {
                order_type: OrderKind::Market,
                price: None,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_modify_carries_order_id() {
        let frame = r#"{"message-type":"A","instrument":"SIM","order-type":"LMT","side":"B","quantity":4,"price":99,"order-id":17}"#;
        assert!(matches!(
            decode(frame),
            Some(Inbound::EnterOrder {
                order_id: Some(17),
                ..
            })
        ));
    }

    #[test]
    fn test_decode_cancel() {
        let frame = r#"{"message-type":"X","order-id":12,"instrument":"SIM"}"#;
        assert_eq!(
            decode(frame),
            Some(Inbound::CancelOrder {
                order_id: 12,
                instrument: "SIM".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_subscribe() {
        let frame = r#"{"message-type":"subscribe","args":["orderBookL2:SIM","trade:SIM"]}"#;
        assert!(matches!(
            decode(frame),
            Some(Inbound::Subscribe { args }) if args.len() == 2
        ));
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        assert!(decode("not json").is_none());
        assert!(decode(r#"{"message-type":"Z"}"#).is_none());
        // Zero quantity fails validation.
        assert!(
            decode(
                r#"{"message-type":"A","instrument":"SIM","order-type":"LMT","side":"B","quantity":0,"price":100}"#
            )
            .is_none()
        );
        // Limit without a price fails validation.
        assert!(
            decode(
                r#"{"message-type":"A","instrument":"SIM","order-type":"LMT","side":"B","quantity":1}"#
            )
            .is_none()
        );
    }

    #[test]
    fn test_configure_tolerates_payload() {
        let frame = r#"{"message-type":"C","heartbeat-interval":30}"#;
        assert_eq!(decode(frame), Some(Inbound::Configure {}));
    }
}
