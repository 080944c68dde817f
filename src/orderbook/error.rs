//! Order book error types.

use super::order::OrderId;
use thiserror::Error;

/// Errors that can occur within the order book.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BookError {
    /// Order not found in the book
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A limit order was submitted without a positive price
    #[error("limit order requires a positive price")]
    MissingLimitPrice,

    /// Quantity failed validation
    #[error("order quantity must be positive, was {0}")]
    InvalidQuantity(u64),
}
