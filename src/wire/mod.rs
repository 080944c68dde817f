//! Wire schema: JSON messages exchanged with order-entry clients and
//! market-data subscribers.

mod inbound;
mod outbound;

pub use inbound::{Inbound, decode};
pub use outbound::Outbound;
