//! Orders, order items and the fulfillment state machine.

mod address;
mod model;
mod status;

pub use address::{AddressSnapshot, ShippingAddress};
pub use model::{Order, OrderCode, OrderItem, PlacedOrder};
pub use status::{Actor, OrderItemStatus, PaymentStatus, UnknownStatus, is_allowed};
