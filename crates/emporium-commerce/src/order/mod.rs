//! Orders and their lifecycle.

mod order;
mod status;

pub use order::{Order, OrderItem, PaymentWebhook, StatusChange};
pub use status::OrderStatus;
