//! Shopping carts and cart pricing.

mod cart;
mod pricing;

pub use cart::{merged_quantity, Cart, CartItem};
pub use pricing::{CartLine, CartPricing, CartView};
