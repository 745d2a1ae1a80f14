//! Product catalog, categories and the stock ledger.

mod category;
mod product;
mod stock;

pub use category::{Category, CategoryPatch, NewCategory};
pub use product::{NewProduct, Product, ProductFilter, ProductPatch};
pub use stock::{StockLedger, StockReservation};
