//! Logging bootstrap and request correlation for Emporium.
//!
//! This crate provides:
//! - `LogConfig` / `init` - installs the global `tracing` subscriber
//! - `RequestId` - correlation id attached to every operation span
//! - `operation_span` - the span each top-level operation runs in

mod error;
mod logging;
mod request;
mod span;

pub use error::ObservabilityError;
pub use logging::*;
pub use request::RequestId;
pub use span::*;
