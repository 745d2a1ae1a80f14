//! Operation spans.

use tracing::Span;

use crate::RequestId;

/// Span for one top-level operation, e.g. a CLI command.
///
/// ```rust,ignore
/// let span = operation_span("checkout", &RequestId::generate());
/// run(args).instrument(span).await
/// ```
pub fn operation_span(operation: &str, request_id: &RequestId) -> Span {
    tracing::info_span!("operation", op = operation, request_id = %request_id)
}
