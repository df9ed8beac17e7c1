use tracing::{Span, field};

use super::TraceId;

/// Root span for a poll tick or a user-triggered action.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id.as_str(),
        instrument_id = field::Empty
    )
}

/// Child span; inherits the trace id from the enclosing root span.
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("child", name = %name, instrument_id = field::Empty)
}

pub fn annotate_span(instrument_id: &str) {
    Span::current().record("instrument_id", field::display(instrument_id));
}
