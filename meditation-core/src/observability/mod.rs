pub mod logging;
pub mod metrics;
pub mod trace_context;

pub use logging::init_tracing;
pub use metrics::{get_metrics, init_metrics};
pub use trace_context::{
    REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER, TracedClientExt, TracedRequest,
    current_request_id, outbound_headers, with_request_id,
};
