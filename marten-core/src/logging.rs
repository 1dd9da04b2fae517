//! Structured logging init, adapted from the teacher's
//! `r2e_core::layers::init_tracing`. The original Python project tagged
//! every log line with a request id pulled from a context var
//! (`_logging.py`'s `get_request_id()`); here that's a `request_id` field
//! entered into the current tracing span by the API layer, so it shows up
//! on every event emitted underneath without any of `marten-core`,
//! `marten-params`, or `marten-dag` knowing about HTTP at all.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber once per process. Safe to
/// call more than once — subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// A per-request correlation id, entered as a tracing span field by the
/// API layer around parameter resolution and DAG execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
