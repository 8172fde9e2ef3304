use tracing::trace;

// Metric points emitted as trace events under `spapi.metrics`. Nothing aggregates
// them in-process; count them from the log stream.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "spapi.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn poll_attempt(status: &str) {
    trace!(
        target = "spapi.metrics",
        status = status,
        "feed_polls_total_inc"
    );
}

pub fn job_finished(kind: &'static str, outcome: &str, elapsed_ms: u128) {
    trace!(
        target = "spapi.metrics",
        kind = kind,
        outcome = outcome,
        elapsed_ms = elapsed_ms as u64,
        "job_finished"
    );
}
