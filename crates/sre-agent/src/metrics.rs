use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: IntCounter = register(IntCounter::new(
        "broken_app_requests_total",
        "Total number of requests served by the demo workload."
    ));
    pub static ref FAILURES_TOTAL: IntCounter = register(IntCounter::new(
        "broken_app_failures_total",
        "Total number of requests answered with a simulated failure."
    ));
}

// Metric definitions are static, so a failure here is a programming error.
fn register(counter: prometheus::Result<IntCounter>) -> IntCounter {
    let counter = counter.expect("metric definition is valid");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
}

/// Record a served request and whether it failed.
pub fn record_request(failed: bool) {
    REQUESTS_TOTAL.inc();
    if failed {
        FAILURES_TOTAL.inc();
    }
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    // Touch the counters so they show up before the first request.
    lazy_static::initialize(&REQUESTS_TOTAL);
    lazy_static::initialize(&FAILURES_TOTAL);

    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| crate::Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_exposed() {
        let before = FAILURES_TOTAL.get();
        record_request(true);
        assert!(FAILURES_TOTAL.get() > before);

        let text = gather_metrics().unwrap();
        assert!(text.contains("broken_app_requests_total"));
        assert!(text.contains("broken_app_failures_total"));
    }
}
