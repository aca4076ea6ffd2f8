//! Demo workload
//!
//! A tiny HTTP service that fails a fixed share of requests and logs an error
//! line each time, giving the agent something to diagnose.

mod routes;

use axum::{routing::get, Router};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing_subscriber::fmt::{format::DefaultFields, format::Format, MakeWriter, SubscriberBuilder};
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;

pub use routes::{FAILURE_BODY, FAILURE_LOG, SUCCESS_BODY, SUCCESS_LOG};

/// Decides, per request, whether to simulate a failure.
pub struct FailureInjector {
    rng: Mutex<StdRng>,
    failure_rate: f64,
}

impl FailureInjector {
    pub fn new(failure_rate: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            failure_rate,
        }
    }

    /// Deterministic sequence of decisions for a given seed.
    pub fn seeded(failure_rate: f64, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            failure_rate,
        }
    }

    /// Uniform draw in [0, 1) compared against the failure rate.
    pub fn should_fail(&self) -> bool {
        let draw: f64 = match self.rng.lock() {
            Ok(mut rng) => rng.gen(),
            // A poisoned lock only means another handler panicked mid-draw.
            Err(poisoned) => poisoned.into_inner().gen(),
        };
        draw < self.failure_rate
    }
}

/// Log output for the demo workload. Plain text only: the lines end up in
/// `kubectl logs` and from there in the agent's prompt.
pub fn log_subscriber<W>(filter: &str, writer: W) -> SubscriberBuilder<DefaultFields, Format, EnvFilter, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
}

pub struct Server {
    injector: Arc<FailureInjector>,
}

impl Server {
    pub fn new(injector: FailureInjector) -> Self {
        Self {
            injector: Arc::new(injector),
        }
    }

    pub fn from_config(config: &DemoConfig, seed: Option<u64>) -> Self {
        let injector = match seed {
            Some(seed) => FailureInjector::seeded(config.failure_rate, seed),
            None => FailureInjector::new(config.failure_rate),
        };
        Self::new(injector)
    }

    pub fn build_router(self) -> Router {
        Router::new()
            .route("/", get(routes::index))
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::prometheus_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.injector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_failure_rate_converges() {
        let injector = FailureInjector::seeded(0.2, 42);
        let failures = (0..10_000).filter(|_| injector.should_fail()).count();
        let rate = failures as f64 / 10_000.0;
        assert!((rate - 0.2).abs() <= 0.02, "observed failure rate {}", rate);
    }

    #[test]
    fn same_seed_same_decisions() {
        let a = FailureInjector::seeded(0.2, 7);
        let b = FailureInjector::seeded(0.2, 7);
        let first: Vec<bool> = (0..100).map(|_| a.should_fail()).collect();
        let second: Vec<bool> = (0..100).map(|_| b.should_fail()).collect();
        assert_eq!(first, second);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failure_log_lines_are_plain_text() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = log_subscriber("sre_agent=info", move || writer.clone()).finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("{}", FAILURE_LOG);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"));
        assert!(output.contains(FAILURE_LOG));
        assert!(!output.contains('\x1b'), "escape codes in {:?}", output);
    }

    #[test]
    fn extreme_rates() {
        let never = FailureInjector::seeded(0.0, 1);
        let always = FailureInjector::seeded(1.0, 1);
        assert!((0..1_000).all(|_| !never.should_fail()));
        assert!((0..1_000).all(|_| always.should_fail()));
    }
}
