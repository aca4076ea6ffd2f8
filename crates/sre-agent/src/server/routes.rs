use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use http::{header, StatusCode};
use std::sync::Arc;
use tracing::{error, info};

use super::FailureInjector;
use crate::metrics;

pub const FAILURE_LOG: &str = "CRITICAL: Database Connection Timeout. Retrying...";
pub const SUCCESS_LOG: &str = "Transaction processed successfully.";
pub const FAILURE_BODY: &str = "Internal Server Error";
pub const SUCCESS_BODY: &str = "OK";

pub async fn index(State(injector): State<Arc<FailureInjector>>) -> (StatusCode, &'static str) {
    let failed = injector.should_fail();
    metrics::record_request(failed);

    if failed {
        error!("{}", FAILURE_LOG);
        return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY);
    }

    info!("{}", SUCCESS_LOG);
    (StatusCode::OK, SUCCESS_BODY)
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn prometheus_metrics() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
