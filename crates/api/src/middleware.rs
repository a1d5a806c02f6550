use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, info, info_span};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// Request id assigned by [`request_context`], available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// `req_<millis>_<seq>`; the per-process sequence keeps ids unique within a millisecond.
pub fn next_request_id() -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("req_{}_{}", Utc::now().timestamp_millis(), seq)
}

/// Assign a request id, log entry and exit, and stamp id and elapsed seconds
/// onto the response headers.
pub async fn request_context(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let started = Instant::now();
    let request_id = next_request_id();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!("request", request_id = %request_id, method = %method, path = %path);
    async move {
        info!("incoming request");

        let mut response = next.run(req).await;

        let elapsed = started.elapsed();
        info!(
            status = response.status().as_u16(),
            process_time_ms = elapsed.as_secs_f64() * 1000.0,
            "request completed"
        );

        let headers = response.headers_mut();
        if let Ok(v) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, v);
        }
        if let Ok(v) = HeaderValue::from_str(&elapsed.as_secs_f64().to_string()) {
            headers.insert(PROCESS_TIME_HEADER, v);
        }
        response
    }
    .instrument(span)
    .await
}
