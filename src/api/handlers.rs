// API handler functions module

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};

use super::types::{FaultStatus, FaultUpdate};
use crate::config::AppState;
use crate::http;
use crate::logger;

/// Largest request body the API will read
pub const MAX_BODY_BYTES: usize = 4 * 1024;

/// GET /v1/faults
pub fn handle_faults_get(state: &AppState) -> Response<Full<Bytes>> {
    logger::log_api_request("GET", "/v1/faults", 200);
    http::build_json_response(StatusCode::OK, &FaultStatus::from(&state.faults))
}

/// PUT|POST /v1/faults
pub async fn handle_faults_update<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().to_string();

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_api_request(&method, "/v1/faults", 413);
            return http::build_413_response();
        }
        Err(e) => {
            logger::log_api_error(&format!("Failed to read request body: {e}"));
            return http::build_error_response(StatusCode::BAD_REQUEST, "unreadable body");
        }
    };

    let update: FaultUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            logger::log_api_request(&method, "/v1/faults", 400);
            return http::build_error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid JSON: {e}"),
            );
        }
    };

    let previous = state.faults.set_enabled(update.enabled);
    if previous != update.enabled {
        logger::log_fault_toggled(previous, update.enabled);
    }
    logger::log_api_request(&method, "/v1/faults", 200);
    http::build_json_response(StatusCode::OK, &FaultStatus::from(&state.faults))
}
