// API module entry
// Management API for inspecting and flipping the fault toggle at runtime

mod handlers;
mod types;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http;
use crate::logger;

/// API route handler
///
/// Dispatches to handler functions based on request path and method
pub async fn handle_api_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/v1/faults") => handlers::handle_faults_get(&state),
        (&Method::PUT | &Method::POST, "/v1/faults") => {
            handlers::handle_faults_update(req, &state).await
        }
        _ => {
            logger::log_api_request(method.as_str(), &path, 404);
            http::build_404_response()
        }
    };
    Ok(http::with_server_header(response))
}
