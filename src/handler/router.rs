//! Request routing dispatch module
//!
//! Entry point for app requests: method validation, path dispatch, HEAD
//! handling and access logging.

use crate::config::AppState;
use crate::handler::{calc, probes};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::net::SocketAddr;
use std::time::Instant;

/// Main entry point for app request handling
///
/// The request body is never read, so any body type is accepted.
pub fn handle_request<B>(
    req: &Request<B>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let method = req.method();

    let response = match check_http_method(method) {
        Some(resp) => resp,
        None => route_request(req.uri().path(), req.uri().query(), state),
    };

    let body_len = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    let response = if *method == Method::HEAD {
        http::strip_body(response, body_len)
    } else {
        response
    };
    let response = http::with_server_header(response);

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = if *method == Method::HEAD { 0 } else { body_len };
        entry.referer = header_string(req, REFERER);
        entry.user_agent = header_string(req, USER_AGENT);
        entry.elapsed = started.elapsed();
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

/// Only GET and HEAD reach the endpoints
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn route_request(path: &str, query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    match path {
        "/healthz" => probes::healthz(),
        "/ready" => probes::ready(&state.faults),
        "/calc" => calc::handle_calc(query),
        "/crash" => probes::crash(&state.faults),
        _ => http::build_404_response(),
    }
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

fn header_string<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
