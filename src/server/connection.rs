// Connection handling module
// Accepts a single TCP connection and serves it with hyper's HTTP/1 stack

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Which request handler a listener feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// The demo endpoints
    App,
    /// The management API
    Api,
}

/// Holds one slot of the active connection counter.
///
/// Released on drop, so a connection task that panics still frees its slot.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    /// Take a slot, returning the guard and the count before this connection
    fn acquire(counter: &Arc<AtomicUsize>) -> (Self, usize) {
        let prev = counter.fetch_add(1, Ordering::SeqCst);
        (Self(Arc::clone(counter)), prev)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforce the connection limit on the app listener and
/// hand it to a local task.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    service: Service,
) {
    // Increment first, then check the limit
    let (guard, prev_count) = ConnectionGuard::acquire(conn_counter);

    if service == Service::App {
        if let Some(max_conn) = state.config.performance.max_connections {
            if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
                logger::log_warning(&format!(
                    "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
                ));
                drop(stream);
                return;
            }
        }
    }

    if state.access_log_enabled() {
        logger::log_connection_accepted(&peer_addr);
    }

    serve_connection(stream, peer_addr, Arc::clone(state), guard, service);
}

fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    guard: ConnectionGuard,
    service: Service,
) {
    tokio::task::spawn_local(async move {
        let _guard = guard;
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(state.config.performance.keep_alive);

        let svc_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&svc_state);
                async move {
                    match service {
                        Service::App => Ok::<_, Infallible>(handler::handle_request(
                            &req, &state, peer_addr,
                        )),
                        Service::Api => api::handle_api_request(req, state).await,
                    }
                }
            }),
        );

        let timeout_secs = state.config.performance.connection_timeout;
        let outcome = if timeout_secs == 0 {
            Some(conn.await)
        } else {
            tokio::time::timeout(Duration::from_secs(timeout_secs), conn)
                .await
                .ok()
        };

        match outcome {
            Some(Ok(())) => {}
            Some(Err(err)) => logger::log_connection_error(&err),
            None => logger::log_warning(&format!(
                "Connection from {peer_addr} closed after {timeout_secs}s timeout ({service:?})"
            )),
        }
    });
}
