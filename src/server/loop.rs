// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, Service};
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

/// How often `drain_connections` re-checks the counter
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept loop shared by the app and API listeners
///
/// Returns once `shutdown` fires; the listener is closed on return while
/// already-accepted connections keep running in their own tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    service: Service,
    shutdown: Arc<ShutdownSignal>,
) -> Result<(), Box<dyn std::error::Error>> {
    let local_addr = listener.local_addr()?;
    let stop = shutdown.wait();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => {
                logger::log_shutdown(&format!("{service:?} listener on {local_addr} closed"));
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, service);
                    }
                    Err(e) => match service {
                        Service::Api => logger::log_api_error(&format!("Failed to accept connection: {e}")),
                        Service::App => logger::log_error(&format!("Failed to accept connection: {e}")),
                    },
                }
            }
        }
    }
}

/// Wait until no connection is active or `grace` has elapsed.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 || tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{test_config, Config, CrashMode};
    use crate::server::listener::{create_listener, BACKLOG};
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper::{Request, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    struct Running {
        addr: SocketAddr,
        connections: Arc<AtomicUsize>,
        shutdown: Arc<ShutdownSignal>,
        handle: tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error>>>,
    }

    /// Must be called inside a `LocalSet`
    fn spawn_app(config: &Config) -> Running {
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), BACKLOG).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(config));
        let connections = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(ShutdownSignal::new());
        let handle = tokio::task::spawn_local(start_server_loop(
            listener,
            state,
            Arc::clone(&connections),
            Service::App,
            Arc::clone(&shutdown),
        ));
        Running {
            addr,
            connections,
            shutdown,
            handle,
        }
    }

    /// Wait until the server has accepted exactly `count` connections
    async fn wait_for_connections(counter: &AtomicUsize, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while counter.load(Ordering::SeqCst) != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connection count not reached");
    }

    /// One request on a fresh connection
    async fn get(addr: SocketAddr, path: &str) -> Result<(StatusCode, Bytes), hyper::Error> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::task::spawn_local(async move {
            let _ = conn.await;
        });
        let req = Request::get(path)
            .header("host", addr.to_string())
            .body(Empty::<Bytes>::new())
            .unwrap();
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();
        Ok((status, body))
    }

    #[tokio::test]
    async fn test_serves_endpoints_over_tcp() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let app = spawn_app(&test_config(false, CrashMode::Panic));

                let (status, body) = get(app.addr, "/calc?nums=1,2,3&index=1").await.unwrap();
                assert_eq!(status, StatusCode::OK);
                assert_eq!(&body[..], br#"{"value":2}"#);

                let (status, _) = get(app.addr, "/calc?nums=1,2,3&index=10").await.unwrap();
                assert_eq!(status, StatusCode::BAD_REQUEST);

                let (status, body) = get(app.addr, "/healthz").await.unwrap();
                assert_eq!(status, StatusCode::OK);
                assert_eq!(&body[..], br#"{"ok":true}"#);

                app.shutdown.trigger();
                app.handle.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_panicking_crash_drops_only_that_connection() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let app = spawn_app(&test_config(true, CrashMode::Panic));

                // The fault fires: no response, connection torn down
                assert!(get(app.addr, "/crash").await.is_err());

                // The listener survives and the slot is released
                let (status, _) = get(app.addr, "/healthz").await.unwrap();
                assert_eq!(status, StatusCode::OK);
                let left = drain_connections(&app.connections, Duration::from_secs(2)).await;
                assert_eq!(left, 0);

                app.shutdown.trigger();
                app.handle.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_shutdown_before_first_poll() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let app = spawn_app(&test_config(false, CrashMode::Error));
                app.shutdown.trigger();
                tokio::time::timeout(Duration::from_secs(1), app.handle)
                    .await
                    .expect("loop must stop")
                    .unwrap()
                    .unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_connections_past_limit_are_dropped() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut config = test_config(false, CrashMode::Error);
                config.performance.max_connections = Some(1);
                let app = spawn_app(&config);

                let held = TcpStream::connect(app.addr).await.unwrap();
                wait_for_connections(&app.connections, 1).await;

                let mut rejected = TcpStream::connect(app.addr).await.unwrap();
                rejected
                    .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\n\r\n")
                    .await
                    .ok();
                let mut buf = Vec::new();
                let read = tokio::time::timeout(Duration::from_secs(2), rejected.read_to_end(&mut buf))
                    .await
                    .expect("rejected connection must be closed");
                assert!(read.is_err() || buf.is_empty(), "got a response past the limit");
                assert_eq!(app.connections.load(Ordering::SeqCst), 1);

                drop(held);
                let left = drain_connections(&app.connections, Duration::from_secs(2)).await;
                assert_eq!(left, 0);

                app.shutdown.trigger();
                app.handle.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_idle_connection_closed_after_timeout() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut config = test_config(false, CrashMode::Error);
                config.performance.connection_timeout = 1;
                let app = spawn_app(&config);

                let mut stream = TcpStream::connect(app.addr).await.unwrap();
                stream
                    .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\n\r\n")
                    .await
                    .unwrap();

                // Keep-alive leaves the connection open after the response
                // until the timeout closes it
                let mut buf = Vec::new();
                tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
                    .await
                    .expect("idle connection must be closed")
                    .unwrap();
                assert!(buf.starts_with(b"HTTP/1.1 200 OK"));

                let left = drain_connections(&app.connections, Duration::from_secs(2)).await;
                assert_eq!(left, 0);

                app.shutdown.trigger();
                app.handle.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_drain_times_out_with_open_connections() {
        let counter = AtomicUsize::new(2);
        let left = drain_connections(&counter, Duration::from_millis(120)).await;
        assert_eq!(left, 2);
    }
}
