//! Liveness, readiness and fault-injection endpoints

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::{CrashMode, FaultState};
use crate::http;
use crate::logger;

#[derive(Serialize)]
struct Alive {
    ok: bool,
}

#[derive(Serialize)]
struct Readiness {
    ready: bool,
}

/// `/healthz`: always 200
pub fn healthz() -> Response<Full<Bytes>> {
    http::build_json_response(StatusCode::OK, &Alive { ok: true })
}

/// `/ready`: 503 while faults are enabled, simulating a failed dependency
pub fn ready(faults: &FaultState) -> Response<Full<Bytes>> {
    if faults.is_enabled() {
        return http::build_json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &Readiness { ready: false },
        );
    }
    http::build_json_response(StatusCode::OK, &Readiness { ready: true })
}

/// `/crash`: breaks the service on purpose while faults are enabled.
///
/// What "breaks" means depends on [`CrashMode`]:
/// - `Panic` unwinds the connection task; the client gets no response and the
///   listener keeps accepting.
/// - `Abort` kills the process.
/// - `Error` answers 500.
pub fn crash(faults: &FaultState) -> Response<Full<Bytes>> {
    if !faults.is_enabled() {
        return http::build_json_response(StatusCode::OK, &Alive { ok: true });
    }

    let mode = faults.crash_mode();
    logger::log_fault_injected("/crash", mode);
    match mode {
        CrashMode::Panic => panic!("injected fault: /crash requested while faults are enabled"),
        CrashMode::Abort => std::process::abort(),
        CrashMode::Error => {
            http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "injected fault")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_healthz_constant() {
        let resp = healthz();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_ready_follows_toggle() {
        let faults = FaultState::new(false, CrashMode::Panic);
        let resp = ready(&faults);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, r#"{"ready":true}"#);

        faults.set_enabled(true);
        let resp = ready(&faults);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(resp).await, r#"{"ready":false}"#);
    }

    #[tokio::test]
    async fn test_crash_without_toggle_is_ok() {
        let faults = FaultState::new(false, CrashMode::Panic);
        let resp = crash(&faults);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, r#"{"ok":true}"#);
    }

    #[test]
    #[should_panic(expected = "injected fault")]
    fn test_crash_panics_with_toggle() {
        let faults = FaultState::new(true, CrashMode::Panic);
        let _ = crash(&faults);
    }

    #[tokio::test]
    async fn test_crash_error_mode_answers_500() {
        let faults = FaultState::new(true, CrashMode::Error);
        let resp = crash(&faults);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(resp).await, r#"{"error":"injected fault"}"#);
    }
}
