//! Router assembly, CORS, port scan and asset checks.

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use dashpad_core::DashError;

use crate::routes;
use crate::state::AppState;

/// Files the dashboard cannot run without.
pub const REQUIRED_ASSETS: &[&str] = &["index.html", "styles.css", "script.js"];

/// How many ports to try past the starting one.
const PORT_SCAN_RANGE: u16 = 100;

/// Fail fast if any required dashboard file is missing from `dir`.
pub fn check_assets(dir: &Path) -> Result<(), DashError> {
    let missing: Vec<&str> = REQUIRED_ASSETS
        .iter()
        .copied()
        .filter(|name| !dir.join(name).is_file())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashError::MissingAssets(missing.join(", ")))
    }
}

/// Bind the first free localhost port in `[start, start + PORT_SCAN_RANGE)`.
pub async fn find_free_port(start: u16) -> Result<(TcpListener, u16), DashError> {
    let end = start.saturating_add(PORT_SCAN_RANGE);

    for port in start..end {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            return Ok((listener, port));
        }
    }

    Err(DashError::PortExhausted(start, end))
}

/// Static dashboard plus JSON API, with permissive CORS on every response.
pub fn build_router(dir: &Path, state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::events::router())
        .fallback(routes::api_not_found)
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(dir))
        .layer(middleware::from_fn(permissive_cors))
}

/// The dashboard may be opened from file:// or another local port, so every
/// response carries the three permissive CORS headers and any preflight gets
/// a bare 200.
async fn permissive_cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        Response::new(Body::empty())
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn dashboard_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html>dashboard</html>").unwrap();
        fs::write(dir.path().join("styles.css"), "body {}").unwrap();
        fs::write(dir.path().join("script.js"), "// js").unwrap();
        dir
    }

    fn test_router(dir: &TempDir) -> Router {
        let state = AppState::new(
            "https://contoso.sharepoint.com/sites/Team".to_string(),
            "TeamCalendar".to_string(),
        );
        build_router(dir.path(), state)
    }

    fn assert_cors_headers(response: &axum::response::Response) {
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(headers.get("access-control-allow-headers").unwrap(), "*");
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn missing_assets_fail_the_startup_check() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let err = check_assets(dir.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("styles.css"));
        assert!(message.contains("script.js"));
        assert!(!message.contains("index.html"));
    }

    #[test]
    fn complete_assets_pass_the_startup_check() {
        let dir = dashboard_dir();
        assert!(check_assets(dir.path()).is_ok());
    }

    #[tokio::test]
    async fn port_scan_skips_an_occupied_port() {
        let (busy, busy_port) = find_free_port(8000).await.unwrap();
        let (_next, next_port) = find_free_port(busy_port).await.unwrap();

        assert!(next_port > busy_port);
        drop(busy);
    }

    #[tokio::test]
    async fn static_files_are_served_with_cors_headers() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .uri("/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<html>dashboard</html>");
    }

    #[tokio::test]
    async fn missing_static_file_is_404_with_cors_headers() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .uri("/nope.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_cors_headers(&response);
    }

    #[tokio::test]
    async fn options_preflight_is_a_bare_200() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/auth/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn events_without_auth_is_401_not_authenticated() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not authenticated");
    }

    #[tokio::test]
    async fn status_before_start_is_the_zero_state() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["message"], Value::Null);
        assert_eq!(body["error"], Value::Null);
    }

    #[tokio::test]
    async fn logout_then_status_yields_the_zero_state() {
        let dir = dashboard_dir();
        let router = test_router(&dir);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["authenticated"], false);
    }

    #[tokio::test]
    async fn unmapped_api_path_is_a_json_404() {
        let dir = dashboard_dir();
        let response = test_router(&dir)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Endpoint not found");
    }
}
