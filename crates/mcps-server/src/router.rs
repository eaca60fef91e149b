use std::any::Any;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, API_KEY_HEADER};
use crate::config::ServerConfig;
use crate::error::internal_error_response;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all record endpoints.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handler::health_handler))
        .route("/health", get(handler::health_handler))
        .route("/create", post(handler::create_handler))
        .route("/modify", post(handler::modify_handler))
        .route("/list", get(handler::list_handler))
        .route("/record/:id", get(handler::record_handler))
        .route("/record/:id/history", get(handler::history_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key))
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(24 * 60 * 60))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%detail, "handler panicked");
    internal_error_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use mcps_crypto::{encrypt, CipherKey};
    use mcps_ledger::InMemoryLedger;
    use mcps_types::TransactionId;

    use crate::config::AppConfig;
    use crate::server::McpsServer;

    fn app() -> (Router, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::default());
        let server =
            McpsServer::with_ledger(AppConfig::in_memory_for_tests(), ledger.clone()).unwrap();
        (server.router(), ledger)
    }

    fn api_key() -> String {
        encrypt("test-api-key", &CipherKey::derive("test-secret")).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(API_KEY_HEADER, api_key())
            .body(Body::empty())
            .unwrap()
    }

    fn post_req(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(API_KEY_HEADER, api_key())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let (router, _) = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn rejections_are_indistinguishable() {
        let (router, _) = app();
        let wrong = encrypt("guess", &CipherKey::derive("test-secret")).unwrap();
        let headers = [None, Some("garbage!!".to_string()), Some(wrong)];

        let mut bodies = Vec::new();
        for header in headers {
            let mut builder = Request::builder().uri("/list");
            if let Some(value) = header {
                builder = builder.header(API_KEY_HEADER, value);
            }
            let (status, body) = send(&router, builder.body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            bodies.push(body);
        }
        assert_eq!(bodies[0], json!({ "state": "error", "message": "Unauthorized" }));
        assert_eq!(bodies[0], bodies[1]);
        assert_eq!(bodies[1], bodies[2]);
    }

    #[tokio::test]
    async fn preflight_bypasses_gate() {
        let (router, _) = app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/create")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-api-key,content-type")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn create_list_modify_flow() {
        let (router, ledger) = app();

        let (status, created) =
            send(&router, post_req("/create", json!({ "title": "draft", "author": "ann", "recordId": "mine" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["state"], true);
        let address = created["response"].as_str().unwrap().to_string();
        assert!(address.starts_with("mem://ledger/mutable/"));

        let (_, listed) = send(&router, get_req("/list")).await;
        assert_eq!(listed["state"], true);
        let records = listed["response"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        let record_id = records[0]["recordId"].as_str().unwrap().to_string();
        assert_ne!(record_id, "mine");

        let (_, modified) = send(
            &router,
            post_req("/modify", json!({ "recordId": record_id, "title": "final", "author": "ann" })),
        )
        .await;
        assert_eq!(modified["state"], true);
        assert_eq!(modified["response"], address);
        assert_eq!(ledger.transaction_count(), 2);

        let (_, listed) = send(&router, get_req("/list")).await;
        let records = listed["response"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "final");

        let (_, record) = send(&router, get_req(&format!("/record/{record_id}"))).await;
        assert_eq!(record["state"], true);
        assert_eq!(record["response"]["title"], "final");

        let (_, history) = send(&router, get_req(&format!("/record/{record_id}/history"))).await;
        let versions = history["response"].as_array().unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0]["is_root"], true);
        assert_eq!(versions[0]["payload"]["title"], "draft");
        assert_eq!(versions[1]["payload"]["title"], "final");
    }

    #[tokio::test]
    async fn unknown_record_is_a_domain_failure() {
        let (router, ledger) = app();

        let (status, body) =
            send(&router, post_req("/modify", json!({ "recordId": "no-such-record", "x": 1 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], false);
        assert!(body["response"].as_str().unwrap().contains("not found"));
        assert_eq!(ledger.transaction_count(), 0);

        let (status, body) = send(&router, get_req("/record/no-such-record")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], false);
    }

    #[tokio::test]
    async fn non_object_payload_is_a_domain_failure() {
        let (router, ledger) = app();
        let (status, body) = send(&router, post_req("/create", json!([1, 2, 3]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], false);
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn list_survives_partial_fetch_failure() {
        let (router, ledger) = app();
        for i in 0..5 {
            let (_, body) = send(&router, post_req("/create", json!({ "n": i }))).await;
            assert_eq!(body["state"], true);
        }
        let (_, listed) = send(&router, get_req("/list")).await;
        let first = listed["response"][0]["recordId"].as_str().unwrap().to_string();
        let (_, record_history) = send(&router, get_req(&format!("/record/{first}/history"))).await;
        let root = record_history["response"][0]["transaction"].as_str().unwrap().to_string();
        ledger.fail_fetches_for(&TransactionId::new(root).unwrap());

        let (status, listed) = send(&router, get_req("/list")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["state"], true);
        assert_eq!(listed["response"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn index_outage_fails_list_as_domain_failure() {
        let (router, ledger) = app();
        let (_, body) = send(&router, post_req("/create", json!({ "a": 1 }))).await;
        assert_eq!(body["state"], true);
        ledger.fail_queries("index unavailable");

        let (status, listed) = send(&router, get_req("/list")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["state"], false);
        assert!(listed["response"].as_str().unwrap().contains("index unavailable"));
    }

    #[tokio::test]
    async fn ledger_outage_is_a_domain_failure() {
        let (router, ledger) = app();
        ledger.fail_uploads("uploader unavailable");
        let (status, body) = send(&router, post_req("/create", json!({ "a": 1 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], false);
        assert!(body["response"].as_str().unwrap().contains("uploader unavailable"));
    }

    #[tokio::test]
    async fn disabled_auth_lets_everything_through() {
        let mut config = AppConfig::in_memory_for_tests();
        config.auth.enabled = false;
        let server = McpsServer::with_ledger(config, Arc::new(InMemoryLedger::default())).unwrap();
        let request = Request::builder().uri("/list").body(Body::empty()).unwrap();
        let (status, body) = send(&server.router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "state": true, "response": [] }));
    }

    #[tokio::test]
    async fn panics_become_generic_500s() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Something went wrong!" }));
    }
}
