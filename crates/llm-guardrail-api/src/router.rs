//! Route configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::handlers;
use crate::middleware::bearer_auth_middleware;
use crate::state::AppState;

/// Create the application router with default server limits.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &ServerConfig::default())
}

/// Create the application router
///
/// ## Routes
/// - GET /health, /health/live, /health/ready, /version, /metrics
/// - GET /v1/validators - Validator catalog per direction
///
/// Key management (bearer token; pass-through in single-tenant mode):
/// - POST /v1/keys - Issue an API key
/// - GET /v1/keys - List the caller's keys
/// - POST /v1/keys/delete - Delete one of the caller's keys
///
/// Sessions (`X-API-Key`):
/// - POST /v1/sessions - Start a session
/// - POST /v1/sessions/:id/validate - Validate text and append to the log
/// - GET /v1/sessions/:id/records - Read the session log
pub fn create_router_with_config(state: AppState, server: &ServerConfig) -> Router {
    let key_routes = Router::new()
        .route(
            "/v1/keys",
            post(handlers::register_key).get(handlers::list_keys),
        )
        .route("/v1/keys/delete", post(handlers::delete_key))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    let session_routes = Router::new()
        .route("/v1/sessions", post(handlers::start_session))
        .route("/v1/sessions/:id/validate", post(handlers::validate_text))
        .route("/v1/sessions/:id/records", get(handlers::session_records));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::live))
        .route("/health/ready", get(handlers::ready))
        .route("/version", get(handlers::version))
        .route("/metrics", get(handlers::metrics))
        .route("/v1/validators", get(handlers::list_validators))
        .merge(key_routes)
        .merge(session_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    server.request_timeout_secs,
                ))),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use http_body_util::BodyExt;
    use jsonwebtoken::jwk::JwkSet;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use llm_guardrail_core::auth::{BearerVerifier, CachedKeySet, KeySetSource};
    use llm_guardrail_core::{GuardrailEngine, GuardrailError, QuotaGuard};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // For `oneshot`

    const SECRET: &[u8] = b"router-test-signing-secret-0123";

    fn app() -> Router {
        create_router(AppState::new(GuardrailEngine::builder().build()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_key(mut request: Request<Body>, key: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert("x-api-key", key.parse().unwrap());
        request
    }

    async fn register(app: &Router, input: &[&str]) -> String {
        let (status, body) = send(
            app,
            post_json(
                "/v1/keys",
                json!({ "input_validators": input, "model_id": "gpt-4o" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["api_key"].as_str().unwrap().to_string()
    }

    async fn start_session(app: &Router, key: &str) -> String {
        let (status, body) = send(app, with_key(post_json("/v1/sessions", json!({})), key)).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_routes() {
        let app = app();
        for uri in ["/health", "/health/live", "/health/ready", "/version"] {
            let (status, _) = send(&app, get_req(uri)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_exporter() {
        let (status, body) = send(&app(), get_req("/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "METRICS_DISABLED");
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, _) = send(&app(), get_req("/notfound")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validator_catalog() {
        let (status, body) = send(&app(), get_req("/v1/validators")).await;
        assert_eq!(status, StatusCode::OK);
        let input: Vec<&str> = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert!(input.contains(&"detect_pii"));
        assert!(!input.contains(&"valid_json"));
    }

    #[tokio::test]
    async fn test_validate_flow() {
        let app = app();
        let key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &key).await;

        let (status, report) = send(
            &app,
            with_key(
                post_json(
                    &format!("/v1/sessions/{session}/validate"),
                    json!({ "direction": "input", "text": "My SSN is 123-45-6789" }),
                ),
                &key,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["validation_passed"], false);
        assert_eq!(report["validation_summaries"][0]["validator_name"], "detect_pii");
        assert_eq!(report["validation_summaries"][0]["validator_status"], "fail-noop");

        let (status, body) = send(
            &app,
            with_key(get_req(&format!("/v1/sessions/{session}/records")), &key),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let (status, body) = send(&app(), post_json("/v1/sessions", json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "CREDENTIAL_MISSING");
    }

    #[tokio::test]
    async fn test_foreign_key_is_forbidden() {
        let app = app();
        let owner_key = register(&app, &["detect_pii"]).await;
        let other_key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &owner_key).await;

        let (status, body) = send(
            &app,
            with_key(
                post_json(
                    &format!("/v1/sessions/{session}/validate"),
                    json!({ "direction": "input", "text": "hello" }),
                ),
                &other_key,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (_, body) = send(
            &app,
            with_key(get_req(&format!("/v1/sessions/{session}/records")), &owner_key),
        )
        .await;
        assert!(body["records"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_validator_rejected() {
        let (status, body) = send(
            &app(),
            post_json(
                "/v1/keys",
                json!({ "input_validators": ["bogus"], "model_id": "gpt-4o" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_VALIDATOR");
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let app = app();
        let key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &key).await;

        let (status, body) = send(
            &app,
            with_key(
                post_json(
                    &format!("/v1/sessions/{session}/validate"),
                    json!({ "direction": "input", "text": "" }),
                ),
                &key,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = ServerConfig {
            body_limit_bytes: 64,
            ..ServerConfig::default()
        };
        let app = create_router_with_config(
            AppState::new(GuardrailEngine::builder().build()),
            &server,
        );
        let body = json!({ "model_id": "x".repeat(256) }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/v1/keys")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_malformed_json_renders_error_body() {
        let app = app();
        let key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &key).await;

        let (status, body) = send(
            &app,
            with_key(
                post_json(
                    &format!("/v1/sessions/{session}/validate"),
                    json!({ "text": "missing direction" }),
                ),
                &key,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_JSON");

        let (status, body) = send(
            &app,
            with_key(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{session}/validate"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
                &key,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn test_validate_authenticates_before_body_checks() {
        let app = app();
        let key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &key).await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/v1/sessions/{session}/validate"),
                json!({ "direction": "input", "text": "" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "CREDENTIAL_MISSING");

        let (status, body) = send(
            &app,
            with_key(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{session}/validate"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
                "grd_not-a-real-key",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "CREDENTIAL_INVALID");
    }

    #[tokio::test]
    async fn test_quota_returns_429() {
        let engine = GuardrailEngine::builder()
            .with_quota(QuotaGuard::new(1, std::time::Duration::from_secs(3600)))
            .build();
        let app = create_router(AppState::new(engine));
        let key = register(&app, &["detect_pii"]).await;
        let session = start_session(&app, &key).await;
        let request = || {
            with_key(
                post_json(
                    &format!("/v1/sessions/{session}/validate"),
                    json!({ "direction": "input", "text": "hello" }),
                ),
                &key,
            )
        };

        let (status, _) = send(&app, request()).await;
        assert_eq!(status, StatusCode::OK);

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_list_and_delete_keys() {
        let app = app();
        register(&app, &["detect_pii"]).await;

        let (status, body) = send(&app, get_req("/v1/keys")).await;
        assert_eq!(status, StatusCode::OK);
        let keys = body["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        let key_id = keys[0]["key_id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, post_json("/v1/keys/delete", json!({ "key_id": key_id }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, post_json("/v1/keys/delete", json!({ "key_id": key_id }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    struct StaticKeys;

    #[async_trait]
    impl KeySetSource for StaticKeys {
        async fn fetch(&self) -> Result<JwkSet, GuardrailError> {
            Ok(serde_json::from_value(json!({
                "keys": [{
                    "kty": "oct",
                    "kid": "k1",
                    "alg": "HS256",
                    "k": URL_SAFE_NO_PAD.encode(SECRET),
                }]
            }))
            .unwrap())
        }
    }

    fn bearer_app() -> Router {
        let keys = CachedKeySet::new(
            Arc::new(StaticKeys),
            std::time::Duration::from_secs(300),
            std::time::Duration::from_secs(5),
        );
        let state = AppState::new(GuardrailEngine::builder().build())
            .with_bearer(BearerVerifier::new(keys));
        create_router(state)
    }

    fn bearer_token(sub: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let exp = chrono::Utc::now().timestamp() + 600;
        encode(
            &header,
            &json!({ "sub": sub, "exp": exp }),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        request
    }

    #[tokio::test]
    async fn test_bearer_required_when_configured() {
        let (status, body) = send(&bearer_app(), get_req("/v1/keys")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn test_bearer_scheme_is_case_insensitive() {
        let app = bearer_app();
        let token = bearer_token("alice");
        for scheme in ["bearer", "BEARER"] {
            let mut request = get_req("/v1/keys");
            request.headers_mut().insert(
                header::AUTHORIZATION,
                format!("{scheme} {token}").parse().unwrap(),
            );
            let (status, _) = send(&app, request).await;
            assert_eq!(status, StatusCode::OK, "{scheme}");
        }
    }

    #[tokio::test]
    async fn test_keys_are_scoped_to_bearer_subject() {
        let app = bearer_app();
        let alice = bearer_token("alice");
        let bob = bearer_token("bob");

        let (status, _) = send(
            &app,
            with_bearer(
                post_json("/v1/keys", json!({ "model_id": "gpt-4o" })),
                &alice,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, with_bearer(get_req("/v1/keys"), &alice)).await;
        assert_eq!(body["keys"].as_array().unwrap().len(), 1);
        let key_id = body["keys"][0]["key_id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, with_bearer(get_req("/v1/keys"), &bob)).await;
        assert!(body["keys"].as_array().unwrap().is_empty());

        let (status, _) = send(
            &app,
            with_bearer(
                post_json("/v1/keys/delete", json!({ "key_id": key_id })),
                &bob,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
