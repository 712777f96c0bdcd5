//! HTTP endpoint of the agent bridge
//!
//! `POST /api/CreateAgentAndRun` takes `{"Prompt": "..."}` and answers with
//! the thread transcript. Requests are authenticated with the function key
//! (`x-functions-key` header or `code` query parameter) when one is set.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::{AgentBridge, ThreadMessage};
use crate::error::{Error, Result};

/// Header carrying the function key
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

// ---- App State ----

#[derive(Clone)]
pub struct AppState {
    /// `None` when the agent or queue service is not configured
    pub bridge: Option<Arc<AgentBridge>>,
    pub function_key: Option<SecretString>,
    /// Fired on shutdown; interrupts runs in progress
    pub shutdown: CancellationToken,
}

// ---- Error Handling ----

/// An error rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: Error,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match error {
            Error::InvalidInput(_) | Error::Decode(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamRun { .. }
            | Error::AgentService(_)
            | Error::Unauthorized(_)
            | Error::NotFound(_)
            | Error::RateLimit(_)
            | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError { status, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, "Request failed: {}", self.error);
        }
        let body = Json(serde_json::json!({ "error": self.error.to_string() }));
        (self.status, body).into_response()
    }
}

// ---- Handlers ----

#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    #[serde(rename = "Prompt")]
    prompt: Option<String>,
}

async fn health() -> &'static str {
    "OK"
}

async fn create_agent_and_run(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<Vec<ThreadMessage>>, ApiError> {
    let request: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidInput(format!("Request body is not valid JSON: {}", e)))?
    };

    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("Prompt is required".to_string()))?;

    let bridge = state.bridge.as_ref().ok_or_else(|| {
        Error::Config("agent service and queue service URI must be configured".to_string())
    })?;

    info!(prompt_len = prompt.len(), "Agent run requested");
    let messages = bridge.run(&prompt, &state.shutdown).await?;
    Ok(Json(messages))
}

async fn require_function_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(ref expected) = state.function_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            let query = request.uri().query()?;
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(k, _)| k == "code")
                .map(|(_, v)| v.into_owned())
        });

    match provided {
        Some(key) if key == expected.expose_secret() => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "missing or invalid function key" })),
        )
            .into_response(),
    }
}

// ---- Router ----

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/CreateAgentAndRun", post(create_agent_and_run))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_function_key));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serve until the state's shutdown token fires
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    if state.function_key.is_none() {
        warn!("No function key configured, the run endpoint is anonymous");
    }
    if state.bridge.is_none() {
        warn!("Agent bridge not configured, the run endpoint will answer 500");
    }

    let shutdown = state.shutdown.clone();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{BridgeSettings, FakeService, RunStatus};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(service: Option<Arc<FakeService>>, key: Option<&str>) -> AppState {
        let bridge = service.map(|service| {
            let settings = BridgeSettings {
                model: "gpt-4o-mini".to_string(),
                agent_name: "agent".to_string(),
                instructions: "help".to_string(),
                poll_interval: Duration::from_millis(1),
                run_deadline: Duration::from_secs(5),
            };
            Arc::new(AgentBridge::new(service, Vec::new(), settings))
        });
        AppState {
            bridge,
            function_key: key.map(SecretString::from),
            shutdown: CancellationToken::new(),
        }
    }

    fn run_request(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state(None, Some("k")));
        let response = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_rejected_before_agent_creation() {
        let service = Arc::new(FakeService::new(&[RunStatus::Completed]));
        let app = build_router(state(Some(service.clone()), None));

        let response = app.oneshot(run_request("/api/CreateAgentAndRun", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Prompt is required"));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let app = build_router(state(None, None));
        let response = app.oneshot(run_request("/api/CreateAgentAndRun", "{nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_function_key_required() {
        let service = Arc::new(FakeService::new(&[RunStatus::Completed]));
        let app = build_router(state(Some(service.clone()), Some("secret")));
        let body = r#"{"Prompt":"What projects do we have?"}"#;

        let response = app
            .clone()
            .oneshot(run_request("/api/CreateAgentAndRun", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(run_request("/api/CreateAgentAndRun?code=wrong", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(run_request("/api/CreateAgentAndRun?code=secret", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut request = run_request("/api/CreateAgentAndRun", body);
        request
            .headers_mut()
            .insert(FUNCTION_KEY_HEADER, "secret".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_transcript_is_returned() {
        let service = Arc::new(FakeService::new(&[RunStatus::Completed]));
        let app = build_router(state(Some(service), None));

        let response = app
            .oneshot(run_request("/api/CreateAgentAndRun", r#"{"Prompt":"Status of Gizmo Galaxy?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["role"], "assistant");
        assert_eq!(body[0]["content"][0]["text"]["value"], "Gizmo Galaxy is Active");
    }

    #[tokio::test]
    async fn test_failed_run_is_bad_gateway() {
        let service = Arc::new(FakeService::new(&[RunStatus::Failed]));
        let app = build_router(state(Some(service), None));

        let response = app
            .oneshot(run_request("/api/CreateAgentAndRun", r#"{"Prompt":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unconfigured_bridge_is_server_error() {
        let app = build_router(state(None, None));
        let response = app
            .oneshot(run_request("/api/CreateAgentAndRun", r#"{"Prompt":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::from(Error::Timeout("t".into())).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::from(Error::Cancelled("c".into())).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::from(Error::InvalidInput("i".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(Error::Internal("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
