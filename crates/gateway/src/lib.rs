//! HTTP transport adapters for RagBridge.
//!
//! Exposes the chat surface (`POST /api/chat`), the bot-messages surface
//! (`POST /api/messages`), plus health and info routes. Handlers only map
//! requests to turns and results to status codes; all behavior lives in
//! `ragbridge-pipeline`.
//!
//! Built on Axum.

pub mod chat;
pub mod messages;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use ragbridge_config::AppConfig;
use ragbridge_core::error::TransportError;
use ragbridge_core::turn::TurnStatus;
use ragbridge_pipeline::{ActivityBot, TurnPipeline};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<TurnPipeline>,
    pub bot: ActivityBot,
    pub max_body_bytes: usize,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(pipeline: Arc<TurnPipeline>) -> Self {
        Self {
            bot: ActivityBot::new(pipeline.clone()),
            pipeline,
            max_body_bytes: ragbridge_config::GatewayConfig::default().max_body_bytes,
        }
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

/// Wire the RAG client, history store and token validator described by
/// `config` into a ready-to-serve state.
pub fn build_state(config: &AppConfig) -> ragbridge_core::Result<SharedState> {
    let rag = Arc::new(ragbridge_providers::OpenAiCompatRagClient::from_config(&config.rag)?);
    let history = ragbridge_history::build_from_config(config);
    let validator = Arc::new(ragbridge_security::JwksTokenValidator::from_config(&config.auth)?);

    info!(
        backend = %config.rag.api_url,
        model = %config.rag.model,
        history = history.name(),
        "Turn pipeline configured"
    );

    let pipeline = TurnPipeline::new(rag, history, validator).with_bot_config(config.bot.clone());
    Ok(Arc::new(
        GatewayState::new(Arc::new(pipeline)).with_max_body_bytes(config.gateway.max_body_bytes),
    ))
}

/// Build the Axum router with all gateway routes.
///
/// Non-POST requests to the message routes get 405 from method routing.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/messages", post(messages::messages_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config)?;
    let app = build_router(state);

    info!(addr = %addr, bot = %config.bot.name, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Errors ---

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A status code plus a message that is safe to return to the caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Map a failed turn onto its HTTP status.
    pub fn from_turn(status: TurnStatus, reply_text: impl Into<String>) -> Self {
        Self::new(status_for(status), reply_text)
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        let status = match &e {
            TransportError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            TransportError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        };
        warn!(error = %e, "Rejecting request");
        Self::new(status, e.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// HTTP status for each turn outcome.
pub fn status_for(status: TurnStatus) -> StatusCode {
    match status {
        TurnStatus::Ok => StatusCode::OK,
        TurnStatus::BadRequest => StatusCode::BAD_REQUEST,
        TurnStatus::Unauthorized => StatusCode::UNAUTHORIZED,
        TurnStatus::UpstreamError => StatusCode::BAD_GATEWAY,
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    bot: String,
    version: &'static str,
    conversations: Option<usize>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let conversations = match state.pipeline.history().conversation_count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "Could not count conversations");
            None
        }
    };
    Json(HealthResponse {
        status: "healthy",
        bot: state.pipeline.bot_config().name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        conversations,
    })
}

#[derive(Serialize)]
struct InfoResponse {
    service: &'static str,
    version: &'static str,
    framework: &'static str,
    endpoints: Vec<&'static str>,
}

async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "ragbridge",
        version: env!("CARGO_PKG_VERSION"),
        framework: "axum",
        endpoints: vec![
            "POST /api/chat",
            "POST /api/messages",
            "GET /health",
        ],
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ragbridge_core::auth::TokenValidator;
    use ragbridge_core::error::RagError;
    use ragbridge_core::message::ChatMessage;
    use ragbridge_core::rag::{RagClient, RagResponse};
    use ragbridge_history::InMemoryHistoryStore;
    use tower::ServiceExt;

    /// Echoes the last message, or fails with a noisy internal error.
    pub struct EchoRag {
        pub fail: bool,
    }

    #[async_trait]
    impl RagClient for EchoRag {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<RagResponse, RagError> {
            if self.fail {
                return Err(RagError::ApiError {
                    status_code: 500,
                    message: "secret-internal-trace".into(),
                });
            }
            let last = messages.last().map(|m| m.content()).unwrap_or_default();
            Ok(RagResponse::from_text("echo-model", format!("echo: {last}")))
        }
    }

    /// Accepts only `Bearer good`; an absent header passes when `local` is set.
    pub struct FixedTokenValidator {
        pub local: bool,
    }

    #[async_trait]
    impl TokenValidator for FixedTokenValidator {
        async fn validate(&self, auth_header: Option<&str>) -> bool {
            match auth_header {
                None => self.local,
                Some(h) => h == "Bearer good",
            }
        }
    }

    pub fn state(fail: bool, local: bool) -> SharedState {
        let pipeline = TurnPipeline::new(
            Arc::new(EchoRag { fail }),
            Arc::new(InMemoryHistoryStore::new()),
            Arc::new(FixedTokenValidator { local }),
        );
        Arc::new(GatewayState::new(Arc::new(pipeline)))
    }

    pub async fn send(state: SharedState, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = build_router(state).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub fn json(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{json, send, state};
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ragbridge_core::message::{ChatMessage, ConversationId};

    #[tokio::test]
    async fn health_reports_bot_and_conversation_count() {
        let st = state(false, true);
        st.pipeline
            .history()
            .append(&ConversationId::new("a"), ChatMessage::user("hi"))
            .await
            .unwrap();

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(st, req).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["bot"], "RAG Bot");
        assert_eq!(body["conversations"], 1);
    }

    #[tokio::test]
    async fn info_lists_endpoints() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(state(false, true), req).await;
        assert_eq!(status, StatusCode::OK);
        let endpoints = json(&body)["endpoints"].clone();
        assert!(endpoints.as_array().unwrap().iter().any(|e| e == "POST /api/messages"));
    }

    #[tokio::test]
    async fn get_on_message_routes_is_method_not_allowed() {
        for uri in ["/api/chat", "/api/messages"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, _) = send(state(false, true), req).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        }
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let st = Arc::new(
            GatewayState::new(state(false, true).pipeline.clone()).with_max_body_bytes(64),
        );
        let big = format!(r#"{{"question": "{}"}}"#, "x".repeat(1024));
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(big))
            .unwrap();
        let (status, _) = send(st, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn turn_statuses_map_to_http() {
        assert_eq!(status_for(TurnStatus::Ok), StatusCode::OK);
        assert_eq!(status_for(TurnStatus::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(TurnStatus::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(TurnStatus::UpstreamError), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_errors_map_to_http() {
        let e: ApiError = TransportError::UnsupportedMediaType("text/plain".into()).into();
        assert_eq!(e.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let e: ApiError = TransportError::MalformedBody("EOF while parsing at line 1 column 9".into()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "Malformed request body");
    }
}
