//! `POST /api/messages`: the bot-framework surface.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use ragbridge_core::activity::Activity;
use ragbridge_core::error::TransportError;
use ragbridge_pipeline::ActivityOutcome;
use tracing::debug;

use crate::chat::auth_header;
use crate::{ApiError, SharedState};

fn require_json(headers: &HeaderMap) -> Result<(), TransportError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type.to_ascii_lowercase().contains("application/json") {
        Ok(())
    } else {
        Err(TransportError::UnsupportedMediaType(content_type.to_string()))
    }
}

fn parse_activity(body: &Bytes) -> Result<Activity, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(TransportError::MalformedBody("empty body".into()));
    }
    serde_json::from_slice(body).map_err(|e| TransportError::MalformedBody(e.to_string()))
}

pub async fn messages_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_json(&headers)?;
    let activity = parse_activity(&body)?;
    debug!(activity_type = ?activity.activity_type, sender = ?activity.sender_id(), "Activity received");

    let auth = auth_header(&headers);
    match state.bot.handle(&activity, auth.as_deref()).await {
        ActivityOutcome::Replied(reply) => Ok((StatusCode::CREATED, Json(reply)).into_response()),
        ActivityOutcome::Ignored => Ok(StatusCode::OK.into_response()),
        ActivityOutcome::Failed(reply) => Ok((StatusCode::BAD_GATEWAY, Json(reply)).into_response()),
        ActivityOutcome::Rejected(status) => Err(ApiError::from_turn(status, status.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{json, send, state};
    use axum::body::Body;
    use axum::http::Request;
    use ragbridge_core::message::ConversationId;

    fn post(content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const MESSAGE: &str = r#"{"type": "message", "id": "m-1", "text": "hello",
        "from": {"id": "user-42", "name": "Ada"}, "recipient": {"id": "bot-1"},
        "conversation": {"id": "conv-9"}}"#;

    #[tokio::test]
    async fn message_gets_created_reply_activity() {
        let st = state(false, true);
        let (status, body) = send(st.clone(), post("application/json; charset=utf-8", MESSAGE)).await;
        assert_eq!(status, StatusCode::CREATED);

        let reply = json(&body);
        assert_eq!(reply["type"], "message");
        assert_eq!(reply["text"], "echo: hello");
        assert_eq!(reply["replyToId"], "m-1");
        assert_eq!(reply["recipient"]["id"], "user-42");
        assert_eq!(reply["conversation"]["id"], "conv-9");

        let history = st
            .pipeline
            .history()
            .get(&ConversationId::new("user-42"))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn wrong_content_type_is_unsupported() {
        let (status, resp) = send(state(false, true), post("text/plain", MESSAGE)).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json(&resp)["error"], "Unsupported media type");
    }

    #[tokio::test]
    async fn empty_or_invalid_body_is_bad_request() {
        for body in ["", "   ", "{\"type\": "] {
            let (status, resp) = send(state(false, true), post("application/json", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            assert_eq!(json(&resp), serde_json::json!({"error": "Malformed request body"}));
        }
    }

    #[tokio::test]
    async fn missing_header_without_local_tests_is_unauthorized() {
        let st = state(false, false);
        let (status, _) = send(st.clone(), post("application/json", MESSAGE)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(st.pipeline.history().conversation_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn member_join_gets_welcome() {
        let body = r#"{"type": "conversationUpdate", "recipient": {"id": "bot-1"},
            "membersAdded": [{"id": "bot-1"}, {"id": "user-7"}]}"#;
        let (status, resp) = send(state(false, true), post("application/json", body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(json(&resp)["text"].as_str().unwrap().starts_with("Hello and welcome"));
    }

    #[tokio::test]
    async fn other_activity_is_acknowledged_with_empty_body() {
        let (status, body) =
            send(state(false, true), post("application/json", r#"{"type": "typing"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_sends_apology_activity() {
        let (status, body) = send(state(true, true), post("application/json", MESSAGE)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Sorry, something went wrong"));
        assert!(!text.contains("secret-internal-trace"));
    }
}
