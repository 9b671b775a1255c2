//! Webhook edge receiver
//!
//! One HTTP endpoint receives webhook calls from every messaging
//! platform. The body is classified to its provider, republished on that
//! provider's broadcast channel, and either acknowledged immediately or
//! answered with a worker-produced body within a bounded wait.

use crate::broker::{Broadcast, Broker};
use crate::error::{BridgeError, Result};
use crate::relay::{RETURN_CHANNEL, RETURN_EVENT};
use crate::types::Provider;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;

/// Ceiling on the synchronous reply wait
///
/// The sync platform gives its skill servers five seconds; waiting any
/// longer answers a connection that is already gone.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Classify a webhook body to its originating provider
///
/// Markers are checked in fixed priority order; a body carrying both
/// resolves to the first match. Unclassifiable bodies are an error and
/// the request is rejected.
pub fn classify(body: &Value) -> Result<Provider> {
    if body.get("destination").is_some() {
        return Ok(Provider::Line);
    }
    if body.get("bot").is_some() {
        return Ok(Provider::Kakao);
    }
    Err(BridgeError::Classification(
        "No provider marker in webhook body".to_string(),
    ))
}

/// Strip a sync-platform body to the fields the worker consumes
///
/// The skill request carries routing markers and context blocks the
/// worker has no use for; only `action`, `intent`, and `userRequest`
/// cross the broker.
fn sync_payload(body: &Value) -> Value {
    let mut payload = serde_json::Map::new();
    for key in ["action", "intent", "userRequest"] {
        if let Some(value) = body.get(key) {
            payload.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(payload)
}

/// The edge receiver service
pub struct WebhookReceiver {
    broker: Arc<dyn Broker>,
    reply_timeout: Duration,
}

impl WebhookReceiver {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Override the synchronous reply wait ceiling
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Handle one webhook body, returning the HTTP response body
    pub async fn handle(&self, body: Value) -> Result<Value> {
        let provider = classify(&body)?;
        tracing::info!(provider = %provider, "Webhook received");

        if provider.requires_sync_reply() {
            self.handle_sync(provider, body).await
        } else {
            self.handle_async(provider, body).await
        }
    }

    /// Republish and acknowledge immediately
    async fn handle_async(&self, provider: Provider, body: Value) -> Result<Value> {
        let events = body.get("events").cloned().unwrap_or_else(|| json!([]));
        let message = Broadcast::new(provider.webhook_event(), json!({ "events": events }));

        self.broker.publish(provider.channel(), &message).await?;
        Ok(json!({}))
    }

    /// Republish with a correlation id and wait for the worker's reply
    ///
    /// The return subscription is established before publishing, so the
    /// reply cannot slip past. Replies carrying a different correlation
    /// id belong to concurrent requests and are skipped. On timeout the
    /// caller gets an empty body, never an error.
    async fn handle_sync(&self, provider: Provider, body: Value) -> Result<Value> {
        let correlation_id = uuid::Uuid::new_v4().to_string();

        let mut replies = self.broker.subscribe(RETURN_CHANNEL).await?;

        let message = Broadcast::new(provider.webhook_event(), sync_payload(&body))
            .with_correlation(correlation_id.clone());
        self.broker.publish(provider.channel(), &message).await?;

        let deadline = Instant::now() + self.reply_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, replies.next()).await {
                Ok(Ok(Some(reply))) => {
                    if reply.event != RETURN_EVENT {
                        continue;
                    }
                    if reply.correlation_id.as_deref() != Some(correlation_id.as_str()) {
                        tracing::debug!(
                            correlation_id = %correlation_id,
                            "Skipping reply for another request"
                        );
                        continue;
                    }
                    return Ok(reply.payload);
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Return-channel receive failed");
                    continue;
                }
                Err(_) => break,
            }
        }

        tracing::warn!(
            provider = %provider,
            correlation_id = %correlation_id,
            "No reply within deadline, answering empty"
        );
        Ok(json!({}))
    }
}

/// HTTP router for the edge receiver
pub fn router(receiver: Arc<WebhookReceiver>) -> Router {
    Router::new()
        .route("/webhook", post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(receiver)
}

async fn receive(
    State(receiver): State<Arc<WebhookReceiver>>,
    Json(body): Json<Value>,
) -> Response {
    match receiver.handle(body).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e @ BridgeError::Classification(_)) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook handling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
