//! Bot worker: provider payloads to dispatched commands
//!
//! `BotService` wires the event relay to the dispatcher. It owns the
//! per-provider payload extraction (each platform wraps user id and text
//! differently) and the reply paths: push messaging for asynchronous
//! providers, and correlated return-channel replies for providers whose
//! webhook call waits on a body.

use crate::dispatch::{Dispatcher, MenuLink, Messenger};
use crate::error::Result;
use crate::relay::{EventRelay, InboundEvent};
use crate::types::Provider;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The worker service: relay, dispatcher, and outbound messaging
pub struct BotService {
    relay: Arc<EventRelay>,
    dispatcher: Arc<Dispatcher>,
    push: Arc<dyn Messenger>,
    channels: Vec<String>,
}

impl BotService {
    pub fn new(
        relay: Arc<EventRelay>,
        dispatcher: Arc<Dispatcher>,
        push: Arc<dyn Messenger>,
        channels: Vec<String>,
    ) -> Self {
        Self {
            relay,
            dispatcher,
            push,
            channels,
        }
    }

    /// Register the provider handlers and start the relay loops
    pub async fn start(&self) -> Result<Vec<JoinHandle<()>>> {
        for channel in &self.channels {
            let Some(provider) = Provider::from_channel(channel) else {
                continue;
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let push = Arc::clone(&self.push);
            let relay = Arc::clone(&self.relay);

            self.relay
                .on(
                    channel,
                    Arc::new(move |event: InboundEvent| {
                        let dispatcher = Arc::clone(&dispatcher);
                        let push = Arc::clone(&push);
                        let relay = Arc::clone(&relay);
                        Box::pin(async move {
                            handle_event(provider, event, dispatcher, push, relay).await;
                        })
                    }),
                )
                .await;
        }

        self.relay.start(&self.channels).await
    }
}

async fn handle_event(
    provider: Provider,
    event: InboundEvent,
    dispatcher: Arc<Dispatcher>,
    push: Arc<dyn Messenger>,
    relay: Arc<EventRelay>,
) {
    let extracted = match provider {
        Provider::Line => line_text_message(&event.payload),
        Provider::Kakao => kakao_utterance(&event.payload),
    };

    let Some((user, text)) = extracted else {
        tracing::debug!(provider = %provider, "Payload carried no actionable message");
        // The edge still needs a body even when there is nothing to do
        if let Some(ref id) = event.correlation_id {
            if let Err(e) = relay.send_reply(id, json!({})).await {
                tracing::warn!(provider = %provider, error = %e, "Empty reply undeliverable");
            }
        }
        return;
    };

    if provider.requires_sync_reply() {
        match event.correlation_id {
            Some(id) => {
                let reply = ReplyMessenger::new(relay, id);
                dispatcher.dispatch(&reply, &user, &text).await;
                reply.finish().await;
            }
            None => {
                // An uncorrelated event has no edge waiting; handle it
                // but replies have nowhere to go.
                tracing::warn!(provider = %provider, "Sync-reply event without correlation id");
                dispatcher.dispatch(&NullMessenger, &user, &text).await;
            }
        }
    } else {
        dispatcher.dispatch(push.as_ref(), &user, &text).await;
    }
}

/// Extract (user id, text) from one messaging event of the push platform
///
/// Only text messages are actionable; stickers, images, follows and the
/// rest resolve to `None`.
pub fn line_text_message(payload: &Value) -> Option<(String, String)> {
    if payload.pointer("/message/type")?.as_str()? != "text" {
        return None;
    }
    let user = payload.pointer("/source/userId")?.as_str()?;
    let text = payload.pointer("/message/text")?.as_str()?;
    Some((user.to_string(), text.to_string()))
}

/// Extract (user id, text) from a skill payload of the sync platform
///
/// A configured action parameter takes precedence over the raw
/// utterance, so block-mapped commands survive display-label rewording.
pub fn kakao_utterance(payload: &Value) -> Option<(String, String)> {
    let user = payload.pointer("/userRequest/user/id")?.as_str()?;

    let action = payload
        .pointer("/action/params/action")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let text = match action {
        Some(action) => action,
        None => payload.pointer("/userRequest/utterance")?.as_str()?,
    };

    Some((user.to_string(), text.to_string()))
}

/// Skill-response body for a plain text reply
pub fn skill_text(text: &str) -> Value {
    json!({
        "version": "2.0",
        "template": {
            "outputs": [
                {"simpleText": {"text": text}}
            ]
        }
    })
}

/// Skill-response body for a card with link buttons
pub fn skill_card(text: &str, links: &[MenuLink]) -> Value {
    let buttons: Vec<Value> = links
        .iter()
        .map(|link| {
            json!({
                "action": "webLink",
                "label": link.label,
                "webLinkUrl": link.uri,
            })
        })
        .collect();

    json!({
        "version": "2.0",
        "template": {
            "outputs": [
                {"basicCard": {"description": text, "buttons": buttons}}
            ]
        }
    })
}

/// Messenger that answers through the correlated return channel
///
/// The skill protocol allows exactly one response body per request, so
/// only the first send is published; later sends from the same command
/// are logged and dropped. `finish` publishes an empty body if the
/// handler never sent one, releasing the waiting edge early.
pub struct ReplyMessenger {
    relay: Arc<EventRelay>,
    correlation_id: String,
    sent: tokio::sync::Mutex<bool>,
}

impl ReplyMessenger {
    pub fn new(relay: Arc<EventRelay>, correlation_id: String) -> Self {
        Self {
            relay,
            correlation_id,
            sent: tokio::sync::Mutex::new(false),
        }
    }

    async fn send_body(&self, body: Value) -> Result<()> {
        let mut sent = self.sent.lock().await;
        if *sent {
            tracing::debug!(
                correlation_id = %self.correlation_id,
                "Reply already sent, dropping extra body"
            );
            return Ok(());
        }
        self.relay.send_reply(&self.correlation_id, body).await?;
        *sent = true;
        Ok(())
    }

    /// Publish an empty body unless a reply already went out
    pub async fn finish(&self) {
        if let Err(e) = self.send_body(json!({})).await {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                error = %e,
                "Final empty reply undeliverable"
            );
        }
    }
}

#[async_trait]
impl Messenger for ReplyMessenger {
    async fn send_text(&self, _to: &str, text: &str) -> Result<()> {
        self.send_body(skill_text(text)).await
    }

    async fn send_links(&self, _to: &str, text: &str, links: &[MenuLink]) -> Result<()> {
        self.send_body(skill_card(text, links)).await
    }
}

/// Messenger that discards everything
struct NullMessenger;

#[async_trait]
impl Messenger for NullMessenger {
    async fn send_text(&self, _to: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn send_links(&self, _to: &str, _text: &str, _links: &[MenuLink]) -> Result<()> {
        Ok(())
    }
}
