//! Long-polling update loop and ChatGateway trait implementation.

use super::types::{TgMessage, TgResponse, TgUpdate};
use super::TelegramChannel;
use crate::roster::Roster;
use async_trait::async_trait;
use medbot_core::{
    error::MedbotError,
    message::InboundEvent,
    sink::EventSink,
    traits::{ChatGateway, DeliveryStyle, RecipientResolver},
};
use tracing::{debug, error, info, warn};

#[async_trait]
impl ChatGateway for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn delivery(&self) -> DeliveryStyle {
        DeliveryStyle::Cooperative
    }

    async fn subscribe(&self, sink: EventSink) -> Result<(), MedbotError> {
        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            return Err(MedbotError::Transport(
                "telegram channel already subscribed".into(),
            ));
        }

        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let poll_timeout = self.config.poll_timeout_secs;
        let last_update_id = self.last_update_id.clone();
        let roster = self.roster.clone();

        info!("Telegram channel starting long polling...");

        *poller = Some(tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout={poll_timeout}");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(poll_timeout + 5))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(msg) = update.message else {
                        continue;
                    };
                    let Some(event) = message_to_event(msg, &roster) else {
                        continue;
                    };
                    if !sink.deliver(event) {
                        info!("event queue dropped, stopping telegram poll");
                        return;
                    }
                }
            }
        }));

        Ok(())
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), MedbotError> {
        let target = self.resolve(recipient).await?;
        let chat_id: i64 = target.parse().map_err(|e| {
            MedbotError::Transport(format!("invalid telegram chat_id '{target}': {e}"))
        })?;
        self.send_text(chat_id, text).await
    }

    async fn stop(&self) -> Result<(), MedbotError> {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Turn a Telegram message into an inbound event, learning the sender's
/// names on the way. Returns `None` for messages the agent never acts on.
pub(super) fn message_to_event(msg: TgMessage, roster: &Roster) -> Option<InboundEvent> {
    let Some(user) = msg.from else {
        return None;
    };

    // Only person-to-person conversations.
    if msg.chat.is_group() {
        debug!("telegram: ignoring group message from chat {}", msg.chat.id);
        return None;
    }

    let sender_id = user.id.to_string();
    let names = user.known_names();
    for name in &names {
        roster.learn(name, &sender_id);
    }

    let Some(text) = msg.text else {
        warn!("telegram: ignoring non-text message from {sender_id}");
        return None;
    };

    let mut event = InboundEvent::new("telegram", &sender_id, &text);
    if let Some(at) = chrono::DateTime::from_timestamp(msg.date, 0).filter(|_| msg.date > 0) {
        event.received_at = at;
    }
    if let Some(name) = names.into_iter().next() {
        event = event.with_sender_name(name);
    }
    Some(event)
}
