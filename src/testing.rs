//! In-memory chat transport for engine and agent tests.

use crate::reminder::{EngineSettings, MessagePools, ReminderEngine};
use async_trait::async_trait;
use medbot_core::{
    config::MessagesConfig,
    error::MedbotError,
    message::InboundEvent,
    sink::EventSink,
    traits::{ChatGateway, DeliveryStyle, RecipientResolver},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub const ALARM: &str = "ALARM";
pub const REMINDER: &str = "REMINDER";
pub const PRAISE: &str = "PRAISE";
pub const GIVE_UP: &str = "GIVE UP";

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub at: Instant,
}

pub struct MockGateway {
    contacts: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<SentMessage>>,
    sent_count: watch::Sender<usize>,
    sink: Mutex<Option<EventSink>>,
    fail_sends: AtomicBool,
    stopped: AtomicBool,
}

impl MockGateway {
    pub fn with_recipient(name: &str, id: &str) -> Arc<Self> {
        let (sent_count, _) = watch::channel(0);
        let gateway = Self {
            contacts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            sent_count,
            sink: Mutex::new(None),
            fail_sends: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        };
        gateway.add_contact(name, id);
        Arc::new(gateway)
    }

    pub fn add_contact(&self, name: &str, id: &str) {
        self.contacts
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), id.to_string());
    }

    pub fn forget(&self, name: &str) {
        self.contacts.lock().unwrap().remove(&name.to_lowercase());
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Push an event through the subscribed sink.
    pub fn deliver(&self, event: InboundEvent) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.deliver(event),
            None => false,
        }
    }

    /// Wait until at least `n` messages went out. Bounded at three days of
    /// (usually paused) time.
    pub async fn wait_for_sends(&self, n: usize) {
        let mut rx = self.sent_count.subscribe();
        tokio::time::timeout(Duration::from_secs(3 * 24 * 3600), rx.wait_for(|c| *c >= n))
            .await
            .expect("timed out waiting for sends")
            .expect("send counter closed");
    }
}

#[async_trait]
impl RecipientResolver for MockGateway {
    async fn resolve(&self, display_name: &str) -> Result<String, MedbotError> {
        self.contacts
            .lock()
            .unwrap()
            .get(&display_name.to_lowercase())
            .cloned()
            .ok_or_else(|| MedbotError::RecipientNotFound(display_name.to_string()))
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    fn delivery(&self) -> DeliveryStyle {
        DeliveryStyle::Cooperative
    }

    async fn subscribe(&self, sink: EventSink) -> Result<(), MedbotError> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), MedbotError> {
        self.resolve(recipient).await?;
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MedbotError::Transport("mock send failure".into()));
        }
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                recipient: recipient.to_string(),
                text: text.to_string(),
                at: Instant::now(),
            });
            sent.len()
        };
        self.sent_count.send_replace(count);
        Ok(())
    }

    async fn stop(&self) -> Result<(), MedbotError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Single-entry pools so tests can assert on exact texts.
pub fn test_pools() -> MessagePools {
    MessagePools::from_config(&MessagesConfig {
        alarm: vec![ALARM.into()],
        reminder: vec![REMINDER.into()],
        praise: vec![PRAISE.into()],
        give_up: vec![GIVE_UP.into()],
    })
    .unwrap()
}

/// Engine talking to `gateway`, which also resolves the recipient "Buddy".
pub fn engine_with(
    gateway: &Arc<MockGateway>,
    max_retries: u32,
    retry_interval: Duration,
) -> Arc<ReminderEngine> {
    let settings = EngineSettings {
        recipient: "Buddy".into(),
        retry_interval,
        max_retries,
        pools: test_pools(),
    };
    Arc::new(ReminderEngine::new(
        settings,
        gateway.clone(),
        gateway.clone(),
    ))
}
