//! Console channel: a local chat over stdin/stdout.
//!
//! A dedicated OS thread blocks on the input stream and delivers each
//! `sender: text` line to the event sink. Outgoing messages are written as
//! `[to <recipient>] <text>` lines.


use crate::roster::Roster;
use async_trait::async_trait;
use medbot_core::{
    config::ConsoleConfig,
    error::MedbotError,
    message::InboundEvent,
    sink::EventSink,
    traits::{ChatGateway, DeliveryStyle, RecipientResolver},
};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

type Input = Box<dyn BufRead + Send>;
type Output = Box<dyn Write + Send>;

/// Console channel with a blocking listener thread.
pub struct ConsoleChannel {
    roster: Arc<Roster>,
    /// Input stream, moved into the listener thread by `subscribe()`.
    input: Mutex<Option<Input>>,
    output: Mutex<Output>,
    stopped: Arc<AtomicBool>,
}

impl ConsoleChannel {
    /// Console channel on the process's stdin and stdout.
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_io(
            config,
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    /// Console channel on arbitrary streams.
    pub fn with_io(config: ConsoleConfig, input: Input, output: Output) -> Self {
        Self {
            roster: Arc::new(Roster::from_contacts(config.contacts)),
            input: Mutex::new(Some(input)),
            output: Mutex::new(output),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    fn identify(roster: &Roster, name: &str) -> Option<String> {
        roster.lookup(name).or_else(|| {
            let trimmed = name.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
        })
    }
}

/// Split an input line into `(sender, text)`.
pub(crate) fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (sender, text) = line.split_once(':')?;
    let sender = sender.trim();
    if sender.is_empty() {
        return None;
    }
    Some((sender, text.trim()))
}

#[async_trait]
impl RecipientResolver for ConsoleChannel {
    async fn resolve(&self, display_name: &str) -> Result<String, MedbotError> {
        Self::identify(&self.roster, display_name)
            .ok_or_else(|| MedbotError::RecipientNotFound(display_name.to_string()))
    }
}

#[async_trait]
impl ChatGateway for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn delivery(&self) -> DeliveryStyle {
        DeliveryStyle::ListenerThread
    }

    async fn subscribe(&self, sink: EventSink) -> Result<(), MedbotError> {
        let input = self
            .input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| MedbotError::Transport("console channel already subscribed".into()))?;

        let roster = self.roster.clone();
        let stopped = self.stopped.clone();

        std::thread::Builder::new()
            .name("console-listener".into())
            .spawn(move || {
                for line in input.lines() {
                    if stopped.load(Ordering::Acquire) {
                        break;
                    }
                    let line = match line {
                        Ok(l) => l,
                        Err(e) => {
                            warn!("console read error: {e}");
                            break;
                        }
                    };
                    let Some((sender, text)) = parse_line(&line) else {
                        debug!("console: ignoring line without sender");
                        continue;
                    };
                    let Some(sender_id) = Self::identify(&roster, sender) else {
                        continue;
                    };
                    let event =
                        InboundEvent::new("console", &sender_id, text).with_sender_name(sender);
                    if !sink.deliver(event) {
                        break;
                    }
                }
                info!("console listener exiting");
            })?;

        info!("Console channel listening on its input stream");
        Ok(())
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), MedbotError> {
        self.resolve(recipient).await?;
        let mut out = self.output.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "[to {recipient}] {text}")
            .and_then(|()| out.flush())
            .map_err(|e| MedbotError::Transport(format!("console write failed: {e}")))
    }

    async fn stop(&self) -> Result<(), MedbotError> {
        self.stopped.store(true, Ordering::Release);
        info!("Console channel stopped");
        Ok(())
    }
}
