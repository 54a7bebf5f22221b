//! Inbound event delivery handle shared by every transport.
//!
//! Transports push events through an [`EventSink`] regardless of how they
//! receive them: from a Tokio task, or from a dedicated OS listener thread.
//! `deliver` never blocks and never awaits, so both styles use the same call.

use crate::message::InboundEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving half of the inbound queue, owned by the agent loop.
pub type EventQueue = mpsc::UnboundedReceiver<InboundEvent>;

/// Cloneable, thread-safe handle for pushing inbound events into the queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventSink {
    /// Create a sink and the queue it feeds.
    pub fn channel() -> (Self, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event. Returns `false` once the queue has been dropped.
    pub fn deliver(&self, event: InboundEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!("event queue closed, dropping event {}", e.0.id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_from_listener_thread() {
        let (sink, mut queue) = EventSink::channel();
        let handle = std::thread::spawn(move || {
            sink.deliver(InboundEvent::new("console", "buddy", "yes"))
        });
        assert!(handle.join().unwrap());
        let event = queue.try_recv().unwrap();
        assert_eq!(event.sender_id, "buddy");
        assert_eq!(event.text, "yes");
    }

    #[test]
    fn test_deliver_after_queue_dropped() {
        let (sink, queue) = EventSink::channel();
        drop(queue);
        assert!(!sink.deliver(InboundEvent::new("console", "buddy", "yes")));
    }
}
