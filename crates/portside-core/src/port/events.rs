//! Event fan-out backing every port implementation.

use tokio::sync::broadcast;

use super::PortEvent;

const EVENT_BUFFER: usize = 64;

/// Multi-subscriber event hub: `emit_*` on one side, [`subscribe`] handles
/// on the other. Cloning shares the hub.
///
/// [`subscribe`]: PortEvents::subscribe
#[derive(Debug, Clone)]
pub struct PortEvents {
    tx: broadcast::Sender<PortEvent>,
}

impl Default for PortEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl PortEvents {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> PortSubscription {
        PortSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver a message to all current subscribers. A message emitted with
    /// no subscriber is dropped, not queued.
    pub fn emit_message(&self, data: serde_json::Value) {
        let _ = self.tx.send(PortEvent::Message(data));
    }

    pub fn emit_close(&self) {
        let _ = self.tx.send(PortEvent::Close);
    }
}

/// Explicit subscription handle; dropping it detaches the listener.
pub struct PortSubscription {
    rx: broadcast::Receiver<PortEvent>,
}

impl PortSubscription {
    /// Next event, or `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<PortEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "port subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let events = PortEvents::new();
        let mut a = events.subscribe();
        let mut b = events.subscribe();

        events.emit_message(json!(1));
        events.emit_close();

        for sub in [&mut a, &mut b] {
            assert!(matches!(sub.next().await, Some(PortEvent::Message(v)) if v == json!(1)));
            assert!(matches!(sub.next().await, Some(PortEvent::Close)));
        }
    }

    #[tokio::test]
    async fn ends_when_hub_is_dropped() {
        let events = PortEvents::new();
        let mut sub = events.subscribe();
        drop(events);
        assert!(sub.next().await.is_none());
    }
}
