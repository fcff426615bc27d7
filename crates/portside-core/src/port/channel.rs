//! In-process linked port pair.
//!
//! The Rust analogue of a worker `MessageChannel`: two ports where a message
//! posted on one side surfaces as an inbound event on the other. Values pass
//! as structured data; no string encoding is involved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::events::{PortEvents, PortSubscription};
use super::MessagePort;
use crate::error::RpcError;

/// One end of an in-process duplex channel. Create with
/// [`channel_port_pair`].
pub struct ChannelPort {
    incoming: PortEvents,
    peer: PortEvents,
    closed: Arc<AtomicBool>,
}

/// Create a linked pair of ports. Closing either side closes the channel.
pub fn channel_port_pair() -> (Arc<ChannelPort>, Arc<ChannelPort>) {
    let left_events = PortEvents::new();
    let right_events = PortEvents::new();
    let closed = Arc::new(AtomicBool::new(false));

    let left = Arc::new(ChannelPort {
        incoming: left_events.clone(),
        peer: right_events.clone(),
        closed: closed.clone(),
    });
    let right = Arc::new(ChannelPort {
        incoming: right_events,
        peer: left_events,
        closed,
    });
    (left, right)
}

impl ChannelPort {
    /// Tear the channel down, emitting `Close` on both sides.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.incoming.emit_close();
            self.peer.emit_close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagePort for ChannelPort {
    async fn post_message(&self, data: Value) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::new("channel closed"));
        }
        self.peer.emit_message(data);
        Ok(())
    }

    fn subscribe(&self) -> PortSubscription {
        self.incoming.subscribe()
    }
}
