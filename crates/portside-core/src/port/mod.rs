//! The uniform duplex "message port" interface.
//!
//! Every port-based transport — in-process channel pairs, WebSocket, the SSE
//! duplex emulation — implements [`MessagePort`], and the correlation
//! adapters in [`adapter`] work against the trait only. Messages are carried
//! as `serde_json::Value` structured data; string-framed transports encode
//! at their boundary.

mod adapter;
mod channel;
mod events;

pub use adapter::{PortClientAdapter, PortServerAdapter, PortServerHandle};
pub use channel::{channel_port_pair, ChannelPort};
pub use events::{PortEvents, PortSubscription};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

/// An event observed on a port.
#[derive(Debug, Clone)]
pub enum PortEvent {
    /// An inbound message.
    Message(Value),
    /// The underlying channel is gone; no further messages will arrive.
    Close,
}

/// Minimal duplex interface: send one message, subscribe to inbound events.
///
/// Subscriptions are explicit handles — dropping a [`PortSubscription`]
/// detaches it. Subscribe *before* triggering any traffic you intend to
/// observe; events emitted with no live subscriber are not replayed.
#[async_trait]
pub trait MessagePort: Send + Sync + 'static {
    /// Deliver `data` to the other side.
    ///
    /// Fails once the port is closed. Implementations over lossy carriers
    /// surface their transport error here rather than dropping the message
    /// silently.
    async fn post_message(&self, data: Value) -> Result<(), RpcError>;

    /// Subscribe to inbound [`PortEvent`]s.
    fn subscribe(&self) -> PortSubscription;
}
