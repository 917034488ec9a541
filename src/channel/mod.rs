//! Push channel client
//!
//! One logical connection to the server-pushed update stream, with
//! reconnect-and-backoff and demultiplexing of incoming messages.

pub mod backoff;
pub mod client;
pub mod endpoint;
pub mod transport;

pub use backoff::Backoff;
pub use client::{ChannelClient, ChannelConfig, ChannelEvent, ChannelState};
pub use endpoint::{channel_url, DEFAULT_CHANNEL_SUFFIX};
pub use transport::{Connector, MessageStream, WsConnector};
