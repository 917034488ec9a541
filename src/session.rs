//! Dashboard session
//!
//! Wires the channel client into the state store. Channel events are handled
//! one at a time on the caller's task, so the store is never shared and needs
//! no lock. Consumers receive [`SessionEvent`]s and render from the snapshot
//! each update carries.

use crate::channel::{ChannelClient, ChannelConfig, ChannelEvent, ChannelState, Connector};
use crate::store::{ClusterState, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events delivered to the consumer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected,
    /// `retry_in` is `None` when the session was shut down
    Disconnected {
        reason: String,
        retry_in: Option<Duration>,
    },
    /// Server refused the session; call [`Session::connect`] to retry
    Unauthorized,
    /// The store changed; the snapshot is immutable
    Update(Arc<ClusterState>),
    /// A message or entity was discarded
    Error(String),
}

/// Channel client plus state store
pub struct Session {
    client: ChannelClient,
    channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    store: StateStore,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Session {
    /// Create an idle session and the receiver for its events
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (client, channel_events) = ChannelClient::new(config, connector);
        let (events, rx) = mpsc::unbounded_channel();

        let session = Self {
            client,
            channel_events,
            store: StateStore::new(),
            events,
        };
        (session, rx)
    }

    /// Start connecting, or resume after an unauthorized halt
    pub fn connect(&mut self) {
        info!(url = %self.client.url(), "Session connecting");
        self.client.connect();
    }

    /// Stop the channel; the store keeps its last state
    pub fn shutdown(&mut self) {
        self.client.teardown();
    }

    pub fn channel_state(&self) -> ChannelState {
        self.client.state()
    }

    /// Current store snapshot
    pub fn snapshot(&self) -> Arc<ClusterState> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Connect and process channel events until the channel halts: an
    /// unauthorized rejection or a shutdown. Call again to resume.
    pub async fn run(&mut self) {
        self.connect();
        while self.step().await {}
        debug!(state = %self.client.state(), "Session event loop finished");
    }

    /// Wait for one channel event and handle it. Returns `false` if the
    /// event halted the channel; nothing more arrives until the next
    /// [`Session::connect`]. Cancel-safe: nothing is lost if the future is
    /// dropped before it completes.
    pub async fn step(&mut self) -> bool {
        match self.channel_events.recv().await {
            Some(event) => self.handle(event),
            None => false,
        }
    }

    /// Returns `false` if the channel halted
    fn handle(&mut self, event: ChannelEvent) -> bool {
        match event {
            ChannelEvent::Connected => self.emit(SessionEvent::Connected),
            ChannelEvent::Disconnected { reason, retry_in } => {
                self.emit(SessionEvent::Disconnected { reason, retry_in });
                return retry_in.is_some();
            }
            ChannelEvent::Unauthorized => {
                self.emit(SessionEvent::Unauthorized);
                return false;
            }
            ChannelEvent::Error(message) => self.emit(SessionEvent::Error(message)),
            ChannelEvent::Update(payload) => match self.store.apply_update(payload) {
                Ok(report) => {
                    for dropped in &report.dropped {
                        let err = crate::error::SwarmViewError::from(dropped);
                        self.emit(SessionEvent::Error(err.to_string()));
                    }
                    self.emit(SessionEvent::Update(self.store.snapshot()));
                }
                Err(e) => {
                    warn!(error = %e, "Update rejected");
                    self.emit(SessionEvent::Error(e.to_string()));
                }
            },
        }
        true
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event receiver dropped");
        }
    }
}
