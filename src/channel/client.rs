//! Push channel client
//!
//! Keeps at most one live connection to the push channel. Every close or
//! error leads back to `Connecting` after an exponential backoff delay,
//! except an unauthorized rejection, which halts the loop until the owner
//! calls [`ChannelClient::connect`] again.
//!
//! Each worker carries the generation it was spawned for. `connect` and
//! `teardown` bump the generation under the same lock the worker takes to
//! publish, so a worker that outlives its abort (still inside `open` on
//! another runtime thread) can no longer change state or emit events.

use super::backoff::Backoff;
use super::transport::{Connector, MessageStream};
use crate::error::SwarmViewError;
use crate::swarm::payload::{is_unauthorized_marker, UpdatePayload};
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Connected => write!(f, "connected"),
        }
    }
}

/// Events emitted by the channel client, in the order they happened
#[derive(Debug)]
pub enum ChannelEvent {
    /// Connection opened
    Connected,
    /// Connection closed or failed; `retry_in` is `None` after teardown
    Disconnected {
        reason: String,
        retry_in: Option<Duration>,
    },
    /// Server refused the session; reconnecting is suspended
    Unauthorized,
    /// A parsed state update
    Update(UpdatePayload),
    /// A message was discarded
    Error(String),
}

/// Channel client configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Push channel URL
    pub url: Url,
    /// Delay before the first reconnect
    pub base_delay: Duration,
    /// Upper bound on the reconnect delay
    pub max_delay: Duration,
}

impl ChannelConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

struct Link {
    /// Bumped whenever the current worker is replaced or torn down
    generation: u64,
    state: ChannelState,
}

/// State shared by the client and its workers
struct Shared {
    link: Mutex<Link>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a worker's transition. Returns `false`, changing nothing, if
    /// the worker's generation is no longer current.
    fn publish(
        &self,
        generation: u64,
        state: Option<ChannelState>,
        event: Option<ChannelEvent>,
    ) -> bool {
        let mut link = self.lock();
        if link.generation != generation {
            return false;
        }
        if let Some(state) = state {
            link.state = state;
        }
        if let Some(event) = event {
            self.send(event);
        }
        true
    }

    fn send(&self, event: ChannelEvent) {
        if self.events.send(event).is_err() {
            debug!("Channel event receiver dropped");
        }
    }
}

/// Push channel client
pub struct ChannelClient {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelClient {
    /// Create a disconnected client and the receiver for its events
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            link: Mutex::new(Link {
                generation: 0,
                state: ChannelState::Disconnected,
            }),
            events,
        };

        let client = Self {
            config,
            connector,
            shared: Arc::new(shared),
            worker: None,
        };
        (client, rx)
    }

    /// Current connection state
    pub fn state(&self) -> ChannelState {
        self.shared.lock().state
    }

    pub fn url(&self) -> &Url {
        &self.config.url
    }

    /// Enter `Connecting`. No-op while connecting or connected; while
    /// waiting out a backoff delay, or after an unauthorized halt, the
    /// connection attempt starts immediately.
    pub fn connect(&mut self) {
        let generation = {
            let mut link = self.shared.lock();
            if link.state != ChannelState::Disconnected {
                debug!(state = %link.state, "Connect requested while already active");
                return;
            }
            link.generation += 1;
            link.state = ChannelState::Connecting;
            link.generation
        };

        if let Some(worker) = self.worker.take() {
            worker.abort();
        }

        let worker = Worker {
            generation,
            url: self.config.url.clone(),
            connector: Arc::clone(&self.connector),
            backoff: Backoff::new(self.config.base_delay, self.config.max_delay),
            shared: Arc::clone(&self.shared),
        };
        self.worker = Some(tokio::spawn(worker.run()));
    }

    /// Close the connection and stop reconnecting. An attempt still in
    /// flight is abandoned; whatever it yields is ignored. Idempotent.
    pub fn teardown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.abort();

        let mut link = self.shared.lock();
        link.generation += 1;
        let previous = std::mem::replace(&mut link.state, ChannelState::Disconnected);
        if previous != ChannelState::Disconnected {
            info!(url = %self.config.url, "Channel torn down");
            self.shared.send(ChannelEvent::Disconnected {
                reason: "torn down".to_string(),
                retry_in: None,
            });
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.shared.lock().generation += 1;
    }
}

enum Outcome {
    Closed(String),
    Halted,
}

/// Connection loop owned by the spawned task
struct Worker {
    generation: u64,
    url: Url,
    connector: Arc<dyn Connector>,
    backoff: Backoff,
    shared: Arc<Shared>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if !self.publish(Some(ChannelState::Connecting), None) {
                return;
            }
            info!(url = %self.url, attempt = self.backoff.attempts(), "Connecting to push channel");

            let reason = match self.connector.open(&self.url).await {
                Ok(stream) => {
                    self.backoff.reset();
                    if !self.publish(Some(ChannelState::Connected), Some(ChannelEvent::Connected)) {
                        debug!(url = %self.url, "Discarding connection opened after teardown");
                        return;
                    }
                    info!(url = %self.url, "Push channel connected");

                    match self.pump(stream).await {
                        Outcome::Halted => return,
                        Outcome::Closed(reason) => reason,
                    }
                }
                Err(SwarmViewError::Unauthorized(reason)) => {
                    self.halt_unauthorized(&reason);
                    return;
                }
                Err(e) => e.to_string(),
            };

            let delay = self.backoff.next_delay();
            let event = ChannelEvent::Disconnected {
                reason: reason.clone(),
                retry_in: Some(delay),
            };
            if !self.publish(Some(ChannelState::Disconnected), Some(event)) {
                return;
            }
            info!(
                reason = %reason,
                attempt = self.backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Push channel disconnected, reconnect scheduled"
            );

            tokio::time::sleep(delay).await;
        }
    }

    /// Forward messages from one connection in arrival order
    async fn pump(&self, mut stream: MessageStream) -> Outcome {
        while let Some(item) = stream.next().await {
            let text = match item {
                Ok(text) => text,
                Err(e) => return Outcome::Closed(e.to_string()),
            };

            if is_unauthorized_marker(&text) {
                self.halt_unauthorized(&text);
                return Outcome::Halted;
            }

            let event = match UpdatePayload::parse(&text) {
                Ok(payload) => ChannelEvent::Update(payload),
                Err(e) => {
                    warn!(error = %e, bytes = text.len(), "Discarding malformed message");
                    ChannelEvent::Error(e.to_string())
                }
            };
            if !self.publish(None, Some(event)) {
                return Outcome::Halted;
            }
        }

        Outcome::Closed("connection closed".to_string())
    }

    fn halt_unauthorized(&self, reason: &str) {
        if self.publish(Some(ChannelState::Disconnected), Some(ChannelEvent::Unauthorized)) {
            warn!(url = %self.url, reason = %reason, "Push channel unauthorized, reconnect suspended");
        }
    }

    fn publish(&self, state: Option<ChannelState>, event: Option<ChannelEvent>) -> bool {
        self.shared.publish(self.generation, state, event)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// What the scripted connector does on one `open` call
    pub(crate) enum Script {
        /// Fail to connect
        Refuse(&'static str),
        /// Reject the handshake as unauthorized
        Reject,
        /// Connect, deliver messages, then close
        Deliver(Vec<String>),
        /// Connect, deliver messages, then stay open
        Hold(Vec<String>),
    }

    /// Connector that replays scripted connections; once the script runs
    /// out, `open` never completes.
    pub(crate) struct ScriptedConnector {
        scripts: Mutex<VecDeque<Script>>,
        opened_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedConnector {
        pub(crate) fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                opened_at: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn opens(&self) -> usize {
            self.opened_at.lock().unwrap().len()
        }

        pub(crate) fn open_times(&self) -> Vec<Instant> {
            self.opened_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn open(&self, _url: &Url) -> Result<MessageStream> {
            self.opened_at.lock().unwrap().push(Instant::now());
            let next = self.scripts.lock().unwrap().pop_front();

            match next {
                Some(Script::Refuse(reason)) => Err(SwarmViewError::Transport(reason.to_string())),
                Some(Script::Reject) => Err(SwarmViewError::Unauthorized("401".to_string())),
                Some(Script::Deliver(messages)) => {
                    Ok(stream::iter(messages.into_iter().map(Ok)).boxed())
                }
                Some(Script::Hold(messages)) => Ok(stream::iter(messages.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed()),
                None => futures_util::future::pending().await,
            }
        }
    }

    fn config(base_ms: u64, max_ms: u64) -> ChannelConfig {
        ChannelConfig {
            url: Url::parse("ws://localhost:8080/ws").unwrap(),
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        }
    }

    const DELTA: &str = r#"{"kind":"delta"}"#;

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_delays_follow_backoff() {
        let connector = ScriptedConnector::new(vec![
            Script::Refuse("refused"),
            Script::Refuse("refused"),
            Script::Refuse("refused"),
            Script::Refuse("refused"),
            Script::Deliver(vec![]),
            Script::Refuse("refused"),
            Script::Hold(vec![]),
        ]);
        let (mut client, mut rx) = ChannelClient::new(config(1000, 4000), connector.clone());
        client.connect();

        let mut retries = Vec::new();
        let mut connects = 0;
        while connects < 2 {
            match rx.recv().await.unwrap() {
                ChannelEvent::Disconnected { retry_in, .. } => retries.push(retry_in.unwrap()),
                ChannelEvent::Connected => connects += 1,
                other => panic!("unexpected event {:?}", other),
            }
        }

        let ms: Vec<u128> = retries.iter().map(|d| d.as_millis()).collect();
        // Four refusals, then a close after a successful open resets the counter.
        assert_eq!(ms, vec![1000, 2000, 4000, 4000, 1000, 2000]);

        let times = connector.open_times();
        let gaps: Vec<u128> = times.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
        assert_eq!(gaps, ms);
        assert_eq!(client.state(), ChannelState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent() {
        let connector = ScriptedConnector::new(vec![Script::Hold(vec![])]);
        let (mut client, mut rx) = ChannelClient::new(config(1000, 30000), connector.clone());

        client.connect();
        client.connect();
        assert_eq!(client.state(), ChannelState::Connecting);

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));
        client.connect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ChannelState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_are_demultiplexed() {
        let connector = ScriptedConnector::new(vec![Script::Hold(vec![
            "{not json".to_string(),
            DELTA.to_string(),
            r#"{"kind":"full","nodes":[],"services":[],"tasks":[],"networks":[]}"#.to_string(),
        ])]);
        let (mut client, mut rx) = ChannelClient::new(config(1000, 30000), connector);
        client.connect();

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Error(_))));
        match rx.recv().await {
            Some(ChannelEvent::Update(payload)) => assert!(!payload.is_full()),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await {
            Some(ChannelEvent::Update(payload)) => assert!(payload.is_full()),
            other => panic!("unexpected event {:?}", other),
        }

        // The malformed message did not close the connection.
        assert_eq!(client.state(), ChannelState::Connected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_halts_reconnect() {
        let connector = ScriptedConnector::new(vec![
            Script::Hold(vec!["401-Unauthorized".to_string(), DELTA.to_string()]),
            Script::Hold(vec![]),
        ]);
        let (mut client, mut rx) = ChannelClient::new(config(10, 100), connector.clone());
        client.connect();

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Unauthorized)));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ChannelState::Disconnected);
        // Nothing after the marker was delivered.
        assert!(rx.try_recv().is_err());

        client.connect();
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));
        assert_eq!(connector.opens(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_reconnecting() {
        let connector = ScriptedConnector::new(vec![Script::Refuse("refused"), Script::Hold(vec![])]);
        let (mut client, mut rx) = ChannelClient::new(config(1000, 30000), connector.clone());
        client.connect();

        assert!(matches!(
            rx.recv().await,
            Some(ChannelEvent::Disconnected { retry_in: Some(_), .. })
        ));
        client.teardown();
        client.teardown();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ChannelState::Disconnected);
        // Already disconnected when torn down, so no extra event.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_of_live_connection_reports_disconnect() {
        let connector = ScriptedConnector::new(vec![Script::Hold(vec![])]);
        let (mut client, mut rx) = ChannelClient::new(config(1000, 30000), connector);
        client.connect();
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));

        client.teardown();
        assert!(matches!(
            rx.recv().await,
            Some(ChannelEvent::Disconnected { retry_in: None, .. })
        ));
        assert_eq!(client.state(), ChannelState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_handshake_halts_reconnect() {
        let connector = ScriptedConnector::new(vec![Script::Reject, Script::Hold(vec![])]);
        let (mut client, mut rx) = ChannelClient::new(config(10, 100), connector.clone());
        client.connect();

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Unauthorized)));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ChannelState::Disconnected);
        assert!(rx.try_recv().is_err());

        client.connect();
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected)));
    }

    /// First `open` blocks its runtime thread, then succeeds; later opens
    /// never complete.
    #[derive(Default)]
    struct BlockingConnector {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl Connector for BlockingConnector {
        async fn open(&self, _url: &Url) -> Result<MessageStream> {
            if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(300));
                return Ok(stream::pending().boxed());
            }
            futures_util::future::pending().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_teardown_abandons_attempt_in_flight() {
        let connector = Arc::new(BlockingConnector::default());
        let (mut client, mut rx) = ChannelClient::new(config(1000, 30000), connector.clone());
        client.connect();

        tokio::time::sleep(Duration::from_millis(100)).await;
        client.teardown();
        assert_eq!(client.state(), ChannelState::Disconnected);

        // The open completes after teardown and must change nothing.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(client.state(), ChannelState::Disconnected);
        assert!(matches!(
            rx.try_recv(),
            Ok(ChannelEvent::Disconnected { retry_in: None, .. })
        ));
        assert!(rx.try_recv().is_err());

        client.connect();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 2);
        assert_eq!(client.state(), ChannelState::Connecting);
    }
}
