//! End-to-end: push channel messages through the session into the view

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swarmview::channel::{ChannelConfig, Connector, MessageStream};
use swarmview::session::{Session, SessionEvent};
use swarmview::view::{build_dashboard, ModeInclusion, ViewConfig, ViewFilter};
use swarmview::{Result, SwarmViewError};
use tokio::sync::mpsc;
use url::Url;

/// Each `open` pops one connection's worth of messages; `None` refuses.
/// Connections stay open after their messages are delivered.
struct Replay {
    connections: Mutex<VecDeque<Option<Vec<&'static str>>>>,
}

impl Replay {
    fn new(connections: Vec<Option<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(connections.into()),
        })
    }
}

#[async_trait]
impl Connector for Replay {
    async fn open(&self, _url: &Url) -> Result<MessageStream> {
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(Some(messages)) => Ok(stream::iter(messages.into_iter().map(|m| Ok(m.to_string())))
                .chain(stream::pending())
                .boxed()),
            Some(None) => Err(SwarmViewError::Transport("connection refused".to_string())),
            None => futures_util::future::pending().await,
        }
    }
}

const SNAPSHOT: &str = r#"{
    "kind": "full",
    "cluster_name": "lab",
    "nodes": [
        {"id": "n1", "hostname": "manager-1", "role": "manager", "leader": true,
         "nano_cpus": 4000000000, "memory_bytes": 8589934592},
        {"id": "n2", "hostname": "worker-1", "nano_cpus": 2000000000}
    ],
    "services": [
        {"id": "s1", "name": "proxy", "mode": "global", "image": "traefik:3@sha256:abc",
         "resources": {"reservations": {"nano_cpus": 500000000, "memory_bytes": 134217728}}},
        {"id": "s2", "name": "api", "mode": {"replicated": {"replicas": 2}}, "networks": ["backend"],
         "resources": {"reservations": {"nano_cpus": 250000000}, "limits": {"nano_cpus": 1000000000}}}
    ],
    "tasks": [
        {"id": "t1", "node_id": "n1", "service_id": "s1", "state": "running", "created_at": "2024-05-01T10:00:00Z"},
        {"id": "t2", "node_id": "n1", "service_id": "s2", "state": "running", "slot": 1, "created_at": "2024-05-01T09:00:00Z"},
        {"id": "t3", "node_id": "n2", "service_id": "s2", "state": "running", "slot": 2, "created_at": "2024-05-01T09:30:00Z"},
        {"id": "t4", "node_id": "n2", "service_id": "s1", "state": "running", "created_at": "2024-05-01T10:00:00Z"}
    ],
    "networks": [{"id": "backend", "name": "backend", "driver": "overlay"}]
}"#;

const MOVE_AND_REMOVE: &str = r#"{
    "kind": "delta",
    "tasks": [
        {"id": "t3", "node_id": "n1", "service_id": "s2", "state": "running", "slot": 2, "created_at": "2024-05-01T09:30:00Z"}
    ],
    "removed": {"tasks": ["t4"]}
}"#;

fn config() -> ChannelConfig {
    ChannelConfig {
        url: Url::parse("ws://localhost:8080/ws").unwrap(),
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
    }
}

/// Drive the session until the next consumer event
async fn next(session: &mut Session, rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    loop {
        if let Ok(event) = rx.try_recv() {
            return event;
        }
        session.step().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_then_delta_end_to_end() {
    let connector = Replay::new(vec![None, Some(vec![SNAPSHOT, MOVE_AND_REMOVE])]);
    let (mut session, mut rx) = Session::new(config(), connector);
    session.connect();

    match next(&mut session, &mut rx).await {
        SessionEvent::Disconnected { retry_in, .. } => {
            assert_eq!(retry_in, Some(Duration::from_millis(100)))
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(next(&mut session, &mut rx).await, SessionEvent::Connected));

    let state = match next(&mut session, &mut rx).await {
        SessionEvent::Update(state) => state,
        other => panic!("unexpected event {:?}", other),
    };
    assert_eq!(state.cluster_name(), Some("lab"));

    let view = build_dashboard(&state, &ViewConfig::default());
    let manager = &view.nodes[0];
    assert_eq!(manager.node.hostname, "manager-1");
    let ids: Vec<&str> = manager.tasks.iter().map(|r| r.task.id.as_str()).collect();
    // Global first, then by creation time.
    assert_eq!(ids, vec!["t1", "t2"]);
    assert_eq!(manager.usage.reserved_cpus(), 0.75);
    assert_eq!(manager.tasks[1].task.display_name(manager.tasks[1].service), "api.1");

    let state = match next(&mut session, &mut rx).await {
        SessionEvent::Update(state) => state,
        other => panic!("unexpected event {:?}", other),
    };
    let view = build_dashboard(&state, &ViewConfig::default());
    let ids: Vec<&str> = view.nodes[0].tasks.iter().map(|r| r.task.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3"]);
    assert!(view.nodes[1].tasks.is_empty());
    assert_eq!(view.nodes[1].usage.reserved_nano_cpus, 0);
    assert_eq!(state.node("n2").unwrap().task_ids.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_filter_applies_to_live_state() {
    let connector = Replay::new(vec![Some(vec![SNAPSHOT])]);
    let (mut session, mut rx) = Session::new(config(), connector);
    session.connect();

    assert!(matches!(next(&mut session, &mut rx).await, SessionEvent::Connected));
    let state = match next(&mut session, &mut rx).await {
        SessionEvent::Update(state) => state,
        other => panic!("unexpected event {:?}", other),
    };

    let config = ViewConfig {
        filter: ViewFilter {
            text: "API".to_string(),
            modes: ModeInclusion::replicated_only(),
            ..Default::default()
        },
        ..Default::default()
    };
    let view = build_dashboard(&state, &config);
    assert_eq!(view.visible_tasks(), 2);
    assert_eq!(view.total_tasks(), 4);
    // Aggregates ignore the filter.
    assert_eq!(view.nodes[0].usage.reserved_nano_cpus, 750_000_000);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_marker_stops_the_session() {
    let connector = Replay::new(vec![Some(vec!["401-Unauthorized: token expired", SNAPSHOT])]);
    let (mut session, mut rx) = Session::new(config(), connector);
    session.connect();

    assert!(matches!(next(&mut session, &mut rx).await, SessionEvent::Connected));
    assert!(matches!(next(&mut session, &mut rx).await, SessionEvent::Unauthorized));

    // The snapshot after the marker is never delivered, and nothing reconnects.
    let idle = tokio::time::timeout(Duration::from_secs(30), session.step()).await;
    assert!(idle.is_err());
    assert!(rx.try_recv().is_err());
    assert!(session.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_unauthorized_and_resumes() {
    let connector = Replay::new(vec![
        Some(vec![SNAPSHOT, "401-Unauthorized"]),
        Some(vec![MOVE_AND_REMOVE]),
    ]);
    let (mut session, mut rx) = Session::new(config(), connector);

    tokio::time::timeout(Duration::from_secs(5), session.run())
        .await
        .expect("run returns once unauthorized");
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.last(), Some(SessionEvent::Unauthorized)));

    // Resuming keeps the state and applies the next delta on top of it.
    session.connect();
    assert!(matches!(next(&mut session, &mut rx).await, SessionEvent::Connected));
    let state = match next(&mut session, &mut rx).await {
        SessionEvent::Update(state) => state,
        other => panic!("unexpected event {:?}", other),
    };
    assert_eq!(state.task("t3").unwrap().node_id, "n1");
    assert!(state.task("t4").is_none());
}
