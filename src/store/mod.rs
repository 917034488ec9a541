//! State store
//!
//! The single mutable model of the cluster. Update payloads are reconciled
//! in a fixed order (networks, services, nodes, tasks, then pruning) so that
//! a task is only ever accepted when its node and service already resolve.
//! Tasks that don't resolve are dropped and reported, never kept dangling.

mod state;

pub use state::ClusterState;

use crate::error::{Result, SwarmViewError};
use crate::swarm::payload::{Delta, Removed, Snapshot};
use crate::swarm::{Network, Node, Service, Task, UpdatePayload};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Why a task was dropped during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The task's node does not resolve
    UnknownNode(String),
    /// The task's service does not resolve
    UnknownService(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnknownNode(id) => write!(f, "unknown node {}", id),
            DropReason::UnknownService(id) => write!(f, "unknown service {}", id),
        }
    }
}

/// A task rejected by referential integrity checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTask {
    pub task_id: String,
    pub reason: DropReason,
}

impl From<&DroppedTask> for SwarmViewError {
    fn from(dropped: &DroppedTask) -> Self {
        SwarmViewError::DanglingTask {
            task_id: dropped.task_id.clone(),
            reason: dropped.reason.to_string(),
        }
    }
}

/// Outcome of a successfully applied payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Store revision after the payload
    pub revision: u64,
    /// Whether the payload was a full snapshot
    pub full: bool,
    /// Entities inserted or updated
    pub upserted: usize,
    /// Entities removed, by pruning or explicit removal
    pub removed: usize,
    /// Tasks dropped because a reference did not resolve
    pub dropped: Vec<DroppedTask>,
}

/// Service index registry. Indices are handed out on first sight and kept
/// for the lifetime of the store, even across removal and re-creation.
#[derive(Debug, Default)]
struct ServiceIndexer {
    assigned: HashMap<String, usize>,
    next: usize,
}

impl ServiceIndexer {
    fn index_for(&mut self, service_id: &str) -> usize {
        if let Some(index) = self.assigned.get(service_id) {
            return *index;
        }
        let index = self.next;
        self.next += 1;
        self.assigned.insert(service_id.to_string(), index);
        index
    }
}

/// State store
pub struct StateStore {
    state: Arc<ClusterState>,
    indexer: ServiceIndexer,
    revision: u64,
    notifier: watch::Sender<u64>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create an empty store at revision 0
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(0);
        Self {
            state: Arc::new(ClusterState::default()),
            indexer: ServiceIndexer::default(),
            revision: 0,
            notifier,
        }
    }

    /// Immutable view of the current state
    pub fn snapshot(&self) -> Arc<ClusterState> {
        Arc::clone(&self.state)
    }

    /// Number of payloads applied so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Receive the revision after every applied payload
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    /// Reconcile a payload into the store.
    ///
    /// A payload that fails validation is rejected whole: nothing mutates
    /// and subscribers are not notified.
    pub fn apply_update(&mut self, payload: UpdatePayload) -> Result<ApplyReport> {
        payload.validate()?;

        let mut report = ApplyReport {
            full: payload.is_full(),
            ..Default::default()
        };

        let state = Arc::make_mut(&mut self.state);

        match payload {
            UpdatePayload::Full(Snapshot {
                cluster_name,
                nodes,
                services,
                tasks,
                networks,
            }) => {
                state.cluster_name = cluster_name;
                let keep = KeepSets::from_lists(&nodes, &services, &tasks, &networks);
                upsert_all(state, &mut self.indexer, networks, services, nodes, tasks, &mut report);
                report.removed += prune(state, &keep);
            }
            UpdatePayload::Delta(Delta {
                cluster_name,
                nodes,
                services,
                tasks,
                networks,
                removed,
            }) => {
                if cluster_name.is_some() {
                    state.cluster_name = cluster_name;
                }
                upsert_all(state, &mut self.indexer, networks, services, nodes, tasks, &mut report);
                report.removed += remove_listed(state, &removed);
            }
        }

        report.removed += enforce_integrity(state, &mut report.dropped);

        self.revision += 1;
        report.revision = self.revision;
        self.notifier.send_replace(self.revision);

        debug!(
            revision = report.revision,
            full = report.full,
            upserted = report.upserted,
            removed = report.removed,
            dropped = report.dropped.len(),
            "Applied update"
        );

        Ok(report)
    }
}

fn upsert_all(
    state: &mut ClusterState,
    indexer: &mut ServiceIndexer,
    networks: Vec<Network>,
    services: Vec<Service>,
    nodes: Vec<Node>,
    tasks: Vec<Task>,
    report: &mut ApplyReport,
) {
    for network in networks {
        state.networks.insert(network.id.clone(), network);
        report.upserted += 1;
    }

    for mut service in services {
        service.index = indexer.index_for(&service.id);
        state.services.insert(service.id.clone(), service);
        report.upserted += 1;
    }

    for mut node in nodes {
        match state.nodes.get_mut(&node.id) {
            Some(existing) => existing.merge_from(node),
            None => {
                node.task_ids.clear();
                state.nodes.insert(node.id.clone(), node);
            }
        }
        report.upserted += 1;
    }

    for task in tasks {
        match upsert_task(state, task) {
            Ok(()) => report.upserted += 1,
            Err(dropped) => report.dropped.push(dropped),
        }
    }
}

/// Insert or update a task, keeping node task lists in step.
///
/// A task whose references don't resolve is dropped, including any
/// previously stored version of it.
fn upsert_task(state: &mut ClusterState, task: Task) -> std::result::Result<(), DroppedTask> {
    let reason = if !state.nodes.contains_key(&task.node_id) {
        Some(DropReason::UnknownNode(task.node_id.clone()))
    } else if !state.services.contains_key(&task.service_id) {
        Some(DropReason::UnknownService(task.service_id.clone()))
    } else {
        None
    };

    if let Some(reason) = reason {
        remove_task(state, &task.id);
        warn!(task_id = %task.id, %reason, "Dropping task with unresolved reference");
        return Err(DroppedTask {
            task_id: task.id,
            reason,
        });
    }

    if let Some(previous) = state.tasks.get(&task.id) {
        if previous.node_id != task.node_id {
            let old_node = previous.node_id.clone();
            if let Some(node) = state.nodes.get_mut(&old_node) {
                node.detach_task(&task.id);
            }
        }
    }

    if let Some(node) = state.nodes.get_mut(&task.node_id) {
        node.attach_task(&task.id);
    }
    state.tasks.insert(task.id.clone(), task);
    Ok(())
}

fn remove_task(state: &mut ClusterState, task_id: &str) -> bool {
    match state.tasks.remove(task_id) {
        Some(task) => {
            if let Some(node) = state.nodes.get_mut(&task.node_id) {
                node.detach_task(task_id);
            }
            true
        }
        None => false,
    }
}

/// IDs named by a full snapshot; everything else gets pruned
struct KeepSets {
    nodes: HashSet<String>,
    services: HashSet<String>,
    tasks: HashSet<String>,
    networks: HashSet<String>,
}

impl KeepSets {
    fn from_lists(nodes: &[Node], services: &[Service], tasks: &[Task], networks: &[Network]) -> Self {
        Self {
            nodes: nodes.iter().map(|n| n.id.clone()).collect(),
            services: services.iter().map(|s| s.id.clone()).collect(),
            tasks: tasks.iter().map(|t| t.id.clone()).collect(),
            networks: networks.iter().map(|n| n.id.clone()).collect(),
        }
    }
}

fn prune(state: &mut ClusterState, keep: &KeepSets) -> usize {
    let stale_tasks: Vec<String> = state
        .tasks
        .keys()
        .filter(|id| !keep.tasks.contains(*id))
        .cloned()
        .collect();

    let mut removed = 0;
    for id in &stale_tasks {
        if remove_task(state, id) {
            removed += 1;
        }
    }

    let before = state.nodes.len() + state.services.len() + state.networks.len();
    state.nodes.retain(|id, _| keep.nodes.contains(id));
    state.services.retain(|id, _| keep.services.contains(id));
    state.networks.retain(|id, _| keep.networks.contains(id));
    let after = state.nodes.len() + state.services.len() + state.networks.len();

    removed + (before - after)
}

fn remove_listed(state: &mut ClusterState, removed: &Removed) -> usize {
    let mut count = 0;
    for id in &removed.tasks {
        if remove_task(state, id) {
            count += 1;
        }
    }
    for id in &removed.nodes {
        if state.nodes.remove(id).is_some() {
            count += 1;
        }
    }
    for id in &removed.services {
        if state.services.remove(id).is_some() {
            count += 1;
        }
    }
    for id in &removed.networks {
        if state.networks.remove(id).is_some() {
            count += 1;
        }
    }
    count
}

/// Drop tasks left pointing at a node or service that was removed
fn enforce_integrity(state: &mut ClusterState, dropped: &mut Vec<DroppedTask>) -> usize {
    let orphans: Vec<DroppedTask> = state
        .tasks
        .values()
        .filter_map(|task| {
            let reason = if !state.nodes.contains_key(&task.node_id) {
                DropReason::UnknownNode(task.node_id.clone())
            } else if !state.services.contains_key(&task.service_id) {
                DropReason::UnknownService(task.service_id.clone())
            } else {
                return None;
            };
            Some(DroppedTask {
                task_id: task.id.clone(),
                reason,
            })
        })
        .collect();

    let count = orphans.len();
    for orphan in orphans {
        warn!(task_id = %orphan.task_id, reason = %orphan.reason, "Dropping orphaned task");
        remove_task(state, &orphan.task_id);
        dropped.push(orphan);
    }
    count
}
