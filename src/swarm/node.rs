//! Swarm node model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node role in the swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Worker node
    #[default]
    Worker,
    /// Manager node
    Manager,
}

/// Node readiness as reported by the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Node is unknown
    #[default]
    Unknown,
    /// Node is down
    Down,
    /// Node is ready
    Ready,
    /// Node is disconnected
    Disconnected,
}

/// Node availability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAvailability {
    /// Node is active
    #[default]
    Active,
    /// Node is paused
    Pause,
    /// Node is draining
    Drain,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Worker => write!(f, "worker"),
            NodeRole::Manager => write!(f, "manager"),
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Unknown => write!(f, "unknown"),
            NodeState::Down => write!(f, "down"),
            NodeState::Ready => write!(f, "ready"),
            NodeState::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl std::fmt::Display for NodeAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeAvailability::Active => write!(f, "active"),
            NodeAvailability::Pause => write!(f, "pause"),
            NodeAvailability::Drain => write!(f, "drain"),
        }
    }
}

/// Swarm node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node ID
    pub id: String,
    /// Node hostname
    pub hostname: String,
    /// Node role
    #[serde(default)]
    pub role: NodeRole,
    /// Node availability
    #[serde(default)]
    pub availability: NodeAvailability,
    /// Node readiness
    #[serde(default)]
    pub status: NodeState,
    /// Whether this manager currently leads the raft group
    #[serde(default)]
    pub leader: bool,
    /// CPU architecture
    #[serde(default)]
    pub platform_architecture: String,
    /// Operating system
    #[serde(default)]
    pub platform_os: Option<String>,
    /// Total CPU in nano-CPUs
    #[serde(default)]
    pub nano_cpus: i64,
    /// Total memory in bytes
    #[serde(default)]
    pub memory_bytes: i64,
    /// Node labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Tasks placed on this node, in order of first placement.
    /// Maintained by the store; never read from the wire.
    #[serde(skip_deserializing, default)]
    pub task_ids: Vec<String>,
}

impl Node {
    /// Create a node with default description fields
    pub fn new(id: &str, hostname: &str) -> Self {
        Self {
            id: id.to_string(),
            hostname: hostname.to_string(),
            role: NodeRole::Worker,
            availability: NodeAvailability::Active,
            status: NodeState::Ready,
            leader: false,
            platform_architecture: String::new(),
            platform_os: None,
            nano_cpus: 0,
            memory_bytes: 0,
            labels: HashMap::new(),
            task_ids: Vec::new(),
        }
    }

    /// Check if node is a manager
    pub fn is_manager(&self) -> bool {
        self.role == NodeRole::Manager
    }

    /// Check if node is leader
    pub fn is_leader(&self) -> bool {
        self.is_manager() && self.leader
    }

    /// Check if node is ready
    pub fn is_ready(&self) -> bool {
        self.status == NodeState::Ready
    }

    /// Check if node is available for scheduling
    pub fn is_available(&self) -> bool {
        self.is_ready() && self.availability == NodeAvailability::Active
    }

    /// Total CPU in fractional cores
    pub fn cpus(&self) -> f64 {
        self.nano_cpus as f64 / 1e9
    }

    /// Replace the wire-carried description, keeping the store-maintained task list.
    pub(crate) fn merge_from(&mut self, incoming: Node) {
        let task_ids = std::mem::take(&mut self.task_ids);
        *self = incoming;
        self.task_ids = task_ids;
    }

    /// Record a task placement; a task already present keeps its position.
    pub(crate) fn attach_task(&mut self, task_id: &str) {
        if !self.task_ids.iter().any(|id| id == task_id) {
            self.task_ids.push(task_id.to_string());
        }
    }

    pub(crate) fn detach_task(&mut self, task_id: &str) {
        self.task_ids.retain(|id| id != task_id);
    }
}
