//! Swarm task model

use super::service::Service;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Task is new
    #[default]
    New,
    /// Task is pending
    Pending,
    /// Task is assigned
    Assigned,
    /// Task is accepted
    Accepted,
    /// Task is preparing
    Preparing,
    /// Task is ready
    Ready,
    /// Task is starting
    Starting,
    /// Task is running
    Running,
    /// Task completed
    Complete,
    /// Task shutdown
    Shutdown,
    /// Task failed
    Failed,
    /// Task rejected
    Rejected,
    /// Task removed
    Remove,
    /// Task is orphaned
    Orphaned,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::New => "new",
            TaskState::Pending => "pending",
            TaskState::Assigned => "assigned",
            TaskState::Accepted => "accepted",
            TaskState::Preparing => "preparing",
            TaskState::Ready => "ready",
            TaskState::Starting => "starting",
            TaskState::Running => "running",
            TaskState::Complete => "complete",
            TaskState::Shutdown => "shutdown",
            TaskState::Failed => "failed",
            TaskState::Rejected => "rejected",
            TaskState::Remove => "remove",
            TaskState::Orphaned => "orphaned",
        };
        write!(f, "{}", s)
    }
}

/// Swarm task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task ID
    pub id: String,
    /// Node the task is placed on
    pub node_id: String,
    /// Owning service
    pub service_id: String,
    /// Observed state
    #[serde(default)]
    pub state: TaskState,
    /// Desired state
    #[serde(default)]
    pub desired_state: Option<TaskState>,
    /// Container ID, once the runtime has created one
    #[serde(default)]
    pub container_id: Option<String>,
    /// Slot (for replicated services)
    #[serde(default)]
    pub slot: Option<u64>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task placed on `node_id`
    pub fn new(id: &str, node_id: &str, service_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            node_id: node_id.to_string(),
            service_id: service_id.to_string(),
            state: TaskState::New,
            desired_state: None,
            container_id: None,
            slot: None,
            created_at,
            updated_at: None,
        }
    }

    /// Check if task is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            TaskState::Complete
                | TaskState::Failed
                | TaskState::Rejected
                | TaskState::Remove
                | TaskState::Orphaned
        )
    }

    /// Check if task is running
    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// First 12 characters of the container ID
    pub fn short_container_id(&self) -> &str {
        match self.container_id.as_deref() {
            Some(id) => truncate(id, 12),
            None => "",
        }
    }

    /// Slot, but only when the owning service is replicated
    pub fn effective_slot(&self, service: &Service) -> Option<u64> {
        service.replicas().and(self.slot)
    }

    /// `service.slot` for replicated tasks, `service.<id prefix>` otherwise
    pub fn display_name(&self, service: &Service) -> String {
        match self.effective_slot(service) {
            Some(slot) => format!("{}.{}", service.name, slot),
            None => format!("{}.{}", service.name, truncate(&self.id, 6)),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
