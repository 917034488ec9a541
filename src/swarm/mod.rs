//! Docker Swarm compatible cluster model
//!
//! Nodes, services, tasks and networks as they arrive over the push
//! channel, plus the update payloads that carry them.

pub mod network;
pub mod node;
pub mod payload;
pub mod service;
pub mod task;

pub use network::Network;
pub use node::{Node, NodeAvailability, NodeRole, NodeState};
pub use payload::{Delta, Removed, Snapshot, UpdatePayload, UNAUTHORIZED_MARKER};
pub use service::{ModeKind, ResourceRequirements, ResourceSpec, Service, ServiceMode};
pub use task::{Task, TaskState};
