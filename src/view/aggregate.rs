//! Per-node resource aggregation
//!
//! Always recomputed from the node's current tasks; there are no running
//! counters to fall out of step with the store.

use crate::store::ClusterState;
use crate::swarm::{Node, ResourceRequirements};

/// Summed reservations and limits of every task on a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub reserved_nano_cpus: i64,
    pub reserved_memory_bytes: i64,
    pub limit_nano_cpus: i64,
    pub limit_memory_bytes: i64,
}

impl ResourceUsage {
    pub fn reserved_cpus(&self) -> f64 {
        self.reserved_nano_cpus as f64 / 1e9
    }

    pub fn limit_cpus(&self) -> f64 {
        self.limit_nano_cpus as f64 / 1e9
    }

    fn add(&mut self, resources: &ResourceRequirements) {
        self.reserved_nano_cpus = self.reserved_nano_cpus.saturating_add(resources.reserved_nano_cpus());
        self.reserved_memory_bytes = self
            .reserved_memory_bytes
            .saturating_add(resources.reserved_memory_bytes());
        self.limit_nano_cpus = self.limit_nano_cpus.saturating_add(resources.limit_nano_cpus());
        self.limit_memory_bytes = self.limit_memory_bytes.saturating_add(resources.limit_memory_bytes());
    }
}

/// Sum the service specs of every task assigned to `node`, filtered or not
pub fn node_usage(state: &ClusterState, node: &Node) -> ResourceUsage {
    let mut usage = ResourceUsage::default();
    for (_, service) in state.tasks_on(node) {
        usage.add(&service.resources);
    }
    usage
}
