//! Immutable cluster state handed out by the store

use crate::swarm::{Network, Node, Service, Task};
use std::collections::BTreeMap;

/// Reconciled cluster state.
///
/// Readers only ever see this through an `Arc` obtained from
/// [`StateStore::snapshot`](super::StateStore::snapshot); the store mutates
/// its own copy, so a snapshot never changes underneath its holder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterState {
    pub(crate) cluster_name: Option<String>,
    pub(crate) nodes: BTreeMap<String, Node>,
    pub(crate) services: BTreeMap<String, Service>,
    pub(crate) tasks: BTreeMap<String, Task>,
    pub(crate) networks: BTreeMap<String, Network>,
}

impl ClusterState {
    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn network(&self, id: &str) -> Option<&Network> {
        self.networks.get(id)
    }

    /// Nodes ordered by ID
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Services ordered by ID
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Tasks ordered by ID
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Networks ordered by ID
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Tasks on a node paired with their service, in placement order
    pub fn tasks_on<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = (&'a Task, &'a Service)> + 'a {
        node.task_ids.iter().filter_map(move |id| {
            let task = self.tasks.get(id)?;
            let service = self.services.get(&task.service_id)?;
            Some((task, service))
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.services.is_empty()
            && self.tasks.is_empty()
            && self.networks.is_empty()
    }
}
