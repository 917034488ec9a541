//! Derived views
//!
//! Pure functions from a store snapshot and a [`ViewConfig`] to the rows a
//! dashboard renders. Nothing here is cached; every call recomputes from the
//! snapshot it is given.

pub mod aggregate;
pub mod filter;
pub mod sort;

pub use aggregate::{node_usage, ResourceUsage};
pub use filter::{ModeInclusion, Selection, ViewFilter, NO_NETWORK};
pub use sort::{ModeOrder, SortBy};

use crate::store::ClusterState;
use crate::swarm::{Node, Service, Task};
use serde::{Deserialize, Serialize};

/// Filter and sort configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub filter: ViewFilter,
    pub sort_by: SortBy,
    pub mode_order: ModeOrder,
}

/// A task joined with its service
#[derive(Debug, Clone, Copy)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub service: &'a Service,
}

/// One node with its visible tasks and aggregated resources
#[derive(Debug, Clone)]
pub struct NodeView<'a> {
    pub node: &'a Node,
    /// Tasks passing the filter, sorted
    pub tasks: Vec<TaskRow<'a>>,
    /// Tasks on the node before filtering
    pub total_tasks: usize,
    /// Reservations and limits over all tasks on the node
    pub usage: ResourceUsage,
}

/// Every node, ordered by hostname then ID
#[derive(Debug, Clone, Default)]
pub struct DashboardView<'a> {
    pub nodes: Vec<NodeView<'a>>,
}

impl DashboardView<'_> {
    /// Tasks shown across all nodes
    pub fn visible_tasks(&self) -> usize {
        self.nodes.iter().map(|n| n.tasks.len()).sum()
    }

    /// Tasks known across all nodes
    pub fn total_tasks(&self) -> usize {
        self.nodes.iter().map(|n| n.total_tasks).sum()
    }
}

/// Build the view of a single node
pub fn node_view<'a>(state: &'a ClusterState, node: &'a Node, config: &ViewConfig) -> NodeView<'a> {
    let all: Vec<TaskRow<'a>> = state
        .tasks_on(node)
        .map(|(task, service)| TaskRow { task, service })
        .collect();
    let total_tasks = all.len();

    let mut tasks: Vec<TaskRow<'a>> = all
        .into_iter()
        .filter(|row| config.filter.matches(row.task, row.service))
        .collect();
    sort::sort_rows(&mut tasks, config.sort_by, config.mode_order);

    NodeView {
        node,
        tasks,
        total_tasks,
        usage: node_usage(state, node),
    }
}

/// Build the view of every node
pub fn build_dashboard<'a>(state: &'a ClusterState, config: &ViewConfig) -> DashboardView<'a> {
    let mut nodes: Vec<&'a Node> = state.nodes().collect();
    nodes.sort_by(|a, b| a.hostname.cmp(&b.hostname).then_with(|| a.id.cmp(&b.id)));

    DashboardView {
        nodes: nodes
            .into_iter()
            .map(|node| node_view(state, node, config))
            .collect(),
    }
}
