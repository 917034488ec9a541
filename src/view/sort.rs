//! Task ordering

use super::TaskRow;
use crate::swarm::ModeKind;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Secondary sort key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Task creation time, oldest first
    #[default]
    Created,
    /// Service name, case-sensitive
    ServiceName,
}

impl SortBy {
    pub fn toggled(self) -> Self {
        match self {
            SortBy::Created => SortBy::ServiceName,
            SortBy::ServiceName => SortBy::Created,
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortBy::Created => write!(f, "created"),
            SortBy::ServiceName => write!(f, "service name"),
        }
    }
}

/// Primary sort key: which service mode comes first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOrder {
    #[default]
    GlobalFirst,
    ReplicatedFirst,
}

impl ModeOrder {
    pub fn toggled(self) -> Self {
        match self {
            ModeOrder::GlobalFirst => ModeOrder::ReplicatedFirst,
            ModeOrder::ReplicatedFirst => ModeOrder::GlobalFirst,
        }
    }

    fn rank(self, kind: ModeKind) -> u8 {
        match (self, kind) {
            (ModeOrder::GlobalFirst, ModeKind::Global) => 0,
            (ModeOrder::GlobalFirst, ModeKind::Replicated) => 1,
            (ModeOrder::ReplicatedFirst, ModeKind::Replicated) => 0,
            (ModeOrder::ReplicatedFirst, ModeKind::Global) => 1,
        }
    }
}

/// Compare two rows by service mode, then by the secondary key
pub fn compare(a: &TaskRow<'_>, b: &TaskRow<'_>, sort_by: SortBy, mode_order: ModeOrder) -> Ordering {
    let by_mode = mode_order
        .rank(a.service.mode_kind())
        .cmp(&mode_order.rank(b.service.mode_kind()));

    by_mode.then_with(|| match sort_by {
        SortBy::Created => a.task.created_at.cmp(&b.task.created_at),
        SortBy::ServiceName => a.service.name.cmp(&b.service.name),
    })
}

/// Stable sort; rows equal on both keys keep their relative order
pub fn sort_rows(rows: &mut [TaskRow<'_>], sort_by: SortBy, mode_order: ModeOrder) {
    rows.sort_by(|a, b| compare(a, b, sort_by, mode_order));
}
