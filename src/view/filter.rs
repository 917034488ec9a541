//! Task filters

use crate::store::ClusterState;
use crate::swarm::{ModeKind, Network, Service, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Network selection token matching services attached to no network
pub const NO_NETWORK: &str = "(none)";

/// Which service modes are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeInclusion {
    pub global: bool,
    pub replicated: bool,
}

impl Default for ModeInclusion {
    fn default() -> Self {
        Self {
            global: true,
            replicated: true,
        }
    }
}

impl ModeInclusion {
    pub fn global_only() -> Self {
        Self {
            global: true,
            replicated: false,
        }
    }

    pub fn replicated_only() -> Self {
        Self {
            global: false,
            replicated: true,
        }
    }

    pub fn includes(&self, kind: ModeKind) -> bool {
        match kind {
            ModeKind::Global => self.global,
            ModeKind::Replicated => self.replicated,
        }
    }
}

/// Either everything, or an explicit set of IDs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(ids.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(ids) => ids.contains(id),
        }
    }
}

/// Filter configuration; all criteria must pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewFilter {
    /// Matched against service name (case-insensitive substring), or as a
    /// prefix of the task ID or container ID
    pub text: String,
    pub modes: ModeInclusion,
    pub services: Selection,
    /// Network IDs; [`NO_NETWORK`] selects services without networks
    pub networks: Selection,
}

impl ViewFilter {
    /// Whether a task, joined with its service, passes every criterion
    pub fn matches(&self, task: &Task, service: &Service) -> bool {
        self.matches_text(task, service)
            && self.modes.includes(service.mode_kind())
            && self.services.contains(&service.id)
            && self.matches_networks(service)
    }

    fn matches_text(&self, task: &Task, service: &Service) -> bool {
        let needle = self.text.trim();
        if needle.is_empty() {
            return true;
        }

        service.name.to_lowercase().contains(&needle.to_lowercase())
            || task.id.starts_with(needle)
            || task
                .container_id
                .as_deref()
                .is_some_and(|id| id.starts_with(needle))
    }

    fn matches_networks(&self, service: &Service) -> bool {
        match &self.networks {
            Selection::All => true,
            Selection::Only(ids) => {
                if service.has_no_networks() {
                    ids.contains(NO_NETWORK)
                } else {
                    service.networks.iter().any(|n| ids.contains(n))
                }
            }
        }
    }

    /// Services a selection can choose from, by name
    pub fn available_services(state: &ClusterState) -> Vec<&Service> {
        let mut services: Vec<&Service> = state.services().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        services
    }

    /// Networks a selection can choose from, by name
    pub fn available_networks(state: &ClusterState) -> Vec<&Network> {
        let mut networks: Vec<&Network> = state.networks().collect();
        networks.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        networks
    }
}
