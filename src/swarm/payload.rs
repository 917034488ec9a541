//! Update payloads pushed over the channel
//!
//! A payload is either a full snapshot, which replaces everything the store
//! knows, or a delta, which is merged. The distinction travels in the `kind`
//! tag; anything without a known tag is rejected at parse time.

use super::network::Network;
use super::node::Node;
use super::service::Service;
use super::task::Task;
use crate::error::{Result, SwarmViewError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Prefix of the message the server sends when the session is not authorized
pub const UNAUTHORIZED_MARKER: &str = "401-Unauthorized";

/// Check whether a raw channel message is the unauthorized marker
pub fn is_unauthorized_marker(message: &str) -> bool {
    message.starts_with(UNAUTHORIZED_MARKER)
}

/// State update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UpdatePayload {
    /// Authoritative replacement of all entity state
    Full(Snapshot),
    /// Incremental change against existing state
    Delta(Delta),
}

/// Full snapshot; all four entity lists are required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub cluster_name: Option<String>,
    pub nodes: Vec<Node>,
    pub services: Vec<Service>,
    pub tasks: Vec<Task>,
    pub networks: Vec<Network>,
}

/// Delta; lists that are absent mean "nothing changed"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub removed: Removed,
}

/// IDs explicitly removed by a delta
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removed {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
}

impl Removed {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.services.is_empty()
            && self.tasks.is_empty()
            && self.networks.is_empty()
    }
}

/// Borrowed view over the upserted entities of either payload kind
pub(crate) struct Entities<'a> {
    pub nodes: &'a [Node],
    pub services: &'a [Service],
    pub tasks: &'a [Task],
    pub networks: &'a [Network],
}

impl UpdatePayload {
    /// Parse a channel message into a payload
    pub fn parse(message: &str) -> Result<Self> {
        serde_json::from_str(message).map_err(|e| SwarmViewError::MalformedPayload(e.to_string()))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, UpdatePayload::Full(_))
    }

    pub fn cluster_name(&self) -> Option<&str> {
        match self {
            UpdatePayload::Full(s) => s.cluster_name.as_deref(),
            UpdatePayload::Delta(d) => d.cluster_name.as_deref(),
        }
    }

    pub(crate) fn entities(&self) -> Entities<'_> {
        match self {
            UpdatePayload::Full(s) => Entities {
                nodes: &s.nodes,
                services: &s.services,
                tasks: &s.tasks,
                networks: &s.networks,
            },
            UpdatePayload::Delta(d) => Entities {
                nodes: &d.nodes,
                services: &d.services,
                tasks: &d.tasks,
                networks: &d.networks,
            },
        }
    }

    /// Reject payloads whose entity lists carry empty or repeated IDs
    pub fn validate(&self) -> Result<()> {
        let entities = self.entities();
        check_ids("node", entities.nodes.iter().map(|n| n.id.as_str()))?;
        check_ids("service", entities.services.iter().map(|s| s.id.as_str()))?;
        check_ids("task", entities.tasks.iter().map(|t| t.id.as_str()))?;
        check_ids("network", entities.networks.iter().map(|n| n.id.as_str()))?;
        Ok(())
    }
}

fn check_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() {
            return Err(SwarmViewError::InvalidPayload(format!("{} with empty id", kind)));
        }
        if !seen.insert(id) {
            return Err(SwarmViewError::InvalidPayload(format!(
                "duplicate {} id {}",
                kind, id
            )));
        }
    }
    Ok(())
}
