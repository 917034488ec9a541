//! Swarm network model

use serde::{Deserialize, Serialize};

/// Swarm-scoped network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network ID
    pub id: String,
    /// Network name
    pub name: String,
    /// Driver (overlay, macvlan, ...)
    #[serde(default)]
    pub driver: Option<String>,
    /// Scope
    #[serde(default)]
    pub scope: Option<String>,
}

impl Network {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            driver: None,
            scope: None,
        }
    }
}
