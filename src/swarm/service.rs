//! Swarm service model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Swarm service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Service ID
    pub id: String,
    /// Service name
    pub name: String,
    /// Scheduling mode
    pub mode: ServiceMode,
    /// Container image reference, possibly pinned by digest
    #[serde(default)]
    pub image: String,
    /// Environment variables (`KEY=value`)
    #[serde(default)]
    pub env: Vec<String>,
    /// Mounts
    #[serde(default)]
    pub mounts: Vec<Mount>,
    /// Config references
    #[serde(default)]
    pub configs: Vec<ConfigReference>,
    /// Secret references
    #[serde(default)]
    pub secrets: Vec<SecretReference>,
    /// Labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Resource reservations and limits
    #[serde(default)]
    pub resources: ResourceRequirements,
    /// Attached network IDs
    #[serde(default)]
    pub networks: Vec<String>,
    /// Created timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Updated timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Order of first sight, assigned by the store and used for styling only
    #[serde(skip_deserializing, default)]
    pub index: usize,
}

impl Service {
    /// Create a service with an empty container spec
    pub fn new(id: &str, name: &str, mode: ServiceMode) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mode,
            image: String::new(),
            env: Vec::new(),
            mounts: Vec::new(),
            configs: Vec::new(),
            secrets: Vec::new(),
            labels: HashMap::new(),
            resources: ResourceRequirements::default(),
            networks: Vec::new(),
            created_at: None,
            updated_at: None,
            index: 0,
        }
    }

    /// Get replica count; global services have no fixed target
    pub fn replicas(&self) -> Option<u64> {
        match self.mode {
            ServiceMode::Replicated { replicas } => Some(replicas),
            ServiceMode::Global => None,
        }
    }

    /// Mode discriminant
    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Image reference with any `@sha256:...` digest removed
    pub fn image_without_digest(&self) -> &str {
        self.image.split('@').next().unwrap_or(&self.image)
    }

    /// Palette slot for this service given a palette of `palette_len` colors
    pub fn color_slot(&self, palette_len: usize) -> usize {
        if palette_len == 0 {
            return 0;
        }
        self.index % palette_len
    }

    /// Whether the service is attached to no network at all
    pub fn has_no_networks(&self) -> bool {
        self.networks.is_empty()
    }
}

/// Service mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Replicated service
    Replicated { replicas: u64 },
    /// Global service (one per node)
    Global,
}

impl ServiceMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            ServiceMode::Replicated { .. } => ModeKind::Replicated,
            ServiceMode::Global => ModeKind::Global,
        }
    }
}

/// Service mode without its per-mode payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Global,
    Replicated,
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeKind::Global => write!(f, "global"),
            ModeKind::Replicated => write!(f, "replicated"),
        }
    }
}

/// Mount configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    /// Target
    pub target: String,
    /// Type
    #[serde(rename = "type")]
    pub mount_type: String,
    /// Read only
    #[serde(default)]
    pub read_only: bool,
}

/// Secret reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretReference {
    /// Secret ID
    pub secret_id: String,
    /// Secret name
    pub secret_name: String,
}

/// Config reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigReference {
    /// Config ID
    pub config_id: String,
    /// Config name
    pub config_name: String,
}

/// Resource requirements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Limits
    #[serde(default)]
    pub limits: Option<ResourceSpec>,
    /// Reservations
    #[serde(default)]
    pub reservations: Option<ResourceSpec>,
}

/// Resource specification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU in nanoCPUs
    #[serde(default)]
    pub nano_cpus: Option<i64>,
    /// Memory in bytes
    #[serde(default)]
    pub memory_bytes: Option<i64>,
}

impl ResourceRequirements {
    /// Reserved nano-CPUs, zero when unset
    pub fn reserved_nano_cpus(&self) -> i64 {
        self.reservations.and_then(|r| r.nano_cpus).unwrap_or(0)
    }

    /// Reserved memory, zero when unset
    pub fn reserved_memory_bytes(&self) -> i64 {
        self.reservations.and_then(|r| r.memory_bytes).unwrap_or(0)
    }

    /// CPU limit in nano-CPUs, zero when unset
    pub fn limit_nano_cpus(&self) -> i64 {
        self.limits.and_then(|r| r.nano_cpus).unwrap_or(0)
    }

    /// Memory limit, zero when unset
    pub fn limit_memory_bytes(&self) -> i64 {
        self.limits.and_then(|r| r.memory_bytes).unwrap_or(0)
    }
}
