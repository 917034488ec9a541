//! swarmview - a live dashboard for swarm clusters
//!
//! swarmview keeps a local model of a cluster's nodes, services, tasks and
//! networks in step with a server-pushed update stream, and derives a
//! filtered, sorted, per-node view of it:
//!
//! - Push channel client with exponential reconnect backoff
//! - State store reconciling full snapshots and deltas
//! - View pipeline: filtering, ordering, per-node resource totals
//! - Terminal User Interface (TUI)

pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod swarm;
pub mod tui;
pub mod view;

pub use error::{Result, SwarmViewError};
