//! Clients for the hypervisor management API.
//!
//! The reconciler only consumes the [`ConfigSource`] boundary; [`PveClient`]
//! is the production implementation backed by the Proxmox VE HTTP API.

pub mod pve;

pub use pve::{LiveConfig, PveClient, PveError, VmRef};

use anyhow::Result;
use async_trait::async_trait;

/// Read access to a guest's live configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the guest's current attribute map from the hypervisor.
    ///
    /// Fails when the guest cannot be reached or no longer exists.
    async fn current_config(&self, vm: &VmRef) -> Result<LiveConfig>;
}
