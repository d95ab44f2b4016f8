//! Reconciles a declared storage update against live hypervisor state
//! before the update is issued.
//!
//! The only adjustment currently made is cloud-init seed disk
//! preservation: queued deletions that would destroy an auto-managed seed
//! disk are withdrawn.

pub mod cloudinit;

pub use cloudinit::{preserve_cloud_init, reconcile_storage_update};
