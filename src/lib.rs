//! pvesync — reconciles declarative QEMU guest storage updates against
//! live Proxmox VE state.
//!
//! A config diff that drives a guest update only knows about declared
//! disks. The hypervisor, however, auto-creates (or inherits from cloned
//! templates) cloud-init seed disks that the declared configuration never
//! lists, so the diff tends to queue those slots for deletion. Before an
//! update is issued, [`reconcile_storage_update`] reads the guest's live
//! configuration once and withdraws queued deletions that would destroy an
//! existing seed disk.

pub mod clients;
pub mod reconciler;
pub mod slot;
pub mod storage;

pub use clients::{ConfigSource, LiveConfig, PveClient, PveError, VmRef};
pub use reconciler::{preserve_cloud_init, reconcile_storage_update};
pub use slot::{Bus, SlotId};
pub use storage::{BusChanges, SlotChange, StorageUpdate};
