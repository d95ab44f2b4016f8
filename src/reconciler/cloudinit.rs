//! Cloud-init seed disk preservation.
//!
//! The hypervisor creates small provisioning seed disks when cloud-init
//! parameters are set, and cloned guests inherit them from templates. The
//! declared configuration never lists these disks, so a config diff tends
//! to queue their slots for deletion. This pass inspects the guest's live
//! configuration and withdraws such deletions so the seed disk survives
//! the update.

use anyhow::Result;
use tracing::info;

use crate::clients::{ConfigSource, LiveConfig, VmRef};
use crate::slot::{Bus, SlotId};
use crate::storage::StorageUpdate;

/// Substring marking a live volume as a cloud-init seed disk. Volume ids
/// look like `local-lvm:vm-100-cloudinit` or `local:cloudinit`.
const CLOUD_INIT_MARKER: &str = "cloudinit";

/// IDE slots the hypervisor conventionally auto-places seed disks on.
const AUTO_SEED_SLOTS: [u8; 2] = [2, 3];

/// Adjust a pending storage update so existing cloud-init seed disks
/// survive the update call.
///
/// Fetches the guest's live configuration exactly once, then runs the
/// in-memory preservation pass. A failed fetch aborts the whole pass: the
/// error is propagated as-is and no queued change is touched.
pub async fn reconcile_storage_update(
    source: &(impl ConfigSource + ?Sized),
    vm: &VmRef,
    update: &mut StorageUpdate,
    cloud_init_declared: bool,
) -> Result<()> {
    let live = source.current_config(vm).await?;
    preserve_cloud_init(&live, update, cloud_init_declared);
    Ok(())
}

/// Withdraw queued changes for slots whose live volume is a cloud-init
/// seed disk.
///
/// Every bounded slot on every bus is classified independently. Slots that
/// are absent from the snapshot, hold a non-string value, or hold a volume
/// without the cloud-init marker are left alone; unexpected shapes are
/// never an error. With `cloud_init_declared` set, the conventional IDE
/// auto-placement slots additionally get their queued deletions withdrawn
/// even when the diff knows nothing about the slot beyond the delete
/// intent.
pub fn preserve_cloud_init(
    live: &LiveConfig,
    update: &mut StorageUpdate,
    cloud_init_declared: bool,
) {
    for bus in Bus::ALL {
        for slot in bus.slots() {
            preserve_slot(live, update, slot);
        }
    }

    if cloud_init_declared {
        preserve_auto_seed_slots(live, update);
    }
}

fn preserve_slot(live: &LiveConfig, update: &mut StorageUpdate, slot: SlotId) {
    if update.get(slot).is_none() {
        return;
    }

    let Some(volume) = live.volume(slot) else {
        // Nothing occupies the slot, so there is no drive to protect.
        return;
    };

    if volume.contains(CLOUD_INIT_MARKER) {
        info!(slot = %slot, volume = %volume, "keeping existing cloud-init drive");
        update.clear(slot);
    }
}

/// Auto-created seed disks land on ide2 or ide3. When the declared config
/// carries cloud-init parameters, keep a seed disk found on those slots if
/// the update would delete it.
fn preserve_auto_seed_slots(live: &LiveConfig, update: &mut StorageUpdate) {
    for slot in Bus::Ide
        .slots()
        .filter(|s| AUTO_SEED_SLOTS.contains(&s.index()))
    {
        let Some(volume) = live.volume(slot) else {
            continue;
        };
        if !volume.contains(CLOUD_INIT_MARKER) {
            continue;
        }
        if update.bus(Bus::Ide).delete_requested(slot.index()) {
            info!(slot = %slot, volume = %volume, "keeping auto-created cloud-init drive");
            update.clear(slot);
        }
    }
}
