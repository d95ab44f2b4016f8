//! Caller-owned pending storage update structures.
//!
//! A [`StorageUpdate`] collects the per-slot changes a config diff wants to
//! apply in one update call. Presence of an entry means a mutation is
//! queued for that slot; removing the entry withdraws the mutation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slot::{Bus, SlotId};

/// One queued change for a single disk slot.
///
/// `params` carries the already-rendered disk config line for the slot
/// (rendering is the diff layer's job, not ours); `delete` queues the slot
/// for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChange {
    pub params: Option<String>,
    pub delete: bool,
}

impl SlotChange {
    /// A change that only queues the slot for deletion.
    pub fn deletion() -> Self {
        Self {
            params: None,
            delete: true,
        }
    }
}

/// Pending changes for one bus, keyed by slot index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusChanges {
    slots: BTreeMap<u8, SlotChange>,
}

impl BusChanges {
    pub fn set(&mut self, index: u8, change: SlotChange) {
        self.slots.insert(index, change);
    }

    pub fn get(&self, index: u8) -> Option<&SlotChange> {
        self.slots.get(&index)
    }

    /// Withdraw the queued change for a slot, if any.
    pub fn clear(&mut self, index: u8) -> Option<SlotChange> {
        self.slots.remove(&index)
    }

    /// Whether the slot currently has a queued deletion.
    pub fn delete_requested(&self, index: u8) -> bool {
        self.slots.get(&index).is_some_and(|c| c.delete)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &SlotChange)> {
        self.slots.iter().map(|(index, change)| (*index, change))
    }
}

/// All pending disk changes for one guest update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUpdate {
    pub ide: BusChanges,
    pub sata: BusChanges,
    pub scsi: BusChanges,
}

impl StorageUpdate {
    pub fn bus(&self, bus: Bus) -> &BusChanges {
        match bus {
            Bus::Ide => &self.ide,
            Bus::Sata => &self.sata,
            Bus::Scsi => &self.scsi,
        }
    }

    pub fn bus_mut(&mut self, bus: Bus) -> &mut BusChanges {
        match bus {
            Bus::Ide => &mut self.ide,
            Bus::Sata => &mut self.sata,
            Bus::Scsi => &mut self.scsi,
        }
    }

    /// Queue a change for a slot, replacing any previous one.
    pub fn queue(&mut self, slot: SlotId, change: SlotChange) {
        self.bus_mut(slot.bus()).set(slot.index(), change);
    }

    pub fn get(&self, slot: SlotId) -> Option<&SlotChange> {
        self.bus(slot.bus()).get(slot.index())
    }

    /// Withdraw the queued change for a slot, if any.
    pub fn clear(&mut self, slot: SlotId) -> Option<SlotChange> {
        self.bus_mut(slot.bus()).clear(slot.index())
    }

    pub fn is_empty(&self) -> bool {
        self.ide.is_empty() && self.sata.is_empty() && self.scsi.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> SlotId {
        s.parse().unwrap()
    }

    #[test]
    fn queue_get_clear() {
        let mut update = StorageUpdate::default();
        assert!(update.is_empty());

        update.queue(slot("ide3"), SlotChange::deletion());
        assert!(update.get(slot("ide3")).is_some());
        assert!(update.ide.delete_requested(3));
        assert!(!update.ide.delete_requested(2));

        let removed = update.clear(slot("ide3")).unwrap();
        assert!(removed.delete);
        assert!(update.is_empty());
    }

    #[test]
    fn buses_are_independent() {
        let mut update = StorageUpdate::default();
        update.queue(slot("ide0"), SlotChange::deletion());
        update.queue(
            slot("scsi0"),
            SlotChange {
                params: Some("local-lvm:32".to_string()),
                delete: false,
            },
        );

        assert!(update.get(slot("ide0")).is_some());
        assert!(update.get(slot("scsi0")).is_some());
        assert!(update.get(slot("sata0")).is_none());

        update.clear(slot("ide0"));
        assert!(update.get(slot("scsi0")).is_some());
    }

    #[test]
    fn delete_requested_needs_the_flag() {
        let mut changes = BusChanges::default();
        changes.set(
            1,
            SlotChange {
                params: Some("local:8".to_string()),
                delete: false,
            },
        );
        assert!(!changes.delete_requested(1));
    }
}
