//! Disk slot addressing: storage buses and bounded slot identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage bus a disk slot hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    Ide,
    Sata,
    Scsi,
}

impl Bus {
    /// All supported buses, in traversal order.
    pub const ALL: [Bus; 3] = [Bus::Ide, Bus::Sata, Bus::Scsi];

    /// Number of addressable slots on this bus.
    pub fn slot_count(self) -> u8 {
        match self {
            Bus::Ide => 4,
            Bus::Sata => 6,
            Bus::Scsi => 4,
        }
    }

    /// Bus name as it appears in the hypervisor's slot keys.
    pub fn name(self) -> &'static str {
        match self {
            Bus::Ide => "ide",
            Bus::Sata => "sata",
            Bus::Scsi => "scsi",
        }
    }

    /// All valid slots on this bus.
    pub fn slots(self) -> impl Iterator<Item = SlotId> {
        (0..self.slot_count()).map(move |index| SlotId { bus: self, index })
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors constructing or parsing a slot identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot index {index} out of range on bus {bus}")]
    OutOfRange { bus: Bus, index: u8 },

    #[error("unknown bus in slot key: {0}")]
    UnknownBus(String),

    #[error("malformed slot key: {0}")]
    Malformed(String),
}

/// A disk attachment point on a specific bus, e.g. `ide2` or `sata0`.
///
/// Only in-range slots are representable; construction bound-checks the
/// index against the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    bus: Bus,
    index: u8,
}

impl SlotId {
    pub fn new(bus: Bus, index: u8) -> Result<Self, SlotError> {
        if index >= bus.slot_count() {
            return Err(SlotError::OutOfRange { bus, index });
        }
        Ok(Self { bus, index })
    }

    pub fn bus(self) -> Bus {
        self.bus
    }

    pub fn index(self) -> u8 {
        self.index
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bus.name(), self.index)
    }
}

impl FromStr for SlotId {
    type Err = SlotError;

    /// Parses the hypervisor's slot key format, e.g. `"ide2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| SlotError::Malformed(s.to_string()))?;
        let (name, index) = s.split_at(digits);

        let bus = match name {
            "ide" => Bus::Ide,
            "sata" => Bus::Sata,
            "scsi" => Bus::Scsi,
            _ => return Err(SlotError::UnknownBus(s.to_string())),
        };
        let index: u8 = index
            .parse()
            .map_err(|_| SlotError::Malformed(s.to_string()))?;

        SlotId::new(bus, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_hypervisor_keys() {
        let slot = SlotId::new(Bus::Ide, 2).unwrap();
        assert_eq!(slot.to_string(), "ide2");
        let slot = SlotId::new(Bus::Sata, 5).unwrap();
        assert_eq!(slot.to_string(), "sata5");
    }

    #[test]
    fn parse_round_trips() {
        for bus in Bus::ALL {
            for slot in bus.slots() {
                let parsed: SlotId = slot.to_string().parse().unwrap();
                assert_eq!(parsed, slot);
            }
        }
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert_eq!(
            SlotId::new(Bus::Ide, 4),
            Err(SlotError::OutOfRange {
                bus: Bus::Ide,
                index: 4
            })
        );
        assert!("sata6".parse::<SlotId>().is_err());
        assert!("scsi4".parse::<SlotId>().is_err());
    }

    #[test]
    fn rejects_unknown_bus() {
        assert_eq!(
            "virtio0".parse::<SlotId>(),
            Err(SlotError::UnknownBus("virtio0".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("ide".parse::<SlotId>().is_err());
        assert!("".parse::<SlotId>().is_err());
    }

    #[test]
    fn bounded_slot_iteration() {
        assert_eq!(Bus::Ide.slots().count(), 4);
        assert_eq!(Bus::Sata.slots().count(), 6);
        assert_eq!(Bus::Scsi.slots().count(), 4);
    }
}
