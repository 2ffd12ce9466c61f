use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Backend interfaces the gateway knows how to interpret.
///
/// Backend agents advertise capabilities as raw interface strings. They are
/// parsed into this closed set once, when a `BackendObject` is built, so the
/// rest of the engine never compares interface strings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Cpu")]
    Cpu,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Accelerator")]
    Accelerator,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.CpuCore")]
    CpuCore,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.CpuThread")]
    CpuThread,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Storage")]
    Storage,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.StorageController")]
    StorageController,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Drive")]
    Drive,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Dimm")]
    Dimm,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Cable")]
    Cable,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Chassis")]
    Chassis,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Board")]
    Board,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Volume")]
    Volume,
    #[serde(rename = "xyz.openbmc_project.Nvme.Volume")]
    NvmeVolume,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Cpu.OperatingConfig")]
    OperatingConfig,
    #[serde(rename = "xyz.openbmc_project.Control.Processor.CurrentOperatingConfig")]
    CurrentOperatingConfig,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.Dimm.MemoryLocation")]
    MemoryLocation,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item.PersistentMemory")]
    PersistentMemory,
    #[serde(rename = "xyz.openbmc_project.Inventory.Item")]
    Item,
    #[serde(rename = "xyz.openbmc_project.Inventory.Decorator.Asset")]
    Asset,
    #[serde(rename = "xyz.openbmc_project.Inventory.Decorator.LocationCode")]
    LocationCode,
    #[serde(rename = "xyz.openbmc_project.Inventory.Decorator.Revision")]
    Revision,
    #[serde(rename = "xyz.openbmc_project.Inventory.Decorator.UniqueIdentifier")]
    UniqueIdentifier,
    #[serde(rename = "xyz.openbmc_project.State.Decorator.OperationalStatus")]
    OperationalStatus,
}

impl Capability {
    pub const ALL: [Capability; 23] = [
        Capability::Cpu,
        Capability::Accelerator,
        Capability::CpuCore,
        Capability::CpuThread,
        Capability::Storage,
        Capability::StorageController,
        Capability::Drive,
        Capability::Dimm,
        Capability::Cable,
        Capability::Chassis,
        Capability::Board,
        Capability::Volume,
        Capability::NvmeVolume,
        Capability::OperatingConfig,
        Capability::CurrentOperatingConfig,
        Capability::MemoryLocation,
        Capability::PersistentMemory,
        Capability::Item,
        Capability::Asset,
        Capability::LocationCode,
        Capability::Revision,
        Capability::UniqueIdentifier,
        Capability::OperationalStatus,
    ];

    /// The backend interface name carrying this capability.
    pub const fn interface(self) -> &'static str {
        match self {
            Capability::Cpu => "xyz.openbmc_project.Inventory.Item.Cpu",
            Capability::Accelerator => "xyz.openbmc_project.Inventory.Item.Accelerator",
            Capability::CpuCore => "xyz.openbmc_project.Inventory.Item.CpuCore",
            Capability::CpuThread => "xyz.openbmc_project.Inventory.Item.CpuThread",
            Capability::Storage => "xyz.openbmc_project.Inventory.Item.Storage",
            Capability::StorageController => {
                "xyz.openbmc_project.Inventory.Item.StorageController"
            }
            Capability::Drive => "xyz.openbmc_project.Inventory.Item.Drive",
            Capability::Dimm => "xyz.openbmc_project.Inventory.Item.Dimm",
            Capability::Cable => "xyz.openbmc_project.Inventory.Item.Cable",
            Capability::Chassis => "xyz.openbmc_project.Inventory.Item.Chassis",
            Capability::Board => "xyz.openbmc_project.Inventory.Item.Board",
            Capability::Volume => "xyz.openbmc_project.Inventory.Item.Volume",
            Capability::NvmeVolume => "xyz.openbmc_project.Nvme.Volume",
            Capability::OperatingConfig => "xyz.openbmc_project.Inventory.Item.Cpu.OperatingConfig",
            Capability::CurrentOperatingConfig => {
                "xyz.openbmc_project.Control.Processor.CurrentOperatingConfig"
            }
            Capability::MemoryLocation => "xyz.openbmc_project.Inventory.Item.Dimm.MemoryLocation",
            Capability::PersistentMemory => "xyz.openbmc_project.Inventory.Item.PersistentMemory",
            Capability::Item => "xyz.openbmc_project.Inventory.Item",
            Capability::Asset => "xyz.openbmc_project.Inventory.Decorator.Asset",
            Capability::LocationCode => "xyz.openbmc_project.Inventory.Decorator.LocationCode",
            Capability::Revision => "xyz.openbmc_project.Inventory.Decorator.Revision",
            Capability::UniqueIdentifier => {
                "xyz.openbmc_project.Inventory.Decorator.UniqueIdentifier"
            }
            Capability::OperationalStatus => {
                "xyz.openbmc_project.State.Decorator.OperationalStatus"
            }
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.interface())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .copied()
            .find(|capability| capability.interface() == s)
            .ok_or_else(|| format!("Unknown capability interface: {}", s))
    }
}

/// A validated set of capability tags, used both as an object's advertised
/// capabilities and as a listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities.iter().copied().collect()
    }

    /// Parses raw interface names, silently dropping the ones outside the
    /// closed set.
    pub fn from_interfaces<I, S>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        interfaces
            .into_iter()
            .filter_map(|name| name.as_ref().parse::<Capability>().ok())
            .collect()
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Filter semantics over raw interface names: an empty filter admits
    /// everything, otherwise at least one tag must be shared.
    pub fn admits_interfaces<S: AsRef<str>>(&self, interfaces: &[S]) -> bool {
        self.is_empty()
            || interfaces
                .iter()
                .any(|name| self.0.iter().any(|cap| cap.interface() == name.as_ref()))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
