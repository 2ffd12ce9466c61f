use serde_json::{Map, Value};

use crate::model::{Capability, InterfaceMap, MappingError, MemberContext, ResourceFamily};
use crate::resources::properties::{common_fields, enum_suffix, hex, Fields, PropertyReader};

pub const COLLECTION_TYPE: &str = "#MemoryCollection.MemoryCollection";

pub static MEMORY: ResourceFamily = ResourceFamily {
    name: "DIMM Slot",
    odata_type: "#Memory.v1_11_0.Memory",
    capabilities: &[Capability::Dimm],
    mapper: map_dimm,
    children: &[],
    links: &[],
};

const ECC_MODES: [&str; 4] = ["NoECC", "SingleBitECC", "MultiBitECC", "AddressParity"];

const MODULE_TYPES: [&str; 11] = [
    "RDIMM",
    "UDIMM",
    "SO_DIMM",
    "LRDIMM",
    "Mini_RDIMM",
    "Mini_UDIMM",
    "SO_RDIMM_72b",
    "SO_UDIMM_72b",
    "SO_DIMM_16b",
    "SO_DIMM_32b",
    "Die",
];

const MEMORY_MODES: [&str; 3] = ["Volatile", "PMEM", "Block"];

const MEMORY_MEDIA: [&str; 3] = ["DRAM", "NAND", "Intel3DXPoint"];

/// The known value equal to the raw enumeration's last segment.
fn known_suffix(raw: &str, known: &[&'static str]) -> Option<&'static str> {
    let suffix = enum_suffix(raw);
    known.iter().copied().find(|value| *value == suffix)
}

fn map_dimm(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let dimm = Capability::Dimm;
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;

    fields
        .set_opt("DataWidthBits", reader.u64(dimm, "MemoryDataWidth")?)
        .set_opt("BusWidthBits", reader.u64(dimm, "MemoryTotalWidth")?)
        .set_opt("CapacityMiB", reader.u64(dimm, "MemorySizeInKB")?.map(|kb| kb >> 10))
        .set_opt("OperatingSpeedMhz", reader.u64(dimm, "MemoryConfiguredSpeedInMhz")?)
        .set_opt("RankCount", reader.u64(dimm, "MemoryAttributes")?)
        .set_opt(
            "FirmwareRevision",
            reader.u64(dimm, "RevisionCode")?.map(|code| code.to_string()),
        );

    if let Some(ecc) = reader.string(dimm, "ECC")? {
        fields.set_opt("ErrorCorrection", known_suffix(ecc, &ECC_MODES));
    }
    if let Some(form_factor) = reader.string(dimm, "FormFactor")? {
        fields.set_opt("BaseModuleType", known_suffix(form_factor, &MODULE_TYPES));
    }
    fields.set_opt("AllowedSpeedsMHz", reader.u64_list(dimm, "AllowedSpeedsMT")?);

    let location = Capability::MemoryLocation;
    for property in ["Channel", "MemoryController", "Slot", "Socket"] {
        fields.set_nested("MemoryLocation", property, reader.text(location, property)?);
    }

    if let Some(memory_type) = reader.string(dimm, "MemoryType")? {
        let device_type = enum_suffix(memory_type);
        if !matches!(device_type, "Unknown" | "Other" | "") {
            fields.set("MemoryDeviceType", device_type);
        }
        if memory_type.contains("DDR") {
            fields.set("MemoryType", "DRAM");
        } else if memory_type.ends_with("Logical") {
            fields.set("MemoryType", "IntelOptane");
        }
    }
    persistent_memory(&reader, &mut fields)?;
    Ok(fields.into_map())
}

/// Region sizes are published in KiB and served in MiB.
const SIZES_MIB: [(&str, &str); 9] = [
    ("VolatileRegionSizeLimitInKiB", "VolatileRegionSizeLimitMiB"),
    ("PmRegionSizeLimitInKiB", "PersistentRegionSizeLimitMiB"),
    ("VolatileSizeInKiB", "VolatileSizeMiB"),
    ("PmSizeInKiB", "NonVolatileSizeMiB"),
    ("CacheSizeInKB", "CacheSizeMiB"),
    ("VoltaileRegionMaxSizeInKib", "VolatileRegionSizeMaxMiB"),
    ("PmRegionMaxSizeInKiB", "PersistentRegionSizeMaxMiB"),
    ("AllocationIncrementInKiB", "AllocationIncrementMiB"),
    ("AllocationAlignmentInKiB", "AllocationAlignmentMiB"),
];

const IDENTIFIERS: [(&str, &str); 4] = [
    ("ModuleManufacturerID", "ModuleManufacturerID"),
    ("ModuleProductID", "ModuleProductID"),
    ("SubsystemVendorID", "MemorySubsystemControllerManufacturerID"),
    ("SubsystemDeviceID", "MemorySubsystemControllerProductID"),
];

fn persistent_memory(reader: &PropertyReader<'_>, fields: &mut Fields) -> Result<(), MappingError> {
    let pmem = Capability::PersistentMemory;
    if !reader.has(pmem) {
        return Ok(());
    }

    for (property, field) in IDENTIFIERS {
        fields.set_opt(field, reader.u64(pmem, property)?.map(|id| hex(id, 4)));
    }
    for (property, field) in SIZES_MIB {
        fields.set_opt(field, reader.u64(pmem, property)?.map(|kib| kib >> 10));
    }
    fields
        .set_opt("VolatileRegionNumberLimit", reader.u64(pmem, "VolatileRegionNumberLimit")?)
        .set_opt("PersistentRegionNumberLimit", reader.u64(pmem, "PmRegionNumberLimit")?)
        .set_opt("SpareDeviceCount", reader.u64(pmem, "SpareDeviceCount")?)
        .set_opt("IsSpareDeviceEnabled", reader.bool(pmem, "IsSpareDeviceInUse")?)
        .set_opt("IsRankSpareEnabled", reader.bool(pmem, "IsRankSpareEnabled")?)
        .set_opt("MaxTDPMilliWatts", reader.u64_list(pmem, "MaxAveragePowerLimitmW")?)
        .set_opt("ConfigurationLocked", reader.bool(pmem, "ConfigurationLocked")?);

    if let Some(modes) = reader.string(pmem, "AllowedMemoryModes")? {
        fields.set_opt("OperatingMemoryModes", known_suffix(modes, &MEMORY_MODES).map(|mode| vec![mode]));
    }
    if let Some(media) = reader.string(pmem, "MemoryMedia")? {
        fields.set_opt("MemoryMedia", known_suffix(media, &MEMORY_MEDIA).map(|medium| vec![medium]));
    }

    let security = "SecurityCapabilities";
    fields
        .set_nested(security, "ConfigurationLockCapable", reader.bool(pmem, "ConfigurationLockCapable")?)
        .set_nested(security, "DataLockCapable", reader.bool(pmem, "DataLockCapable")?)
        .set_nested(security, "PassphraseCapable", reader.bool(pmem, "PassphraseCapable")?)
        .set_nested(security, "MaxPassphraseCount", reader.u64(pmem, "MaxPassphraseCount")?)
        .set_nested(security, "PassphraseLockLimit", reader.u64(pmem, "PassphraseLockLimit")?);
    Ok(())
}
