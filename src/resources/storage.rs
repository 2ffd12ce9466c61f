use serde_json::{json, Map, Value};

use crate::model::{Capability, ChildCollection, InterfaceMap, MappingError, MemberContext, ResourceFamily};
use crate::resources::chassis::CHASSIS_LINK;
use crate::resources::properties::{common_fields, enum_suffix, hex, Fields, PropertyReader};

pub const COLLECTION_TYPE: &str = "#StorageCollection.StorageCollection";
pub const DRIVE_COLLECTION: &str = "Drive Collection";
pub const DRIVE_COLLECTION_TYPE: &str = "#DriveCollection.DriveCollection";

pub static STORAGE: ResourceFamily = ResourceFamily {
    name: "Storage",
    odata_type: "#Storage.v1_13_0.Storage",
    capabilities: &[Capability::Storage],
    mapper: map_storage,
    children: &[
        ChildCollection {
            field: "Drives",
            relation: Some("drive"),
            name: DRIVE_COLLECTION,
            odata_type: DRIVE_COLLECTION_TYPE,
            family: &DRIVE,
            requires: None,
        },
        ChildCollection {
            field: "Controllers",
            relation: Some("storage_controller"),
            name: "Storage Controller Collection",
            odata_type: "#StorageControllerCollection.StorageControllerCollection",
            family: &STORAGE_CONTROLLER,
            requires: None,
        },
        ChildCollection {
            field: "Volumes",
            relation: Some("containing"),
            name: "Storage Volume Collection",
            odata_type: "#VolumeCollection.VolumeCollection",
            family: &VOLUME,
            requires: None,
        },
    ],
    links: &[],
};

pub static DRIVE: ResourceFamily = ResourceFamily {
    name: "Drive",
    odata_type: "#Drive.v1_7_0.Drive",
    capabilities: &[Capability::Drive],
    mapper: map_drive,
    children: &[],
    links: &[CHASSIS_LINK],
};

pub static STORAGE_CONTROLLER: ResourceFamily = ResourceFamily {
    name: "Storage Controller",
    odata_type: "#StorageController.v1_6_0.StorageController",
    capabilities: &[Capability::StorageController],
    mapper: map_controller,
    children: &[],
    links: &[],
};

pub static VOLUME: ResourceFamily = ResourceFamily {
    name: "Volume",
    odata_type: "#Volume.v1_9_0.Volume",
    capabilities: &[Capability::Volume],
    mapper: map_volume,
    children: &[],
    links: &[],
};

fn map_storage(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    Ok(fields.into_map())
}

fn map_controller(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    fields.set_opt("FirmwareVersion", reader.text(Capability::Revision, "Version")?);
    Ok(fields.into_map())
}

/// Backend drive type to `MediaType`. `Ok(None)` for "Unknown".
fn media_type(raw: &str) -> Result<Option<&'static str>, MappingError> {
    match enum_suffix(raw) {
        "HDD" => Ok(Some("HDD")),
        "SSD" => Ok(Some("SSD")),
        "Unknown" => Ok(None),
        _ => Err(MappingError::malformed(Capability::Drive.interface(), "Type", "a known drive type")),
    }
}

fn protocol(raw: &str) -> Result<Option<&'static str>, MappingError> {
    match enum_suffix(raw) {
        "SAS" => Ok(Some("SAS")),
        "SATA" => Ok(Some("SATA")),
        "NVMe" => Ok(Some("NVMe")),
        "FC" => Ok(Some("FC")),
        "Unknown" => Ok(None),
        _ => Err(MappingError::malformed(Capability::Drive.interface(), "Protocol", "a known drive protocol")),
    }
}

fn map_drive(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let drive = Capability::Drive;
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;

    if let Some(raw) = reader.string(drive, "Type")? {
        fields.set_opt("MediaType", media_type(raw)?);
    }
    if let Some(raw) = reader.string(drive, "Protocol")? {
        fields.set_opt("Protocol", protocol(raw)?);
    }
    // Zero capacity means unknown; 255 means life left is unsupported.
    fields.set_opt("CapacityBytes", reader.u64(drive, "Capacity")?.filter(|c| *c != 0));
    fields.set_opt(
        "PredictedMediaLifeLeftPercent",
        reader
            .u64(drive, "PredictedMediaLifeLeftPercent")?
            .filter(|p| *p != 255),
    );
    fields.set_opt("Revision", reader.text(Capability::Revision, "Version")?);
    Ok(fields.into_map())
}

/// NVMe namespaces are named after their namespace rather than the volume.
fn map_volume(member: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let volume = Capability::Volume;
    let nvme = Capability::NvmeVolume;
    let id = &member.object.stable_id;
    let mut fields = Fields::new();

    let block_size = reader.u64(volume, "BlockSize")?;
    fields
        .set_nested("Capacity", "Data", reader.u64(volume, "Size")?.map(|size| json!({ "ProvisionedBytes": size })))
        .set_opt("BlockSizeBytes", block_size);

    if !reader.has(nvme) {
        fields.set("Name", format!("Volume {}", id));
        return Ok(fields.into_map());
    }
    fields.set("Name", format!("Namespace {}", id));
    let mut namespace = Fields::new();
    namespace.set_opt("NamespaceId", reader.u64(nvme, "NamespaceId")?.map(|ns| hex(ns, 8)));
    if let Some(format) = reader.u64(nvme, "LBAFormat")? {
        namespace.set(
            "LBAFormat",
            json!({
                "LBAFormatType": format!("LBAFormat{}", format),
                "LBADataSizeBytes": block_size.unwrap_or(0),
            }),
        );
    }
    fields.set("NVMeNamespaceProperties", namespace.into_map());
    Ok(fields.into_map())
}
