use serde_json::{Map, Value};

use crate::model::{Capability, ChildCollection, InterfaceMap, MappingError, MemberContext, MemberLink, ResourceFamily};
use crate::resources::properties::{common_fields, Fields, PropertyReader};
use crate::resources::storage::{DRIVE, DRIVE_COLLECTION, DRIVE_COLLECTION_TYPE};

pub const COLLECTION_URI: &str = "/redfish/v1/Chassis";
pub const COLLECTION_TYPE: &str = "#ChassisCollection.ChassisCollection";

/// `Links.Chassis` of items placed in a chassis or board.
pub const CHASSIS_LINK: MemberLink = MemberLink {
    field: "Chassis",
    relation: "chassis",
    collection_uri: COLLECTION_URI,
};

pub static CHASSIS: ResourceFamily = ResourceFamily {
    name: "Chassis",
    odata_type: "#Chassis.v1_14_0.Chassis",
    capabilities: &[Capability::Chassis, Capability::Board],
    mapper: map_chassis,
    children: &[ChildCollection {
        field: "Drives",
        relation: Some("drive"),
        name: DRIVE_COLLECTION,
        odata_type: DRIVE_COLLECTION_TYPE,
        family: &DRIVE,
        requires: None,
    }],
    links: &[],
};

fn map_chassis(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    Ok(fields.into_map())
}
