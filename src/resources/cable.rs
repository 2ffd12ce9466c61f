use serde_json::{Map, Value};

use crate::model::{Capability, InterfaceMap, MappingError, MemberContext, ResourceFamily};
use crate::resources::properties::{common_fields, Fields, PropertyReader};

pub const COLLECTION_TYPE: &str = "#CableCollection.CableCollection";

pub static CABLE: ResourceFamily = ResourceFamily {
    name: "Cable",
    odata_type: "#Cable.v1_0_0.Cable",
    capabilities: &[Capability::Cable],
    mapper: map_cable,
    children: &[],
    links: &[],
};

fn map_cable(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    fields.set_opt("CableType", reader.text(Capability::Cable, "CableTypeDescription")?);
    fields.set_opt(
        "LengthMeters",
        reader
            .f64(Capability::Cable, "Length")?
            .filter(|length| length.is_finite()),
    );
    Ok(fields.into_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendObject, CapabilitySet};
    use serde_json::json;

    fn cable(entries: &[(&str, Value)]) -> Result<Map<String, Value>, MappingError> {
        let object = BackendObject {
            path: "/inv/system/cable0".to_string(),
            stable_id: "cable0".to_string(),
            capabilities: CapabilitySet::of(&[Capability::Cable]),
            owner_agent: "xyz.openbmc_project.Inventory.Manager".to_string(),
        };
        let interfaces = InterfaceMap::from([(
            Capability::Cable.interface().to_string(),
            entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )]);
        let context = MemberContext {
            object: &object,
            uri: "/redfish/v1/Cables/cable0",
        };
        map_cable(&context, &interfaces)
    }

    #[test]
    fn test_cable_fields() {
        let fields = cable(&[("CableTypeDescription", json!("OCuLink x8")), ("Length", json!(0.5))]).unwrap();
        assert_eq!(fields["CableType"], json!("OCuLink x8"));
        assert_eq!(fields["LengthMeters"], json!(0.5));
    }

    #[test]
    fn test_unset_length_is_omitted() {
        let fields = cable(&[("Length", Value::Null)]).unwrap();
        assert!(!fields.contains_key("LengthMeters"));
    }

    #[test]
    fn test_non_numeric_length_fails_member() {
        assert!(cable(&[("Length", json!("half a metre"))]).is_err());
    }
}
