use serde_json::{json, Map, Value};

use crate::model::{
    stable_id, Capability, ChildCollection, InterfaceMap, MappingError, MemberContext, ResourceFamily,
};
use crate::resources::chassis::CHASSIS_LINK;
use crate::resources::properties::{common_fields, hex, Fields, PropertyReader};

const PROCESSOR_TYPE: &str = "#Processor.v1_18_0.Processor";
const SUB_PROCESSORS: &str = "SubProcessors";
const SUB_PROCESSOR_COLLECTION: &str = "SubProcessor Collection";
pub const COLLECTION_TYPE: &str = "#ProcessorCollection.ProcessorCollection";
const OPERATING_CONFIGS: &str = "OperatingConfigs";

pub static PROCESSOR: ResourceFamily = ResourceFamily {
    name: "Processor",
    odata_type: PROCESSOR_TYPE,
    capabilities: &[Capability::Cpu, Capability::Accelerator],
    mapper: map_processor,
    children: &[
        ChildCollection {
            field: SUB_PROCESSORS,
            relation: Some("containing"),
            name: SUB_PROCESSOR_COLLECTION,
            odata_type: COLLECTION_TYPE,
            family: &CORE,
            requires: None,
        },
        ChildCollection {
            field: OPERATING_CONFIGS,
            relation: None,
            name: "Operating Config Collection",
            odata_type: "#OperatingConfigCollection.OperatingConfigCollection",
            family: &OPERATING_CONFIG,
            requires: Some(Capability::CurrentOperatingConfig),
        },
    ],
    links: &[CHASSIS_LINK],
};

pub static CORE: ResourceFamily = ResourceFamily {
    name: "SubProcessor",
    odata_type: PROCESSOR_TYPE,
    capabilities: &[Capability::CpuCore],
    mapper: map_core,
    children: &[ChildCollection {
        field: SUB_PROCESSORS,
        relation: Some("containing"),
        name: SUB_PROCESSOR_COLLECTION,
        odata_type: COLLECTION_TYPE,
        family: &THREAD,
        requires: None,
    }],
    links: &[],
};

pub static THREAD: ResourceFamily = ResourceFamily {
    name: "SubProcessor",
    odata_type: PROCESSOR_TYPE,
    capabilities: &[Capability::CpuThread],
    mapper: map_thread,
    children: &[],
    links: &[],
};

pub static OPERATING_CONFIG: ResourceFamily = ResourceFamily {
    name: "Processor Profile",
    odata_type: "#OperatingConfig.v1_0_0.OperatingConfig",
    capabilities: &[Capability::OperatingConfig],
    mapper: map_operating_config,
    children: &[],
    links: &[],
};

fn map_processor(member: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let object = member.object;
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;

    if object.capabilities.contains(Capability::Accelerator) && !object.capabilities.contains(Capability::Cpu) {
        fields.set("ProcessorType", "Accelerator");
        return Ok(fields.into_map());
    }
    fields.set("ProcessorType", "CPU");

    let cpu = Capability::Cpu;
    fields
        .set_opt("Socket", reader.text(cpu, "Socket")?)
        .set_opt("TotalCores", reader.u64(cpu, "CoreCount")?)
        .set_opt("TotalThreads", reader.u64(cpu, "ThreadCount")?)
        .set_opt("MaxSpeedMHz", reader.u64(cpu, "MaxSpeedInMhz")?)
        .set_opt("Version", reader.text(Capability::Revision, "Version")?)
        .set_opt("UUID", reader.text(Capability::UniqueIdentifier, "UniqueIdentifier")?);

    // Family 2 is "unknown" and zero means unset for the id registers.
    let family = reader.u64(cpu, "EffectiveFamily")?.filter(|v| *v != 2);
    fields.set_nested("ProcessorId", "EffectiveFamily", family.map(|v| hex(v, 4)));
    let model = reader.u64(cpu, "EffectiveModel")?.filter(|v| *v != 0);
    fields.set_nested("ProcessorId", "EffectiveModel", model.map(|v| hex(v, 4)));
    let registers = reader.u64(cpu, "Id")?.filter(|v| *v != 0);
    fields.set_nested("ProcessorId", "IdentificationRegisters", registers.map(|v| hex(v, 16)));
    let microcode = reader.u64(cpu, "Microcode")?.filter(|v| *v != 0);
    fields.set_nested("ProcessorId", "MicrocodeInfo", microcode.map(|v| hex(v, 8)));
    let step = reader.u64(cpu, "Step")?.filter(|v| *v != 0);
    fields.set_nested("ProcessorId", "Step", step.map(|v| hex(v, 4)));

    current_operating_config(member.uri, &reader, &mut fields)?;
    Ok(fields.into_map())
}

/// `AppliedOperatingConfig` reuses the last segment of the applied config's
/// backend path as its id below `OperatingConfigs`.
fn current_operating_config(
    uri: &str,
    reader: &PropertyReader<'_>,
    fields: &mut Fields,
) -> Result<(), MappingError> {
    let current = Capability::CurrentOperatingConfig;
    if let Some(applied) = reader.string(current, "AppliedConfig")? {
        let config = stable_id(applied);
        if config.is_empty() {
            return Err(MappingError::malformed(
                current.interface(),
                "AppliedConfig",
                "an object path naming a config",
            ));
        }
        let configs = format!("{}/{}", uri.trim_end_matches('/'), OPERATING_CONFIGS);
        fields.set("AppliedOperatingConfig", json!({ "@odata.id": format!("{}/{}", configs, config) }));
    }
    if let Some(enabled) = reader.bool(current, "BaseSpeedPriorityEnabled")? {
        fields.set("BaseSpeedPriorityState", if enabled { "Enabled" } else { "Disabled" });
    }
    Ok(())
}

fn map_operating_config(
    _: &MemberContext<'_>,
    interfaces: &InterfaceMap,
) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let config = Capability::OperatingConfig;
    let mut fields = Fields::new();
    fields
        .set_opt("TotalAvailableCoreCount", reader.u64(config, "AvailableCoreCount")?)
        .set_opt("BaseSpeedMHz", reader.u64(config, "BaseSpeed")?)
        .set_opt("MaxJunctionTemperatureCelsius", reader.u64(config, "MaxJunctionTemperature")?)
        .set_opt("MaxSpeedMHz", reader.u64(config, "MaxSpeed")?)
        .set_opt("TDPWatts", reader.u64(config, "PowerLimit")?);

    if let Some(profile) = reader.list(config, "TurboProfile")? {
        let turbo = profile
            .iter()
            .map(|entry| match entry.as_array().map(Vec::as_slice) {
                Some([speed, cores]) => Some(json!({
                    "ActiveCoreCount": cores.as_u64()?,
                    "MaxSpeedMHz": speed.as_u64()?,
                })),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| MappingError::malformed(config.interface(), "TurboProfile", "[speed, core count] pairs"))?;
        fields.set("TurboProfile", turbo);
    }

    if let Some(settings) = reader.list(config, "BaseSpeedPrioritySettings")? {
        let groups = settings
            .iter()
            .map(|entry| match entry.as_array().map(Vec::as_slice) {
                Some([speed, cores]) => {
                    let core_ids = cores.as_array()?.iter().map(Value::as_u64).collect::<Option<Vec<_>>>()?;
                    Some(json!({
                        "CoreCount": core_ids.len(),
                        "CoreIDs": core_ids,
                        "BaseSpeedMHz": speed.as_u64()?,
                    }))
                }
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                MappingError::malformed(config.interface(), "BaseSpeedPrioritySettings", "[speed, [core ids]] pairs")
            })?;
        fields.set("BaseSpeedPrioritySettings", groups);
    }
    Ok(fields.into_map())
}

fn map_core(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    fields.set("ProcessorType", "Core");
    let microcode = reader.u64(Capability::CpuCore, "Microcode")?.filter(|v| *v != 0);
    fields.set_nested("ProcessorId", "MicrocodeInfo", microcode.map(|v| hex(v, 8)));
    Ok(fields.into_map())
}

fn map_thread(_: &MemberContext<'_>, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
    let reader = PropertyReader::new(interfaces);
    let mut fields = Fields::new();
    common_fields(&reader, &mut fields)?;
    fields.set("ProcessorType", "Thread");
    Ok(fields.into_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendObject, CapabilitySet};

    const CPU0_URI: &str = "/redfish/v1/Systems/system/Processors/cpu0";

    fn object(capabilities: &[Capability]) -> BackendObject {
        BackendObject {
            path: "/inv/system/chassis/motherboard/cpu0".to_string(),
            stable_id: "cpu0".to_string(),
            capabilities: CapabilitySet::of(capabilities),
            owner_agent: "xyz.openbmc_project.Inventory.Manager".to_string(),
        }
    }

    fn map(object: &BackendObject, interfaces: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
        map_processor(&MemberContext { object, uri: CPU0_URI }, interfaces)
    }

    fn properties(capability: Capability, entries: &[(&str, Value)]) -> InterfaceMap {
        InterfaceMap::from([(
            capability.interface().to_string(),
            entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )])
    }

    fn cpu_properties(entries: &[(&str, Value)]) -> InterfaceMap {
        InterfaceMap::from([(
            Capability::Cpu.interface().to_string(),
            entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )])
    }

    #[test]
    fn test_cpu_fields() {
        let interfaces = cpu_properties(&[
            ("Socket", json!("CPU 0")),
            ("CoreCount", json!(24)),
            ("EffectiveFamily", json!(0x6b)),
            ("EffectiveModel", json!(0)),
            ("Microcode", json!(0x2000065)),
        ]);
        let fields = map(&object(&[Capability::Cpu]), &interfaces).unwrap();
        assert_eq!(fields["ProcessorType"], json!("CPU"));
        assert_eq!(fields["Socket"], json!("CPU 0"));
        assert_eq!(fields["TotalCores"], json!(24));
        assert_eq!(fields["ProcessorId"]["EffectiveFamily"], json!("0x006B"));
        assert_eq!(fields["ProcessorId"]["MicrocodeInfo"], json!("0x02000065"));
        assert!(fields["ProcessorId"].get("EffectiveModel").is_none());
        assert_eq!(fields["Status"]["State"], json!("Enabled"));
    }

    #[test]
    fn test_accelerator_skips_cpu_fields() {
        let fields = map(&object(&[Capability::Accelerator]), &InterfaceMap::new()).unwrap();
        assert_eq!(fields["ProcessorType"], json!("Accelerator"));
        assert!(!fields.contains_key("TotalCores"));
    }

    #[test]
    fn test_wrong_core_count_type_fails_member() {
        let interfaces = cpu_properties(&[("CoreCount", json!("many"))]);
        assert!(map(&object(&[Capability::Cpu]), &interfaces).is_err());
    }

    #[test]
    fn test_applied_operating_config() {
        let mut interfaces = cpu_properties(&[("CoreCount", json!(24))]);
        interfaces.extend(properties(
            Capability::CurrentOperatingConfig,
            &[
                ("AppliedConfig", json!("/inv/system/chassis/motherboard/cpu0/config1")),
                ("BaseSpeedPriorityEnabled", json!(false)),
            ],
        ));
        let fields = map(&object(&[Capability::Cpu, Capability::CurrentOperatingConfig]), &interfaces).unwrap();
        assert_eq!(
            fields["AppliedOperatingConfig"]["@odata.id"],
            json!("/redfish/v1/Systems/system/Processors/cpu0/OperatingConfigs/config1")
        );
        assert_eq!(fields["BaseSpeedPriorityState"], json!("Disabled"));

        let broken = properties(
            Capability::CurrentOperatingConfig,
            &[("AppliedConfig", json!("/inv/system/chassis/motherboard/cpu0/"))],
        );
        assert!(map(&object(&[Capability::Cpu]), &broken).is_err());
    }

    #[test]
    fn test_operating_config_fields() {
        let interfaces = properties(
            Capability::OperatingConfig,
            &[
                ("AvailableCoreCount", json!(20)),
                ("BaseSpeed", json!(2100)),
                ("PowerLimit", json!(205)),
                ("TurboProfile", json!([[3500, 4], [3100, 20]])),
                ("BaseSpeedPrioritySettings", json!([[2400, [0, 2, 4]], [1900, []]])),
            ],
        );
        let config = object(&[Capability::OperatingConfig]);
        let context = MemberContext { object: &config, uri: "/unused" };
        let fields = map_operating_config(&context, &interfaces).unwrap();
        assert_eq!(fields["TotalAvailableCoreCount"], json!(20));
        assert_eq!(fields["BaseSpeedMHz"], json!(2100));
        assert_eq!(fields["TDPWatts"], json!(205));
        assert_eq!(
            fields["TurboProfile"],
            json!([
                { "ActiveCoreCount": 4, "MaxSpeedMHz": 3500 },
                { "ActiveCoreCount": 20, "MaxSpeedMHz": 3100 },
            ])
        );
        assert_eq!(
            fields["BaseSpeedPrioritySettings"][0],
            json!({ "CoreCount": 3, "CoreIDs": [0, 2, 4], "BaseSpeedMHz": 2400 })
        );
        assert_eq!(fields["BaseSpeedPrioritySettings"][1]["CoreCount"], json!(0));

        let bad = properties(Capability::OperatingConfig, &[("TurboProfile", json!([[3500]]))]);
        assert!(map_operating_config(&context, &bad).is_err());
    }

    #[test]
    fn test_family_tree() {
        assert_eq!(PROCESSOR.child("SubProcessors").unwrap().family.name, "SubProcessor");
        assert!(CORE.child("SubProcessors").unwrap().family.is_leaf());
        assert!(THREAD.filter().contains(Capability::CpuThread));

        let configs = PROCESSOR.child("OperatingConfigs").unwrap();
        assert!(configs.relation.is_none());
        assert!(!configs.applies_to(&object(&[Capability::Cpu])));
        assert!(configs.applies_to(&object(&[Capability::Cpu, Capability::CurrentOperatingConfig])));
        assert_eq!(PROCESSOR.links[0].relation, "chassis");
    }
}
