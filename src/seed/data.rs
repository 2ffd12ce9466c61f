use serde_json::{json, Value};

use crate::backend::InMemoryGraph;
use crate::model::common::join_path;
use crate::model::{Capability, InterfaceMap};

pub const INVENTORY_MANAGER: &str = "xyz.openbmc_project.Inventory.Manager";
pub const CPU_INVENTORY: &str = "xyz.openbmc_project.CPUInventory";

/// Helper to build an object's interfaces. Every object gets an `Item`
/// interface with a pretty name and presence.
struct ObjectSpec {
    interfaces: InterfaceMap,
}

impl ObjectSpec {
    fn item(pretty_name: &str) -> Self {
        let mut object = Self {
            interfaces: InterfaceMap::new(),
        };
        object.set(Capability::Item, "PrettyName", json!(pretty_name));
        object.set(Capability::Item, "Present", json!(true));
        object.set(Capability::OperationalStatus, "Functional", json!(true));
        object
    }

    fn with(mut self, capability: Capability, properties: &[(&str, Value)]) -> Self {
        self.interfaces
            .entry(capability.interface().to_string())
            .or_default();
        for (name, value) in properties {
            self.set(capability, name, value.clone());
        }
        self
    }

    fn asset(self, manufacturer: &str, part_number: &str, serial: &str) -> Self {
        self.with(
            Capability::Asset,
            &[
                ("Manufacturer", json!(manufacturer)),
                ("PartNumber", json!(part_number)),
                ("SerialNumber", json!(serial)),
            ],
        )
    }

    fn set(&mut self, capability: Capability, name: &str, value: Value) {
        self.interfaces
            .entry(capability.interface().to_string())
            .or_default()
            .insert(name.to_string(), value);
    }
}

/// Demo inventory served when no fixture file is configured: a motherboard
/// holding two CPUs with cores, threads and operating configs, an
/// accelerator, a handful of DIMMs, one storage subsystem with drives, a
/// controller and a namespace, and two cables.
pub fn demo_inventory(inventory_root: &str) -> InMemoryGraph {
    let board = join_path(inventory_root, "system/chassis/motherboard");
    let at = |relative: &str| join_path(&board, relative);
    let mut graph = InMemoryGraph::new();

    graph.insert_object(
        &board,
        INVENTORY_MANAGER,
        ObjectSpec::item("Motherboard")
            .asset("Quanta", "S9S-MB", "SN-MB-0001")
            .with(Capability::Board, &[])
            .interfaces,
    );

    for socket in 0..2u64 {
        let cpu = at(&format!("cpu{}", socket));
        graph.insert_object(
            &cpu,
            CPU_INVENTORY,
            ObjectSpec::item(&format!("CPU {}", socket))
                .asset("Intel(R) Corporation", "CPU-SPR-56C", &format!("SN-CPU-{:04}", socket))
                .with(
                    Capability::Cpu,
                    &[
                        ("Socket", json!(format!("CPU {}", socket))),
                        ("CoreCount", json!(2)),
                        ("ThreadCount", json!(4)),
                        ("MaxSpeedInMhz", json!(3800)),
                        ("EffectiveFamily", json!(0x6)),
                        ("EffectiveModel", json!(0x8f)),
                        ("Microcode", json!(0x2b0004b1u64)),
                        ("Step", json!(0x8)),
                    ],
                )
                .with(
                    Capability::CurrentOperatingConfig,
                    &[
                        ("AppliedConfig", json!(join_path(&cpu, "config1"))),
                        ("BaseSpeedPriorityEnabled", json!(false)),
                    ],
                )
                .interfaces,
        );
        graph.add_association(&cpu, "chassis", [board.clone()]);

        for (index, (cores, base_speed)) in [(56u64, 1900u64), (32, 2400)].into_iter().enumerate() {
            graph.insert_object(
                &join_path(&cpu, &format!("config{}", index)),
                CPU_INVENTORY,
                ObjectSpec::item(&format!("Config {}", index))
                    .with(
                        Capability::OperatingConfig,
                        &[
                            ("AvailableCoreCount", json!(cores)),
                            ("BaseSpeed", json!(base_speed)),
                            ("MaxSpeed", json!(3800)),
                            ("MaxJunctionTemperature", json!(95)),
                            ("PowerLimit", json!(350)),
                            ("TurboProfile", json!([[3800, 2], [3000, cores]])),
                            ("BaseSpeedPrioritySettings", json!([[base_speed + 300, [0, 1]], [base_speed, []]])),
                        ],
                    )
                    .interfaces,
            );
        }

        let mut cores = Vec::new();
        for index in 0..2 {
            let core = join_path(&cpu, &format!("core{}", index));
            graph.insert_object(
                &core,
                CPU_INVENTORY,
                ObjectSpec::item(&format!("Core {}", index))
                    .with(Capability::CpuCore, &[("Microcode", json!(0x2b0004b1u64))])
                    .interfaces,
            );
            let threads: Vec<String> = (0..2)
                .map(|thread| join_path(&core, &format!("thread{}", thread)))
                .collect();
            for (thread, path) in threads.iter().enumerate() {
                graph.insert_object(
                    path,
                    CPU_INVENTORY,
                    ObjectSpec::item(&format!("Thread {}", thread))
                        .with(Capability::CpuThread, &[])
                        .interfaces,
                );
            }
            graph.add_association(&core, "containing", threads);
            cores.push(core);
        }
        graph.add_association(&cpu, "containing", cores);
    }

    graph.insert_object(
        &at("gpu0"),
        INVENTORY_MANAGER,
        ObjectSpec::item("GPU 0").with(Capability::Accelerator, &[]).interfaces,
    );

    // Deliberately out of natural order.
    for slot in [10u64, 2, 0, 1, 3] {
        let present = slot != 3;
        let channel = ["A", "B", "C", "D"][(slot % 4) as usize];
        let mut dimm = ObjectSpec::item(&format!("DIMM {}", slot))
            .asset("Micron Technology", "MTA18ASF2G72PZ", &format!("SN-DIMM-{:04}", slot))
            .with(
                Capability::Dimm,
                &[
                    ("MemorySizeInKB", json!(if present { 16_777_216u64 } else { 0 })),
                    ("MemoryDataWidth", json!(64)),
                    ("MemoryTotalWidth", json!(72)),
                    ("MemoryConfiguredSpeedInMhz", json!(3200)),
                    ("ECC", json!("xyz.openbmc_project.Inventory.Item.Dimm.Ecc.SingleBitECC")),
                    ("FormFactor", json!("xyz.openbmc_project.Inventory.Item.Dimm.FormFactor.RDIMM")),
                    ("MemoryType", json!("xyz.openbmc_project.Inventory.Item.Dimm.DeviceType.DDR4")),
                    ("AllowedSpeedsMT", json!([2933, 3200])),
                ],
            )
            .with(
                Capability::MemoryLocation,
                &[
                    ("Socket", json!(format!("CPU{}", slot % 2))),
                    ("MemoryController", json!("0")),
                    ("Channel", json!(channel)),
                    ("Slot", json!((slot / 4).to_string())),
                ],
            )
            .with(Capability::LocationCode, &[("LocationCode", json!(format!("DIMM_{}", slot)))]);
        dimm.set(Capability::Item, "Present", json!(present));
        graph.insert_object(&at(&format!("dimm{}", slot)), INVENTORY_MANAGER, dimm.interfaces);
    }

    let storage = at("storage0");
    graph.insert_object(
        &storage,
        INVENTORY_MANAGER,
        ObjectSpec::item("Storage 0").with(Capability::Storage, &[]).interfaces,
    );
    // The controller sits on the board, not below the storage object.
    let controller = at("controller0");
    graph.insert_object(
        &controller,
        INVENTORY_MANAGER,
        ObjectSpec::item("Storage Controller 0")
            .asset("Broadcom", "9560-8i", "SN-HBA-0001")
            .with(Capability::StorageController, &[])
            .with(Capability::Revision, &[("Version", json!("52.22.0-4544"))])
            .interfaces,
    );
    graph.add_association(&storage, "storage_controller", [controller]);

    let volume = join_path(&storage, "volume0");
    graph.insert_object(
        &volume,
        INVENTORY_MANAGER,
        ObjectSpec::item("Volume 0")
            .with(
                Capability::Volume,
                &[("Size", json!(960_197_124_096u64)), ("BlockSize", json!(4096))],
            )
            .with(Capability::NvmeVolume, &[("NamespaceId", json!(1)), ("LBAFormat", json!(1))])
            .interfaces,
    );
    graph.add_association(&storage, "containing", [volume]);
    let drives: Vec<String> = (0..2).map(|index| at(&format!("drive{}", index))).collect();
    for (index, drive) in drives.iter().enumerate() {
        graph.insert_object(
            drive,
            INVENTORY_MANAGER,
            ObjectSpec::item(&format!("Drive {}", index))
                .asset("Samsung", "MZQL2960HCJR", &format!("SN-NVME-{:04}", index))
                .with(
                    Capability::Drive,
                    &[
                        ("Capacity", json!(960_197_124_096u64)),
                        ("Type", json!("xyz.openbmc_project.Inventory.Item.Drive.DriveType.SSD")),
                        ("Protocol", json!("xyz.openbmc_project.Inventory.Item.Drive.DriveProtocol.NVMe")),
                        ("PredictedMediaLifeLeftPercent", json!(97)),
                    ],
                )
                .interfaces,
        );
        graph.add_association(drive, "chassis", [board.clone()]);
    }
    graph.add_association(&board, "drive", drives.clone());
    graph.add_association(&storage, "drive", drives);

    for (index, (description, length)) in [("OCuLink x8", 0.5), ("Mini-SAS HD", 1.0)].into_iter().enumerate() {
        graph.insert_object(
            &join_path(inventory_root, &format!("system/cable{}", index)),
            INVENTORY_MANAGER,
            ObjectSpec::item(&format!("Cable {}", index))
                .with(
                    Capability::Cable,
                    &[("CableTypeDescription", json!(description)), ("Length", json!(length))],
                )
                .interfaces,
        );
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendGraphClient;
    use crate::model::CapabilitySet;

    const ROOT: &str = "/xyz/openbmc_project/inventory";

    #[tokio::test]
    async fn test_demo_inventory_shape() {
        let graph = demo_inventory(ROOT);
        let dimms = graph
            .list_subtree(ROOT, &CapabilitySet::of(&[Capability::Dimm]), 0)
            .await
            .unwrap();
        assert_eq!(dimms.len(), 5);

        let cores = graph
            .get_association_endpoints(&format!("{}/system/chassis/motherboard/cpu0/containing", ROOT))
            .await
            .unwrap();
        assert_eq!(cores.len(), 2);

        let drives = graph
            .get_association_endpoints(&format!("{}/system/chassis/motherboard/storage0/drive", ROOT))
            .await
            .unwrap();
        assert_eq!(drives.len(), 2);

        let storage = format!("{}/system/chassis/motherboard/storage0", ROOT);
        let controllers = graph
            .get_association_endpoints(&format!("{}/storage_controller", storage))
            .await
            .unwrap();
        assert_eq!(controllers.len(), 1);
        assert!(!controllers[0].starts_with(&format!("{}/", storage)));

        let boards = graph
            .list_subtree(ROOT, &CapabilitySet::of(&[Capability::Board, Capability::Chassis]), 0)
            .await
            .unwrap();
        assert_eq!(boards.len(), 1);
    }
}
