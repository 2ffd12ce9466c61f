use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::backend::traits::BackendGraphClient;
use crate::model::common::{depth_below, is_within, join_path};
use crate::model::{
    AssociationEdge, BackendError, CapabilitySet, InterfaceMap, ManagedObjects, SubtreeEntry,
};

/// Agent that answers subtree and association queries.
pub const MAPPER_AGENT: &str = "xyz.openbmc_project.ObjectMapper";

/// On-disk inventory description loaded into an [`InMemoryGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFixture {
    #[serde(default)]
    pub agents: Vec<AgentFixture>,
    #[serde(default)]
    pub objects: Vec<ObjectFixture>,
    #[serde(default)]
    pub associations: Vec<AssociationEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFixture {
    pub name: String,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectFixture {
    pub path: String,
    pub agent: String,
    #[serde(default)]
    pub interfaces: InterfaceMap,
}

#[derive(Debug, Clone)]
struct StoredObject {
    path: String,
    agent: String,
    interfaces: InterfaceMap,
}

#[derive(Debug, Clone)]
struct AgentState {
    available: bool,
    latency: Duration,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            available: true,
            latency: Duration::ZERO,
        }
    }
}

/// Backend graph held in memory.
///
/// Listings come back in insertion order, so tests can model whatever order a
/// real backend happens to deliver in. Agents can be taken offline or slowed
/// down at runtime to exercise failure isolation and completion reordering.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    objects: Vec<StoredObject>,
    index: HashMap<String, usize>,
    associations: HashMap<String, Vec<String>>,
    agents: RwLock<HashMap<String, AgentState>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: InventoryFixture) -> Self {
        let mut graph = Self::new();
        for object in fixture.objects {
            graph.insert_object(&object.path, &object.agent, object.interfaces);
        }
        for edge in fixture.associations {
            graph.add_association(&edge.subject_path, &edge.relation, edge.endpoints);
        }
        for agent in fixture.agents {
            graph.set_agent_available(&agent.name, agent.available);
            graph.set_agent_latency(&agent.name, Duration::from_millis(agent.latency_ms));
        }
        graph
    }

    /// Load a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let fixture: InventoryFixture = serde_json::from_str(&raw)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Insert or replace an object. Re-inserting a path keeps its original
    /// listing position.
    pub fn insert_object(&mut self, path: &str, agent: &str, interfaces: InterfaceMap) {
        let stored = StoredObject {
            path: path.to_string(),
            agent: agent.to_string(),
            interfaces,
        };
        match self.index.get(path) {
            Some(&position) => self.objects[position] = stored,
            None => {
                self.index.insert(path.to_string(), self.objects.len());
                self.objects.push(stored);
            }
        }
    }

    /// Publish `subject/relation` with the given endpoints, appending to any
    /// existing endpoint list.
    pub fn add_association<I, S>(&mut self, subject: &str, relation: &str, endpoints: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self
            .associations
            .entry(join_path(subject, relation))
            .or_default();
        for endpoint in endpoints {
            let endpoint = endpoint.into();
            if !entry.contains(&endpoint) {
                entry.push(endpoint);
            }
        }
    }

    pub fn set_agent_available(&self, agent: &str, available: bool) {
        self.agents
            .write()
            .entry(agent.to_string())
            .or_default()
            .available = available;
    }

    pub fn set_agent_latency(&self, agent: &str, latency: Duration) {
        self.agents
            .write()
            .entry(agent.to_string())
            .or_default()
            .latency = latency;
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Applies the agent's latency, then fails if it is offline.
    async fn answer_as(&self, agent: &str) -> Result<(), BackendError> {
        let state = self.agents.read().get(agent).cloned().unwrap_or_default();
        if !state.latency.is_zero() {
            tokio::time::sleep(state.latency).await;
        }
        if state.available {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                agent: agent.to_string(),
                reason: "agent is offline".to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl BackendGraphClient for InMemoryGraph {
    async fn list_subtree(
        &self,
        root_path: &str,
        capability_filter: &CapabilitySet,
        max_depth: u32,
    ) -> Result<Vec<SubtreeEntry>, BackendError> {
        self.answer_as(MAPPER_AGENT).await?;

        let rows: Vec<SubtreeEntry> = self
            .objects
            .iter()
            .filter(|object| is_within(&object.path, root_path))
            .filter(|object| {
                max_depth == 0
                    || depth_below(&object.path, root_path)
                        .map(|depth| depth <= max_depth as usize)
                        .unwrap_or(false)
            })
            .filter(|object| {
                let interfaces: Vec<&str> = object.interfaces.keys().map(String::as_str).collect();
                capability_filter.admits_interfaces(&interfaces)
            })
            .map(|object| SubtreeEntry {
                path: object.path.clone(),
                owner_agent: object.agent.clone(),
                interfaces: object.interfaces.keys().cloned().collect(),
            })
            .collect();

        if rows.is_empty() {
            return Err(BackendError::EmptyResult(root_path.to_string()));
        }
        Ok(rows)
    }

    async fn get_association_endpoints(&self, edge_path: &str) -> Result<Vec<String>, BackendError> {
        self.answer_as(MAPPER_AGENT).await?;
        self.associations
            .get(edge_path)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchRelation(edge_path.to_string()))
    }

    async fn get_all_managed_objects(&self, agent: &str) -> Result<ManagedObjects, BackendError> {
        self.answer_as(agent).await?;
        Ok(self
            .objects
            .iter()
            .filter(|object| object.agent == agent)
            .map(|object| (object.path.clone(), object.interfaces.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Capability;
    use serde_json::json;

    fn interfaces(names: &[&str]) -> InterfaceMap {
        names
            .iter()
            .map(|name| (name.to_string(), Default::default()))
            .collect()
    }

    fn sample() -> InMemoryGraph {
        let mut graph = InMemoryGraph::new();
        graph.insert_object(
            "/inv/system/cpu1",
            "cpu.agent",
            interfaces(&["xyz.openbmc_project.Inventory.Item.Cpu"]),
        );
        graph.insert_object(
            "/inv/system/cpu0",
            "cpu.agent",
            interfaces(&["xyz.openbmc_project.Inventory.Item.Cpu"]),
        );
        graph.insert_object(
            "/inv/system/cpu0/core0",
            "core.agent",
            interfaces(&["xyz.openbmc_project.Inventory.Item.CpuCore"]),
        );
        graph.insert_object(
            "/inv/system/dimm0",
            "dimm.agent",
            interfaces(&["xyz.openbmc_project.Inventory.Item.Dimm"]),
        );
        graph.add_association("/inv/system/cpu0", "containing", ["/inv/system/cpu0/core0"]);
        graph
    }

    #[tokio::test]
    async fn test_list_subtree_filters_and_keeps_insertion_order() {
        let graph = sample();
        let rows = graph
            .list_subtree("/inv", &CapabilitySet::of(&[Capability::Cpu]), 0)
            .await
            .unwrap();
        let paths: Vec<&str> = rows.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(paths, vec!["/inv/system/cpu1", "/inv/system/cpu0"]);
        assert_eq!(rows[0].owner_agent, "cpu.agent");
    }

    #[tokio::test]
    async fn test_list_subtree_honours_max_depth() {
        let graph = sample();
        let rows = graph
            .list_subtree("/inv/system", &CapabilitySet::new(), 1)
            .await
            .unwrap();
        assert!(rows.iter().all(|row| row.path != "/inv/system/cpu0/core0"));
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_listing_is_reported_as_empty_result() {
        let graph = sample();
        let err = graph
            .list_subtree("/inv", &CapabilitySet::of(&[Capability::Cable]), 0)
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::EmptyResult("/inv".to_string()));
    }

    #[tokio::test]
    async fn test_missing_association_is_no_such_relation() {
        let graph = sample();
        assert_eq!(
            graph
                .get_association_endpoints("/inv/system/cpu0/containing")
                .await
                .unwrap(),
            vec!["/inv/system/cpu0/core0".to_string()]
        );
        assert_eq!(
            graph
                .get_association_endpoints("/inv/system/cpu1/containing")
                .await
                .unwrap_err(),
            BackendError::NoSuchRelation("/inv/system/cpu1/containing".to_string())
        );
    }

    #[tokio::test]
    async fn test_managed_objects_scoped_to_agent_and_offline_agents_fail() {
        let graph = sample();
        let objects = graph.get_all_managed_objects("cpu.agent").await.unwrap();
        assert_eq!(objects.len(), 2);

        graph.set_agent_available("cpu.agent", false);
        assert!(matches!(
            graph.get_all_managed_objects("cpu.agent").await,
            Err(BackendError::Unavailable { .. })
        ));
        assert_eq!(graph.get_all_managed_objects("dimm.agent").await.unwrap().len(), 1);
    }

    #[test]
    fn test_fixture_parsing() {
        let fixture: InventoryFixture = serde_json::from_value(json!({
            "agents": [{ "name": "cpu.agent", "latency_ms": 5 }],
            "objects": [{
                "path": "/inv/system/cpu0",
                "agent": "cpu.agent",
                "interfaces": {
                    "xyz.openbmc_project.Inventory.Item.Cpu": { "CoreCount": 4 }
                }
            }],
            "associations": [{
                "subject_path": "/inv/system/cpu0",
                "relation": "containing",
                "endpoints": ["/inv/system/cpu0/core0"]
            }]
        }))
        .unwrap();
        let graph = InMemoryGraph::from_fixture(fixture);
        assert_eq!(graph.object_count(), 1);
        assert!(graph.associations.contains_key("/inv/system/cpu0/containing"));
        assert!(graph.agents.read()["cpu.agent"].available);
    }
}
