use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::BackendGraphClient;
use crate::model::{BackendObject, ExpansionError, InterfaceMap};

/// Property data for one member, or the reason it could not be fetched.
pub type FetchOutcome = Result<InterfaceMap, ExpansionError>;

/// Members that share an owning agent and are fetched in one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentBatch {
    pub agent: String,
    /// Indices into the member list the batch was planned from.
    pub members: Vec<usize>,
}

impl AgentBatch {
    /// One bulk retrieval for the whole batch, demultiplexed by path. Objects
    /// the agent returns outside the batch are discarded; a batch member the
    /// agent does not report comes back with no interfaces.
    pub async fn fetch<B>(&self, backend: &B, members: &[BackendObject]) -> Vec<(usize, FetchOutcome)>
    where
        B: BackendGraphClient + ?Sized,
    {
        match backend.get_all_managed_objects(&self.agent).await {
            Ok(mut objects) => self
                .members
                .iter()
                .map(|&index| {
                    let interfaces = objects.remove(&members[index].path).unwrap_or_default();
                    (index, Ok(interfaces))
                })
                .collect(),
            Err(e) => {
                log::warn!(
                    "bulk fetch from {} failed for {} member(s): {}",
                    self.agent,
                    self.members.len(),
                    e
                );
                let err = ExpansionError::from(e);
                self.members
                    .iter()
                    .map(|&index| (index, Err(err.clone())))
                    .collect()
            }
        }
    }
}

/// Groups members by owning agent. Each agent appears once; batches come back
/// in agent-name order and keep member order inside a batch.
pub fn plan(members: &[BackendObject]) -> Vec<AgentBatch> {
    let mut seen = BTreeSet::new();
    members
        .iter()
        .enumerate()
        .filter(|&(_, member)| seen.insert(member.path.as_str()))
        .into_group_map_by(|(_, member)| member.owner_agent.clone())
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(agent, grouped)| AgentBatch {
            agent,
            members: grouped.into_iter().map(|(index, _)| index).collect(),
        })
        .collect()
}

/// Fetch properties for every member with one call per distinct agent.
pub async fn fetch_all<B>(backend: &B, members: &[BackendObject]) -> BTreeMap<String, FetchOutcome>
where
    B: BackendGraphClient + ?Sized,
{
    let batches = plan(members);
    let fetched = futures::future::join_all(batches.iter().map(|batch| batch.fetch(backend, members))).await;
    fetched
        .into_iter()
        .flatten()
        .map(|(index, outcome)| (members[index].path.clone(), outcome))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryGraph, RecordingBackend};
    use crate::model::CapabilitySet;
    use serde_json::json;

    fn member(path: &str, agent: &str) -> BackendObject {
        BackendObject {
            path: path.to_string(),
            stable_id: crate::model::common::stable_id(path).to_string(),
            capabilities: CapabilitySet::new(),
            owner_agent: agent.to_string(),
        }
    }

    fn graph() -> InMemoryGraph {
        let mut graph = InMemoryGraph::new();
        for (path, agent) in [
            ("/inv/dimm0", "mem.agent"),
            ("/inv/dimm1", "mem.agent"),
            ("/inv/dimm2", "mem.agent"),
            ("/inv/cpu0", "cpu.agent"),
            ("/inv/cpu1", "cpu.agent"),
            ("/inv/cpu2", "cpu.agent"),
        ] {
            let interfaces = InterfaceMap::from([(
                "xyz.openbmc_project.Inventory.Item".to_string(),
                [("PrettyName".to_string(), json!(path))].into_iter().collect(),
            )]);
            graph.insert_object(path, agent, interfaces);
        }
        graph
    }

    #[test]
    fn test_plan_groups_by_agent() {
        let members = vec![
            member("/inv/dimm0", "mem.agent"),
            member("/inv/cpu0", "cpu.agent"),
            member("/inv/dimm1", "mem.agent"),
        ];
        let batches = plan(&members);
        assert_eq!(
            batches,
            vec![
                AgentBatch { agent: "cpu.agent".to_string(), members: vec![1] },
                AgentBatch { agent: "mem.agent".to_string(), members: vec![0, 2] },
            ]
        );
    }

    #[tokio::test]
    async fn test_one_call_per_agent_and_extras_discarded() {
        let backend = RecordingBackend::new(graph());
        let members = vec![
            member("/inv/dimm0", "mem.agent"),
            member("/inv/dimm1", "mem.agent"),
            member("/inv/cpu0", "cpu.agent"),
            member("/inv/cpu1", "cpu.agent"),
            member("/inv/cpu2", "cpu.agent"),
        ];

        let fetched = fetch_all(&backend, &members).await;
        let counts = backend.counts();
        assert_eq!(counts.managed_objects, 2);
        assert_eq!(counts.managed_objects_by_agent["cpu.agent"], 1);
        assert_eq!(fetched.len(), 5);
        assert!(!fetched.contains_key("/inv/dimm2"));
        let dimm0 = fetched["/inv/dimm0"].as_ref().unwrap();
        assert_eq!(dimm0["xyz.openbmc_project.Inventory.Item"]["PrettyName"], json!("/inv/dimm0"));
    }

    #[tokio::test]
    async fn test_agent_failure_only_fails_its_members() {
        let graph = graph();
        graph.set_agent_available("cpu.agent", false);
        let members = vec![member("/inv/dimm0", "mem.agent"), member("/inv/cpu0", "cpu.agent")];

        let fetched = fetch_all(&graph, &members).await;
        assert!(fetched["/inv/dimm0"].is_ok());
        assert!(matches!(
            fetched["/inv/cpu0"],
            Err(ExpansionError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreported_member_gets_no_interfaces() {
        let members = vec![member("/inv/dimm9", "mem.agent")];
        let fetched = fetch_all(&graph(), &members).await;
        assert!(fetched["/inv/dimm9"].as_ref().unwrap().is_empty());
    }
}
