use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::common::{join_path, stable_id};
use crate::model::{CapabilitySet, ExpansionError, Id};

/// Property name → value, as served by a backend agent for one interface.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// Interface name → properties of one managed object.
pub type InterfaceMap = BTreeMap<String, PropertyMap>;

/// Object path → interfaces, the payload of a bulk retrieval for one agent.
pub type ManagedObjects = BTreeMap<String, InterfaceMap>;

/// One row of a subtree listing, still in the backend's raw vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeEntry {
    pub path: String,
    pub owner_agent: String,
    pub interfaces: Vec<String>,
}

/// A backend object the engine can address and fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendObject {
    /// Identity of the object.
    pub path: String,
    /// Final path segment; unique within one collection.
    pub stable_id: Id,
    pub capabilities: CapabilitySet,
    pub owner_agent: String,
}

impl BackendObject {
    /// Converts a listing row, validating the derived id and parsing the
    /// capability strings into tags.
    pub fn from_entry(entry: SubtreeEntry) -> Result<Self, ExpansionError> {
        let id = stable_id(&entry.path);
        if id.is_empty() {
            return Err(ExpansionError::InvalidObjectPath(entry.path));
        }
        Ok(Self {
            stable_id: id.to_string(),
            capabilities: CapabilitySet::from_interfaces(&entry.interfaces),
            owner_agent: entry.owner_agent,
            path: entry.path,
        })
    }
}

/// A named, directed relation from one backend object to a set of others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationEdge {
    pub subject_path: String,
    pub relation: String,
    #[serde(default)]
    pub endpoints: BTreeSet<String>,
}

impl AssociationEdge {
    /// Path under which the backend publishes this edge's endpoints.
    pub fn edge_path(&self) -> String {
        join_path(&self.subject_path, &self.relation)
    }
}
