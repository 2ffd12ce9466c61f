use serde_json::{Map, Value};

use crate::model::{
    BackendObject, Capability, CapabilitySet, CollectionHeader, InterfaceMap, MappingError,
    MemberScope,
};

/// The member being mapped and the URI it is served at.
#[derive(Debug, Clone, Copy)]
pub struct MemberContext<'a> {
    pub object: &'a BackendObject,
    pub uri: &'a str,
}

/// Pure translation from one object's backend properties to schema fields.
/// Either every field maps or the whole member fails.
pub type PropertyMapper =
    fn(&MemberContext<'_>, &InterfaceMap) -> Result<Map<String, Value>, MappingError>;

/// A `Links.<field>` reference taken from a single-endpoint association,
/// e.g. the chassis a processor sits in.
#[derive(Debug)]
pub struct MemberLink {
    pub field: &'static str,
    pub relation: &'static str,
    /// Collection the endpoint is served from.
    pub collection_uri: &'static str,
}

impl MemberLink {
    pub fn target_uri(&self, stable_id: &str) -> String {
        format!("{}/{}", self.collection_uri.trim_end_matches('/'), stable_id)
    }
}

/// Everything the engine needs to know about one kind of resource.
#[derive(Debug)]
pub struct ResourceFamily {
    /// Default `Name`, also used as the resource kind in not-found errors.
    pub name: &'static str,
    pub odata_type: &'static str,
    pub capabilities: &'static [Capability],
    pub mapper: PropertyMapper,
    pub children: &'static [ChildCollection],
    pub links: &'static [MemberLink],
}

impl ResourceFamily {
    pub fn filter(&self) -> CapabilitySet {
        CapabilitySet::of(self.capabilities)
    }

    pub fn child(&self, field: &str) -> Option<&ChildCollection> {
        self.children.iter().find(|child| child.field == field)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A collection hanging off each member of a family, e.g. a processor's
/// `SubProcessors`.
#[derive(Debug)]
pub struct ChildCollection {
    pub field: &'static str,
    /// Association followed from the parent object. Without one, members are
    /// listed from the parent's own subtree.
    pub relation: Option<&'static str>,
    pub name: &'static str,
    pub odata_type: &'static str,
    pub family: &'static ResourceFamily,
    /// Capability the parent must carry for the collection to exist.
    pub requires: Option<Capability>,
}

impl ChildCollection {
    pub fn applies_to(&self, parent: &BackendObject) -> bool {
        self.requires
            .map_or(true, |capability| parent.capabilities.contains(capability))
    }

    pub fn scope(&self, parent: &BackendObject) -> MemberScope {
        let filter = self.family.filter();
        match self.relation {
            Some(relation) => MemberScope::association(parent.path.as_str(), relation, filter),
            None => MemberScope::subtree(parent.path.as_str(), filter),
        }
    }

    pub fn header(&self, parent_uri: &str) -> CollectionHeader {
        CollectionHeader::new(
            format!("{}/{}", parent_uri.trim_end_matches('/'), self.field),
            self.name,
            self.odata_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fields(_: &MemberContext<'_>, _: &InterfaceMap) -> Result<Map<String, Value>, MappingError> {
        Ok(Map::new())
    }

    static LEAF: ResourceFamily = ResourceFamily {
        name: "Thread",
        odata_type: "#Processor.v1_18_0.Processor",
        capabilities: &[Capability::CpuThread],
        mapper: no_fields,
        children: &[],
        links: &[],
    };

    static PARENT: ResourceFamily = ResourceFamily {
        name: "Core",
        odata_type: "#Processor.v1_18_0.Processor",
        capabilities: &[Capability::CpuCore],
        mapper: no_fields,
        children: &[ChildCollection {
            field: "SubProcessors",
            relation: Some("containing"),
            name: "SubProcessor Collection",
            odata_type: "#ProcessorCollection.ProcessorCollection",
            family: &LEAF,
            requires: None,
        }],
        links: &[],
    };

    #[test]
    fn test_child_scope_and_header() {
        let parent = BackendObject {
            path: "/inv/cpu0/core0".to_string(),
            stable_id: "core0".to_string(),
            capabilities: CapabilitySet::of(&[Capability::CpuCore]),
            owner_agent: "cpu.agent".to_string(),
        };
        let child = PARENT.child("SubProcessors").unwrap();
        let scope = child.scope(&parent);
        assert_eq!(scope.root_path(), "/inv/cpu0/core0");
        assert_eq!(scope.relation.as_deref(), Some("containing"));
        assert!(scope.capability_filter.contains(Capability::CpuThread));

        let header = child.header("/redfish/v1/Systems/system/Processors/cpu0/SubProcessors/core0");
        assert_eq!(
            header.uri,
            "/redfish/v1/Systems/system/Processors/cpu0/SubProcessors/core0/SubProcessors"
        );
        assert!(PARENT.child("Drives").is_none());
        assert!(LEAF.is_leaf());
        assert!(!PARENT.is_leaf());
    }

    #[test]
    fn test_conditional_child_and_link_target() {
        let child = ChildCollection {
            requires: Some(Capability::CpuThread),
            ..*PARENT.child("SubProcessors").unwrap()
        };
        let mut parent = BackendObject {
            path: "/inv/cpu0/core0".to_string(),
            stable_id: "core0".to_string(),
            capabilities: CapabilitySet::of(&[Capability::CpuCore]),
            owner_agent: "cpu.agent".to_string(),
        };
        assert!(!child.applies_to(&parent));
        assert!(PARENT.child("SubProcessors").unwrap().applies_to(&parent));
        parent.capabilities = CapabilitySet::of(&[Capability::CpuCore, Capability::CpuThread]);
        assert!(child.applies_to(&parent));

        let link = MemberLink {
            field: "Chassis",
            relation: "chassis",
            collection_uri: "/redfish/v1/Chassis/",
        };
        assert_eq!(link.target_uri("motherboard"), "/redfish/v1/Chassis/motherboard");
    }
}
