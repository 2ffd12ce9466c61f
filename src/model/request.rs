use crate::model::{CapabilitySet, OutputAddress};

/// Static description written at the head of every collection object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHeader {
    pub uri: String,
    pub name: String,
    pub odata_type: String,
}

impl CollectionHeader {
    pub fn new(uri: impl Into<String>, name: &str, odata_type: &str) -> Self {
        Self {
            uri: uri.into(),
            name: name.to_string(),
            odata_type: odata_type.to_string(),
        }
    }

    /// Resource URI of a member with the given stable id.
    pub fn member_uri(&self, stable_id: &str) -> String {
        format!("{}/{}", self.uri.trim_end_matches('/'), stable_id)
    }
}

/// Where members of a collection come from: one or more subtree roots,
/// optionally narrowed to the endpoints of an association on the first root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberScope {
    pub roots: Vec<String>,
    pub relation: Option<String>,
    pub capability_filter: CapabilitySet,
}

impl MemberScope {
    /// Everything under `root` that carries one of the filter's capabilities.
    pub fn subtree(root: impl Into<String>, capability_filter: CapabilitySet) -> Self {
        Self {
            roots: vec![root.into()],
            relation: None,
            capability_filter,
        }
    }

    /// Endpoints of `subject/relation`, narrowed to the capability filter.
    pub fn association(
        subject: impl Into<String>,
        relation: impl Into<String>,
        capability_filter: CapabilitySet,
    ) -> Self {
        Self {
            roots: vec![subject.into()],
            relation: Some(relation.into()),
            capability_filter,
        }
    }

    /// Adds another listing root; overlapping roots are deduplicated by path.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn root_path(&self) -> &str {
        self.roots.first().map(String::as_str).unwrap_or_default()
    }
}

/// One expansion call: which members, how deep, and where the result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub scope: MemberScope,
    pub depth_budget: u8,
    pub output: OutputAddress,
    pub header: CollectionHeader,
}

impl ExpansionRequest {
    pub fn new(
        scope: MemberScope,
        depth_budget: u8,
        output: OutputAddress,
        header: CollectionHeader,
    ) -> Self {
        Self {
            scope,
            depth_budget,
            output,
            header,
        }
    }
}

/// A required lookup of one member of a scope by stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleRequest {
    pub scope: MemberScope,
    pub id: String,
    pub depth_budget: u8,
    pub output: OutputAddress,
    /// Collection the resource belongs to; used for its own URI.
    pub parent: CollectionHeader,
}
