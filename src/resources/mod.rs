//! Resource families served by the gateway and the URI space they live in.

pub mod cable;
pub mod chassis;
pub mod memory;
pub mod processor;
pub mod properties;
pub mod storage;

use crate::backend::BackendGraphClient;
use crate::logic::ObjectResolver;
use crate::model::{CollectionHeader, ExpansionError, MemberScope, ResourceFamily};

pub use properties::{Fields, PropertyReader};

/// A collection reachable directly by URI.
#[derive(Debug)]
pub struct TopLevelCollection {
    pub uri: &'static str,
    pub name: &'static str,
    pub odata_type: &'static str,
    pub family: &'static ResourceFamily,
}

impl TopLevelCollection {
    pub fn header(&self) -> CollectionHeader {
        CollectionHeader::new(self.uri, self.name, self.odata_type)
    }

    /// Members are listed from the whole inventory.
    pub fn scope(&self, inventory_root: &str) -> MemberScope {
        MemberScope::subtree(inventory_root, self.family.filter())
    }
}

pub static TOP_LEVEL: [TopLevelCollection; 5] = [
    TopLevelCollection {
        uri: "/redfish/v1/Systems/system/Processors",
        name: "Processor Collection",
        odata_type: processor::COLLECTION_TYPE,
        family: &processor::PROCESSOR,
    },
    TopLevelCollection {
        uri: "/redfish/v1/Systems/system/Storage",
        name: "Storage Collection",
        odata_type: storage::COLLECTION_TYPE,
        family: &storage::STORAGE,
    },
    TopLevelCollection {
        uri: "/redfish/v1/Systems/system/Memory",
        name: "Memory Module Collection",
        odata_type: memory::COLLECTION_TYPE,
        family: &memory::MEMORY,
    },
    TopLevelCollection {
        uri: "/redfish/v1/Cables",
        name: "Cable Collection",
        odata_type: cable::COLLECTION_TYPE,
        family: &cable::CABLE,
    },
    TopLevelCollection {
        uri: chassis::COLLECTION_URI,
        name: "Chassis Collection",
        odata_type: chassis::COLLECTION_TYPE,
        family: &chassis::CHASSIS,
    },
];

/// What a URI names once navigation is done.
#[derive(Debug)]
pub enum Target {
    Collection {
        scope: MemberScope,
        header: CollectionHeader,
        family: &'static ResourceFamily,
    },
    Single {
        scope: MemberScope,
        id: String,
        parent: CollectionHeader,
        family: &'static ResourceFamily,
    },
}

fn unknown(uri: &str) -> ExpansionError {
    ExpansionError::NotFound {
        resource: "Resource".to_string(),
        id: uri.to_string(),
    }
}

/// Splits `uri` into its top-level collection and the segments below it.
pub fn split_uri(uri: &str) -> Option<(&'static TopLevelCollection, Vec<&str>)> {
    let uri = uri.trim_end_matches('/');
    TOP_LEVEL.iter().find_map(|top| {
        let rest = uri.strip_prefix(top.uri)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some((top, rest.split('/').filter(|s| !s.is_empty()).collect()))
    })
}

/// Walks `uri` as alternating `<id>/<child field>` segments below a
/// top-level collection. Every intermediate id must exist.
pub async fn locate<B>(backend: &B, inventory_root: &str, uri: &str) -> Result<Target, ExpansionError>
where
    B: BackendGraphClient + ?Sized,
{
    let (top, segments) = split_uri(uri).ok_or_else(|| unknown(uri))?;
    let resolver = ObjectResolver::new(backend, inventory_root);

    let mut scope = top.scope(inventory_root);
    let mut header = top.header();
    let mut family = top.family;
    let mut rest = segments.as_slice();

    loop {
        match rest {
            [] => return Ok(Target::Collection { scope, header, family }),
            [id] => {
                return Ok(Target::Single {
                    scope,
                    id: id.to_string(),
                    parent: header,
                    family,
                })
            }
            [id, field, tail @ ..] => {
                let member = resolver.resolve_single(&scope, family.name, id).await?;
                let child = family
                    .child(field)
                    .filter(|child| child.applies_to(&member))
                    .ok_or_else(|| unknown(uri))?;
                scope = child.scope(&member);
                header = child.header(&header.member_uri(id));
                family = child.family;
                rest = tail;
            }
        }
    }
}
