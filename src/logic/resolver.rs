use std::collections::{BTreeMap, BTreeSet};

use futures::future::try_join_all;

use crate::backend::BackendGraphClient;
use crate::logic::natural_order::sort_naturally_by_key;
use crate::model::common::{join_path, stable_id};
use crate::model::{BackendError, BackendObject, CapabilitySet, ExpansionError, MemberScope, SubtreeEntry};

/// Turns backend listings into the ordered, deduplicated member list of one
/// collection.
pub struct ObjectResolver<'a, B: ?Sized> {
    backend: &'a B,
    inventory_root: &'a str,
}

impl<'a, B> ObjectResolver<'a, B>
where
    B: BackendGraphClient + ?Sized,
{
    pub fn new(backend: &'a B, inventory_root: &'a str) -> Self {
        Self {
            backend,
            inventory_root,
        }
    }

    /// Resolve every member of `scope`, sorted by stable id.
    pub async fn resolve(&self, scope: &MemberScope) -> Result<Vec<BackendObject>, ExpansionError> {
        let rows = match &scope.relation {
            Some(relation) => self.follow_association(scope, relation).await?,
            None => self.list_roots(scope).await?,
        };
        build_members(rows, &scope.roots)
    }

    /// Resolve exactly one member of `scope` by stable id. Zero matches is
    /// `NotFound`, never an empty result.
    pub async fn resolve_single(
        &self,
        scope: &MemberScope,
        resource: &str,
        id: &str,
    ) -> Result<BackendObject, ExpansionError> {
        self.resolve(scope)
            .await?
            .into_iter()
            .find(|member| member.stable_id == id)
            .ok_or_else(|| ExpansionError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            })
    }

    /// Stable id of the single endpoint of `member/relation`. A missing
    /// relation, a backend error or an ambiguous edge yields no link.
    pub async fn follow_link(&self, member: &BackendObject, relation: &str) -> Option<String> {
        let edge = join_path(&member.path, relation);
        let endpoints = match self.backend.get_association_endpoints(&edge).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                log::debug!("no link at {}: {}", edge, e);
                return None;
            }
        };
        match endpoints.as_slice() {
            [endpoint] if !stable_id(endpoint).is_empty() => Some(stable_id(endpoint).to_string()),
            [] | [_] => {
                log::debug!("no usable endpoint at {}", edge);
                None
            }
            _ => {
                log::debug!("{} has {} endpoints, expected one", edge, endpoints.len());
                None
            }
        }
    }

    async fn list(&self, root: &str, filter: &CapabilitySet) -> Result<Vec<SubtreeEntry>, ExpansionError> {
        match self.backend.list_subtree(root, filter, 0).await {
            Ok(rows) => Ok(rows),
            Err(BackendError::EmptyResult(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_roots(&self, scope: &MemberScope) -> Result<Vec<SubtreeEntry>, ExpansionError> {
        let listings = try_join_all(
            scope
                .roots
                .iter()
                .map(|root| self.list(root, &scope.capability_filter)),
        )
        .await?;
        Ok(listings.into_iter().flatten().collect())
    }

    async fn follow_association(
        &self,
        scope: &MemberScope,
        relation: &str,
    ) -> Result<Vec<SubtreeEntry>, ExpansionError> {
        let mut endpoints = BTreeSet::new();
        for subject in &scope.roots {
            let edge = join_path(subject, relation);
            match self.backend.get_association_endpoints(&edge).await {
                Ok(found) => endpoints.extend(found),
                Err(BackendError::NoSuchRelation(_)) => {
                    log::debug!("no association at {}, treating as empty", edge);
                }
                Err(e) => return Err(e.into()),
            }
        }
        if endpoints.is_empty() {
            return Ok(Vec::new());
        }

        // Endpoints may point at objects outside the filter.
        let listed = self.list(self.inventory_root, &scope.capability_filter).await?;
        Ok(listed
            .into_iter()
            .filter(|row| endpoints.contains(&row.path))
            .collect())
    }
}

/// Deduplicates by path, drops the scope roots themselves, and sorts.
fn build_members(rows: Vec<SubtreeEntry>, roots: &[String]) -> Result<Vec<BackendObject>, ExpansionError> {
    let mut unique: BTreeMap<String, SubtreeEntry> = BTreeMap::new();
    for row in rows {
        if roots.iter().any(|root| root.trim_end_matches('/') == row.path) {
            continue;
        }
        if unique.contains_key(&row.path) {
            log::debug!("duplicate object {} collapsed", row.path);
            continue;
        }
        unique.insert(row.path.clone(), row);
    }

    let mut members = unique
        .into_values()
        .map(BackendObject::from_entry)
        .collect::<Result<Vec<_>, _>>()?;
    // `unique` yields path order and the sort is stable, so equal ids stay path-ordered.
    sort_naturally_by_key(&mut members, |member| member.stable_id.as_str());
    Ok(members)
}
