use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::backend::BackendGraphClient;
use crate::logic::accumulator::ResponseAccumulator;
use crate::logic::assembler::ResultAssembler;
use crate::logic::batch_fetch::{self, AgentBatch, FetchOutcome};
use crate::logic::pending::PendingGroup;
use crate::logic::resolver::ObjectResolver;
use crate::model::{
    BackendObject, CollectionHeader, ExpansionError, ExpansionRequest, InterfaceMap, MemberContext,
    OutputAddress, ResourceFamily, ResultNode, SingleRequest, ID, LINKS, NAME, ODATA_ID, ODATA_TYPE,
};

/// Progress of one expansion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Resolving,
    Reserving,
    Stubbing,
    Recursing,
    Draining,
    Done,
}

impl fmt::Display for ExpansionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpansionState::Resolving => "resolving",
            ExpansionState::Reserving => "reserving",
            ExpansionState::Stubbing => "stubbing",
            ExpansionState::Recursing => "recursing",
            ExpansionState::Draining => "draining",
            ExpansionState::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(label: &str, state: ExpansionState) {
    log::debug!("{}: {}", label, state);
}

/// Schema fields for one fetched member: identity, type, then the mapper's
/// output. A mapper failure fails the whole member.
fn member_properties(
    family: &ResourceFamily,
    member: &BackendObject,
    uri: &str,
    interfaces: &InterfaceMap,
) -> Result<Map<String, Value>, ExpansionError> {
    let context = MemberContext { object: member, uri };
    let mapped = (family.mapper)(&context, interfaces).map_err(|e| e.at_path(&member.path))?;
    let mut properties = Map::new();
    properties.insert(ODATA_TYPE.to_string(), json!(family.odata_type));
    properties.insert(ID.to_string(), json!(member.stable_id));
    properties.insert(NAME.to_string(), json!(family.name));
    properties.extend(mapped);
    Ok(properties)
}

/// Merges resolved references into the member's `Links` object.
fn attach_links(properties: &mut Map<String, Value>, links: Map<String, Value>) {
    if links.is_empty() {
        return;
    }
    match properties.entry(LINKS).or_insert_with(|| json!({})) {
        Value::Object(existing) => existing.extend(links),
        other => *other = Value::Object(links),
    }
}

/// Recursive expansion over the backend graph.
///
/// Each call resolves its members, fixes the collection's shape in the
/// shared document, and only then issues asynchronous work. Branches write to
/// private, pre-reserved slots, so they may complete in any order.
pub struct Expander<'a, B: ?Sized> {
    backend: &'a B,
    accumulator: &'a ResponseAccumulator,
    inventory_root: &'a str,
}

impl<'a, B> Expander<'a, B>
where
    B: BackendGraphClient + ?Sized,
{
    pub fn new(backend: &'a B, accumulator: &'a ResponseAccumulator, inventory_root: &'a str) -> Self {
        Self {
            backend,
            accumulator,
            inventory_root,
        }
    }

    fn assembler(&self) -> ResultAssembler<'a> {
        ResultAssembler::new(self.accumulator)
    }

    fn resolver(&self) -> ObjectResolver<'a, B> {
        ObjectResolver::new(self.backend, self.inventory_root)
    }

    /// `Links` entries of `member`; a link whose association is missing or
    /// ambiguous is left out.
    async fn member_links(&self, family: &ResourceFamily, member: &BackendObject) -> Map<String, Value> {
        let mut links = Map::new();
        let resolver = self.resolver();
        for link in family.links {
            if let Some(target) = resolver.follow_link(member, link.relation).await {
                links.insert(link.field.to_string(), ResultNode::reference(&link.target_uri(&target)));
            }
        }
        links
    }

    /// Expand the collection described by `request`. An error here is fatal
    /// to this call only: nothing has been written at `request.output` yet.
    pub fn expand_collection(
        &self,
        request: ExpansionRequest,
        family: &'static ResourceFamily,
    ) -> BoxFuture<'_, Result<(), ExpansionError>> {
        async move {
            let label = request.header.uri.as_str();
            let group = PendingGroup::new(label, self.accumulator);

            enter(label, ExpansionState::Resolving);
            let members = match self.resolver().resolve(&request.scope).await {
                Ok(members) => members,
                Err(e) => {
                    log::warn!("{}: resolution failed: {}", label, e);
                    enter(label, ExpansionState::Done);
                    return Err(e);
                }
            };

            enter(label, ExpansionState::Reserving);
            let slots = self
                .assembler()
                .reserve_collection(&request.output, &request.header, &members)
                .map_err(|e| {
                    log::error!("{}: {}", label, e);
                    e
                })?;

            if request.depth_budget == 0 || members.is_empty() {
                // Reserved slots already hold references.
                enter(label, ExpansionState::Stubbing);
                enter(label, ExpansionState::Done);
                return Ok(());
            }

            enter(label, ExpansionState::Recursing);
            let batches = batch_fetch::plan(&members);
            let branches = batches.iter().map(|batch| {
                self.complete_batch(batch, &members, &slots, &request, family, &group)
            });
            let pending = group.join_all(branches);
            enter(label, ExpansionState::Draining);
            pending.await;

            enter(label, ExpansionState::Done);
            Ok(())
        }
        .boxed()
    }

    /// Expand one required resource at `request.output`. With a zero budget
    /// its child collections are written as links only.
    pub async fn expand_single(
        &self,
        request: SingleRequest,
        family: &'static ResourceFamily,
    ) -> Result<(), ExpansionError> {
        let uri = request.parent.member_uri(&request.id);
        let label = uri.as_str();
        let group = PendingGroup::new(label, self.accumulator);

        enter(label, ExpansionState::Resolving);
        let member = self
            .resolver()
            .resolve_single(&request.scope, family.name, &request.id)
            .await?;

        enter(label, ExpansionState::Recursing);
        let interfaces = batch_fetch::fetch_all(self.backend, std::slice::from_ref(&member))
            .await
            .remove(&member.path)
            .unwrap_or_else(|| Ok(InterfaceMap::new()))?;
        let mut properties = Map::new();
        properties.insert(ODATA_ID.to_string(), json!(uri));
        properties.extend(member_properties(family, &member, &uri, &interfaces)?);
        attach_links(&mut properties, self.member_links(family, &member).await);
        self.assembler().write_properties(&request.output, properties)?;

        if request.depth_budget == 0 {
            for child in family.children.iter().filter(|child| child.applies_to(&member)) {
                self.assembler()
                    .write_link(&request.output, child.field, &child.header(&uri).uri)?;
            }
        } else {
            enter(label, ExpansionState::Draining);
            self.expand_children(&member, &uri, &request.output, request.depth_budget - 1, family, &group)
                .await;
        }

        enter(label, ExpansionState::Done);
        Ok(())
    }

    async fn complete_batch(
        &self,
        batch: &AgentBatch,
        members: &[BackendObject],
        slots: &[OutputAddress],
        request: &ExpansionRequest,
        family: &'static ResourceFamily,
        group: &PendingGroup,
    ) {
        let outcomes = batch.fetch(self.backend, members).await;
        let branches = outcomes.into_iter().map(|(index, outcome)| {
            self.complete_member(
                &members[index],
                &slots[index],
                outcome,
                &request.header,
                request.depth_budget - 1,
                family,
                group,
            )
        });
        group.join_all(branches).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn complete_member(
        &self,
        member: &BackendObject,
        slot: &OutputAddress,
        outcome: FetchOutcome,
        header: &CollectionHeader,
        child_budget: u8,
        family: &'static ResourceFamily,
        group: &PendingGroup,
    ) {
        let assembler = self.assembler();
        let uri = header.member_uri(&member.stable_id);
        let written = match outcome.and_then(|interfaces| member_properties(family, member, &uri, &interfaces)) {
            Ok(mut properties) => {
                attach_links(&mut properties, self.member_links(family, member).await);
                assembler.write_properties(slot, properties)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            log::warn!("{}: member {} failed: {}", header.uri, member.stable_id, e);
            if let Err(e) = assembler.mark_failed(slot, &e) {
                log::error!("{}: {}", header.uri, e);
            }
            return;
        }

        self.expand_children(member, &uri, slot, child_budget, family, group)
            .await;
    }

    /// One recursive call per child collection. A child that cannot be
    /// resolved is recorded at its own address; siblings carry on.
    async fn expand_children(
        &self,
        parent: &BackendObject,
        parent_uri: &str,
        address: &OutputAddress,
        budget: u8,
        family: &'static ResourceFamily,
        group: &PendingGroup,
    ) {
        if family.is_leaf() {
            return;
        }
        let children = family.children.iter().filter(|child| child.applies_to(parent));
        let branches = children.map(|child| async move {
            let output = address.key(child.field);
            let header = child.header(parent_uri);
            let request = ExpansionRequest::new(child.scope(parent), budget, output.clone(), header.clone());
            if let Err(e) = self.expand_collection(request, child.family).await {
                if let Err(e) = self.assembler().fail_collection(&output, &header, &e) {
                    log::error!("{}: {}", header.uri, e);
                }
            }
        });
        group.join_all(branches).await;
    }
}
