use serde_json::{json, Map, Value};

use crate::logic::accumulator::ResponseAccumulator;
use crate::model::{
    error_marker, BackendObject, CollectionHeader, ExpansionError, OutputAddress, PathStep,
    ResultNode, EXTENDED_INFO, MEMBERS, MEMBERS_COUNT, NAME, ODATA_ID, ODATA_TYPE,
};

/// Finds the object at `address`, creating it when the final step is a key
/// under an existing parent. Index steps must already exist: member slots are
/// only ever created by [`ResultAssembler::reserve_collection`].
fn object_at<'v>(document: &'v mut Value, address: &OutputAddress) -> Option<&'v mut Map<String, Value>> {
    let Some((parent, last)) = address.split_last() else {
        if !document.is_object() {
            *document = json!({});
        }
        return document.as_object_mut();
    };
    let parent = document.pointer_mut(&parent.to_pointer())?;
    let target = match last {
        PathStep::Key(key) => parent
            .as_object_mut()?
            .entry(key.clone())
            .or_insert_with(|| json!({})),
        PathStep::Index(index) => parent.as_array_mut()?.get_mut(*index)?,
    };
    if !target.is_object() {
        *target = json!({});
    }
    target.as_object_mut()
}

/// Writes engine results into the shared document at pre-reserved addresses.
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler<'a> {
    accumulator: &'a ResponseAccumulator,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(accumulator: &'a ResponseAccumulator) -> Self {
        Self { accumulator }
    }

    /// Lays out a collection at `address` with one reference slot per member,
    /// in the given order, and returns the slot addresses. The collection's
    /// size and order are final once this returns.
    pub fn reserve_collection(
        &self,
        address: &OutputAddress,
        header: &CollectionHeader,
        members: &[BackendObject],
    ) -> Result<Vec<OutputAddress>, ExpansionError> {
        let slots: Vec<Value> = members
            .iter()
            .map(|member| ResultNode::reference(&header.member_uri(&member.stable_id)))
            .collect();
        let count = slots.len();

        self.accumulator.with_document(|document| -> Result<(), ExpansionError> {
            let collection = object_at(document, address)
                .ok_or_else(|| ExpansionError::UnreservedAddress(address.to_string()))?;
            collection.insert(ODATA_ID.to_string(), json!(header.uri));
            collection.insert(ODATA_TYPE.to_string(), json!(header.odata_type));
            collection.insert(NAME.to_string(), json!(header.name));
            collection.insert(MEMBERS.to_string(), Value::Array(slots));
            collection.insert(MEMBERS_COUNT.to_string(), json!(count));
            Ok(())
        })?;

        Ok((0..count).map(|index| address.member(index)).collect())
    }

    /// Merges `properties` into an existing object. Member slots must have
    /// been reserved; a single resource may write at any key under an
    /// existing parent.
    pub fn write_properties(
        &self,
        address: &OutputAddress,
        properties: Map<String, Value>,
    ) -> Result<(), ExpansionError> {
        self.accumulator.with_document(|document| -> Result<(), ExpansionError> {
            let target = object_at(document, address)
                .ok_or_else(|| ExpansionError::UnreservedAddress(address.to_string()))?;
            target.extend(properties);
            Ok(())
        })
    }

    /// Writes a `{ "@odata.id": uri }` link under `key` of the object at
    /// `address`.
    pub fn write_link(&self, address: &OutputAddress, key: &str, uri: &str) -> Result<(), ExpansionError> {
        let mut link = Map::new();
        link.insert(key.to_string(), ResultNode::reference(uri));
        self.write_properties(address, link)
    }

    /// Replaces a reserved slot's content with an error marker. The slot keeps
    /// its position and `@odata.id`, so the collection shape is unaffected.
    pub fn mark_failed(&self, slot: &OutputAddress, err: &ExpansionError) -> Result<(), ExpansionError> {
        self.accumulator.with_document(|document| -> Result<(), ExpansionError> {
            let target = object_at(document, slot)
                .ok_or_else(|| ExpansionError::UnreservedAddress(slot.to_string()))?;
            target.retain(|key, _| key == ODATA_ID);
            target.insert(EXTENDED_INFO.to_string(), error_marker(err));
            Ok(())
        })?;
        self.accumulator.record_error(err.clone());
        Ok(())
    }

    /// Records a collection whose members could not be resolved: header, an
    /// empty member list, and the error marker.
    pub fn fail_collection(
        &self,
        address: &OutputAddress,
        header: &CollectionHeader,
        err: &ExpansionError,
    ) -> Result<(), ExpansionError> {
        self.reserve_collection(address, header, &[])?;
        self.write_properties(
            address,
            Map::from_iter([(EXTENDED_INFO.to_string(), error_marker(err))]),
        )?;
        self.accumulator.record_error(err.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapabilitySet, ResultCollection};

    fn member(id: &str) -> BackendObject {
        BackendObject {
            path: format!("/inv/system/{}", id),
            stable_id: id.to_string(),
            capabilities: CapabilitySet::new(),
            owner_agent: "agent".to_string(),
        }
    }

    fn header() -> CollectionHeader {
        CollectionHeader::new(
            "/redfish/v1/Systems/system/Processors",
            "Processor Collection",
            "#ProcessorCollection.ProcessorCollection",
        )
    }

    #[tokio::test]
    async fn test_reserve_then_fill_slots_out_of_order() {
        let (accumulator, receiver) = ResponseAccumulator::new(json!({}));
        let assembler = ResultAssembler::new(&accumulator);

        let slots = assembler
            .reserve_collection(&OutputAddress::root(), &header(), &[member("cpu0"), member("cpu1")])
            .unwrap();
        assert_eq!(slots[1].to_pointer(), "/Members/1");

        let mut second = Map::new();
        second.insert("TotalCores".to_string(), json!(16));
        assembler.write_properties(&slots[1], second).unwrap();
        let mut first = Map::new();
        first.insert("TotalCores".to_string(), json!(8));
        assembler.write_properties(&slots[0], first).unwrap();
        drop(accumulator);

        let document = receiver.await.unwrap().document;
        assert_eq!(document["Members@odata.count"], json!(2));
        assert_eq!(document["Members"][0]["@odata.id"], json!("/redfish/v1/Systems/system/Processors/cpu0"));
        assert_eq!(document["Members"][0]["TotalCores"], json!(8));
        assert_eq!(document["Members"][1]["TotalCores"], json!(16));
    }

    #[tokio::test]
    async fn test_nested_collection_under_reserved_slot() {
        let (accumulator, receiver) = ResponseAccumulator::new(json!({}));
        let assembler = ResultAssembler::new(&accumulator);
        let slots = assembler
            .reserve_collection(&OutputAddress::root(), &header(), &[member("cpu0")])
            .unwrap();

        let child = slots[0].key("SubProcessors");
        let child_header = CollectionHeader::new(
            "/redfish/v1/Systems/system/Processors/cpu0/SubProcessors",
            "SubProcessor Collection",
            "#ProcessorCollection.ProcessorCollection",
        );
        assembler
            .reserve_collection(&child, &child_header, &[member("core0")])
            .unwrap();
        drop(accumulator);

        let document = receiver.await.unwrap().document;
        let nested = ResultCollection::from_value(&document["Members"][0]["SubProcessors"]).unwrap();
        assert_eq!(
            nested.member_uris(),
            vec!["/redfish/v1/Systems/system/Processors/cpu0/SubProcessors/core0"]
        );
    }

    #[test]
    fn test_unreserved_slot_is_rejected() {
        let (accumulator, _receiver) = ResponseAccumulator::new(json!({}));
        let assembler = ResultAssembler::new(&accumulator);
        let err = assembler
            .write_properties(&OutputAddress::root().member(4), Map::new())
            .unwrap_err();
        assert_eq!(err, ExpansionError::UnreservedAddress("#/Members/4".to_string()));
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_slot_identity_only() {
        let (accumulator, receiver) = ResponseAccumulator::new(json!({}));
        let assembler = ResultAssembler::new(&accumulator);
        let slots = assembler
            .reserve_collection(&OutputAddress::root(), &header(), &[member("cpu0")])
            .unwrap();
        let mut partial = Map::new();
        partial.insert("Socket".to_string(), json!("CPU 0"));
        assembler.write_properties(&slots[0], partial).unwrap();

        let err = ExpansionError::BackendUnavailable("cpu agent offline".to_string());
        assembler.mark_failed(&slots[0], &err).unwrap();
        assert_eq!(accumulator.error_count(), 1);
        drop(accumulator);

        let completed = receiver.await.unwrap();
        let slot = &completed.document["Members"][0];
        assert!(slot.get("Socket").is_none());
        assert_eq!(slot["@Message.ExtendedInfo"][0]["MessageId"], json!("Base.1.13.0.InternalError"));
        assert_eq!(completed.errors, vec![err]);
    }
}
