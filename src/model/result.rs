use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::model::ExpansionError;

pub const ODATA_ID: &str = "@odata.id";
pub const ODATA_TYPE: &str = "@odata.type";
pub const MEMBERS: &str = "Members";
pub const MEMBERS_COUNT: &str = "Members@odata.count";
pub const EXTENDED_INFO: &str = "@Message.ExtendedInfo";
pub const ID: &str = "Id";
pub const NAME: &str = "Name";
pub const LINKS: &str = "Links";

/// One step of an output address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A hierarchical pointer into the output document, e.g.
/// `/Members/3/SubProcessors/Members/1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OutputAddress(Vec<PathStep>);

impl OutputAddress {
    /// The document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(&self, key: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Key(key.to_string()));
        Self(steps)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        Self(steps)
    }

    /// Address of the `index`-th member slot of the collection at `self`.
    pub fn member(&self, index: usize) -> Self {
        self.key(MEMBERS).index(index)
    }

    /// Splits off the last step.
    pub fn split_last(&self) -> Option<(OutputAddress, &PathStep)> {
        self.0
            .split_last()
            .map(|(last, init)| (OutputAddress(init.to_vec()), last))
    }

    /// RFC 6901 rendering; the root is the empty string.
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for step in &self.0 {
            pointer.push('/');
            match step {
                PathStep::Key(key) => pointer.push_str(&key.replace('~', "~0").replace('/', "~1")),
                PathStep::Index(index) => pointer.push_str(&index.to_string()),
            }
        }
        pointer
    }
}

impl std::fmt::Display for OutputAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.to_pointer())
    }
}

/// Builds the error marker written into a failed slot or collection.
pub fn error_marker(err: &ExpansionError) -> Value {
    json!([{
        "MessageId": err.message_id(),
        "Message": err.to_string(),
    }])
}

/// Typed view of one member slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    /// Depth budget exhausted: pointer-only representation.
    Reference { uri: String },
    /// Fully materialized member. `children` holds the child collections that
    /// were themselves expanded (plain links stay in `properties`).
    Expanded {
        uri: String,
        id: String,
        properties: Map<String, Value>,
        children: BTreeMap<String, ResultCollection>,
    },
    /// The member kept its slot but its content could not be produced.
    Failed {
        uri: String,
        message_id: String,
        message: String,
    },
}

impl ResultNode {
    pub fn reference(uri: &str) -> Value {
        json!({ ODATA_ID: uri })
    }

    pub fn uri(&self) -> &str {
        match self {
            ResultNode::Reference { uri }
            | ResultNode::Expanded { uri, .. }
            | ResultNode::Failed { uri, .. } => uri,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ResultNode::Reference { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResultNode::Failed { .. })
    }

    /// Reads a slot back out of the output document.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let uri = object.get(ODATA_ID)?.as_str()?.to_string();

        if let Some(info) = object.get(EXTENDED_INFO).and_then(Value::as_array) {
            let first = info.first();
            let field = |name: &str| {
                first
                    .and_then(|entry| entry.get(name))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            return Some(ResultNode::Failed {
                uri,
                message_id: field("MessageId"),
                message: field("Message"),
            });
        }

        if object.len() == 1 {
            return Some(ResultNode::Reference { uri });
        }

        let id = object
            .get(ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut properties = Map::new();
        let mut children = BTreeMap::new();
        for (key, field) in object {
            if key == ODATA_ID || key == ID {
                continue;
            }
            match field.get(MEMBERS).and_then(|_| ResultCollection::from_value(field)) {
                Some(collection) => {
                    children.insert(key.clone(), collection);
                }
                None => {
                    properties.insert(key.clone(), field.clone());
                }
            }
        }
        Some(ResultNode::Expanded {
            uri,
            id,
            properties,
            children,
        })
    }
}

/// Typed view of a collection. Member order is the order the slots were
/// reserved in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCollection {
    pub uri: String,
    pub members: Vec<ResultNode>,
    pub total_count: usize,
}

impl ResultCollection {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let uri = object
            .get(ODATA_ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let members = object
            .get(MEMBERS)?
            .as_array()?
            .iter()
            .map(ResultNode::from_value)
            .collect::<Option<Vec<_>>>()?;
        let total_count = object
            .get(MEMBERS_COUNT)
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .unwrap_or(members.len());
        Some(Self {
            uri,
            members,
            total_count,
        })
    }

    pub fn member_uris(&self) -> Vec<&str> {
        self.members.iter().map(ResultNode::uri).collect()
    }
}
