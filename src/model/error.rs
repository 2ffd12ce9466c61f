use thiserror::Error;

/// Error classes reported by a [`BackendGraphClient`](crate::backend::BackendGraphClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The association edge does not exist. Callers treat this as an empty
    /// endpoint set.
    #[error("no such relation: {0}")]
    NoSuchRelation(String),

    /// The agent serving the request could not be reached or failed.
    #[error("backend agent '{agent}' unavailable: {reason}")]
    Unavailable { agent: String, reason: String },

    /// A listing matched nothing. Not a failure; yields zero rows.
    #[error("no objects matched under {0}")]
    EmptyResult(String),
}

/// Failures produced by the expansion engine.
///
/// Each variant has a fixed blast radius: `BackendUnavailable` and
/// `InvalidObjectPath` abort the expansion call that hit them,
/// `MalformedProperty` only the member slot it belongs to, and `NotFound` is
/// reserved for required single-object lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    #[error("malformed property {interface}.{property} on {path}: expected {expected}")]
    MalformedProperty {
        path: String,
        interface: String,
        property: String,
        expected: String,
    },

    #[error("backend object path '{0}' has no usable identifier")]
    InvalidObjectPath(String),

    #[error("write to unreserved output address {0}")]
    UnreservedAddress(String),
}

impl ExpansionError {
    /// Registry message id written into error markers and error bodies.
    pub fn message_id(&self) -> &'static str {
        match self {
            ExpansionError::NotFound { .. } => "Base.1.13.0.ResourceNotFound",
            ExpansionError::MalformedProperty { .. } => "Base.1.13.0.PropertyValueTypeError",
            ExpansionError::BackendUnavailable(_)
            | ExpansionError::InvalidObjectPath(_)
            | ExpansionError::UnreservedAddress(_) => "Base.1.13.0.InternalError",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExpansionError::NotFound { .. })
    }
}

impl From<BackendError> for ExpansionError {
    fn from(err: BackendError) -> Self {
        ExpansionError::BackendUnavailable(err.to_string())
    }
}

/// Raised by property mappers when a backend value has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("property {interface}.{property}: expected {expected}")]
    MalformedProperty {
        interface: String,
        property: String,
        expected: &'static str,
    },
}

impl MappingError {
    pub fn malformed(interface: &str, property: &str, expected: &'static str) -> Self {
        MappingError::MalformedProperty {
            interface: interface.to_string(),
            property: property.to_string(),
            expected,
        }
    }

    /// Attaches the owning object path, producing the engine-level error.
    pub fn at_path(self, path: &str) -> ExpansionError {
        match self {
            MappingError::MalformedProperty {
                interface,
                property,
                expected,
            } => ExpansionError::MalformedProperty {
                path: path.to_string(),
                interface,
                property,
                expected: expected.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_lift_to_backend_unavailable() {
        let err: ExpansionError = BackendError::Unavailable {
            agent: "xyz.openbmc_project.Inventory.Manager".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, ExpansionError::BackendUnavailable(_)));
        assert_eq!(err.message_id(), "Base.1.13.0.InternalError");
    }

    #[test]
    fn test_mapping_error_keeps_property_details() {
        let err = MappingError::malformed("xyz.openbmc_project.Inventory.Item.Cpu", "CoreCount", "an unsigned integer")
            .at_path("/inv/cpu0");
        assert_eq!(err.message_id(), "Base.1.13.0.PropertyValueTypeError");
        assert!(err.to_string().contains("CoreCount"));
        assert!(err.to_string().contains("/inv/cpu0"));
    }
}
